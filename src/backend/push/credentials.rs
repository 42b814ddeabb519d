//! Short-lived bearer tokens for the push backend.
//!
//! Tokens come from a service-account JWT bearer grant: a claim set scoped to
//! the messaging permission is signed with the account's RSA key (RS256) and
//! exchanged at the account's token endpoint. The exchange runs under its own
//! timeout; a token is reused until shortly before it expires.

use std::{fs, path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    backend::push::transport::{HttpRequest, HttpTransport, TransportError},
    infra::secrets::redact_text,
    usecases::contracts::{Clock, CredentialError},
};

const TOKEN_REFRESHED: &str = "PUSH_TOKEN_REFRESHED";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3_600;
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3_600;
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken, CredentialError>;
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_owned()
}

/// Fields of a service-account key file used for the bearer grant.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, CredentialError> {
        let key: Self = serde_json::from_str(raw).map_err(|error| CredentialError::InvalidKey {
            details: error.to_string(),
        })?;

        if key.client_email.trim().is_empty() {
            return Err(CredentialError::InvalidKey {
                details: "client_email is empty".to_owned(),
            });
        }

        Ok(key)
    }

    pub fn from_file(path: &Path) -> Result<Self, CredentialError> {
        let raw = fs::read_to_string(path).map_err(|error| CredentialError::InvalidKey {
            details: format!("{}: {error}", path.display()),
        })?;

        Self::from_json(&raw)
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug)]
struct CachedToken {
    token: AccessToken,
    refresh_after_ms: i64,
}

pub struct ServiceAccountTokenSource {
    transport: Arc<dyn HttpTransport>,
    account: ServiceAccountKey,
    signing_key: EncodingKey,
    scope: String,
    timeout: Duration,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    /// Fails when the account's private key is not an RSA PEM.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        account: ServiceAccountKey,
        scope: impl Into<String>,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CredentialError> {
        let signing_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes()).map_err(
            |error| CredentialError::InvalidKey {
                details: error.to_string(),
            },
        )?;

        Ok(Self {
            transport,
            account,
            signing_key,
            scope: scope.into(),
            timeout,
            clock,
            cached: Mutex::new(None),
        })
    }

    fn signed_assertion(&self) -> Result<String, CredentialError> {
        let issued_at = self.clock.now_ms().div_euclid(1_000);
        let claims = AssertionClaims {
            iss: self.account.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.account.token_uri.clone(),
            iat: issued_at,
            exp: issued_at.saturating_add(ASSERTION_LIFETIME_SECS),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.account.private_key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.signing_key).map_err(|error| {
            CredentialError::InvalidKey {
                details: error.to_string(),
            }
        })
    }

    async fn exchange(&self) -> Result<TokenResponse, CredentialError> {
        let fields = vec![
            ("grant_type".to_owned(), JWT_BEARER_GRANT.to_owned()),
            ("assertion".to_owned(), self.signed_assertion()?),
        ];

        let response = self
            .transport
            .post(HttpRequest::form(&self.account.token_uri, fields))
            .await
            .map_err(|error| match error {
                TransportError::Timeout => CredentialError::Timeout,
                TransportError::Request(details) => CredentialError::Transport {
                    details: redact_text(&details),
                },
            })?;

        if !response.is_success() {
            return Err(CredentialError::Rejected {
                status: response.status,
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&response.body).map_err(|error| CredentialError::Malformed {
                details: error.to_string(),
            })?;

        if token.access_token.trim().is_empty() {
            return Err(CredentialError::Malformed {
                details: "empty access_token".to_owned(),
            });
        }

        Ok(token)
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<AccessToken, CredentialError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached
            .as_ref()
            .filter(|token| self.clock.now_ms() < token.refresh_after_ms)
        {
            return Ok(token.token.clone());
        }

        let response = tokio::time::timeout(self.timeout, self.exchange())
            .await
            .map_err(|_| CredentialError::Timeout)??;

        let lifetime_secs = response
            .expires_in
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
            .saturating_sub(REFRESH_MARGIN_SECS)
            .max(0);
        let token = AccessToken::new(response.access_token);

        *cached = Some(CachedToken {
            token: token.clone(),
            refresh_after_ms: self
                .clock
                .now_ms()
                .saturating_add(lifetime_secs.saturating_mul(1_000)),
        });

        tracing::debug!(
            code = TOKEN_REFRESHED,
            lifetime_secs,
            "push access token refreshed"
        );

        Ok(token)
    }
}

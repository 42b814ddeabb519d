use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub logging: LogConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub push: PushConfig,
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SessionConfig {
    pub user_id: String,
    pub display_name: String,
    pub device_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StorageConfig {
    /// Overrides the platform data directory.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushConfig {
    pub enabled: bool,
    pub send_endpoint: String,
    pub subscribe_endpoint: String,
    pub request_timeout_ms: u64,
    pub notify_timeout_ms: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            send_endpoint: String::new(),
            subscribe_endpoint: "https://iid.googleapis.com/iid/v1:batchAdd".to_owned(),
            request_timeout_ms: 5_000,
            notify_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialsConfig {
    /// Service-account key file (JSON) used to sign token requests.
    pub service_account_file: Option<PathBuf>,
    pub scope: String,
    pub exchange_timeout_ms: u64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            service_account_file: None,
            scope: "https://www.googleapis.com/auth/firebase.messaging".to_owned(),
            exchange_timeout_ms: 3_000,
        }
    }
}

use std::{path::Path, sync::Arc, time::Duration};

use crate::{
    backend::{
        blob_store::FsBlobStore,
        channel_registry::LocalChannelRegistry,
        clock::SystemClock,
        local_store::LocalMessageStore,
        push::{
            credentials::{ServiceAccountKey, ServiceAccountTokenSource},
            dispatcher::{DisabledDispatcher, PushEndpoints, PushNotificationDispatcher},
            transport::ReqwestTransport,
        },
    },
    infra::{self, config::AppConfig, error::AppError},
    usecases::{
        chat_session::ChatSession,
        context::AppContext,
        contracts::{Clock, CredentialError, NotificationDispatcher},
        startup,
    },
};

const PUSH_DISABLED: &str = "BOOTSTRAP_PUSH_DISABLED";
const PUSH_ENABLED: &str = "BOOTSTRAP_PUSH_ENABLED";

pub fn bootstrap(config_path: Option<&Path>) -> Result<AppContext, AppError> {
    let config = infra::config::load(config_path)?;
    infra::logging::init(&config.logging)?;

    build_context(config)
}

fn build_context(config: AppConfig) -> Result<AppContext, AppError> {
    let storage = startup::prepare_storage(&config.storage)?;
    let layout = &storage.layout;

    let store = Arc::new(LocalMessageStore::open(&layout.messages_dir)?);
    let channels = Arc::new(LocalChannelRegistry::open(&layout.channels_file())?);
    let blobs = Arc::new(FsBlobStore::new(layout.blobs_dir.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::default());
    let dispatcher = build_dispatcher(&config, clock.clone())?;

    let chat = ChatSession::new(
        store.clone(),
        dispatcher,
        blobs,
        clock.clone(),
        Duration::from_millis(config.push.notify_timeout_ms),
    );

    Ok(AppContext {
        config,
        storage,
        store,
        channels,
        clock,
        chat,
    })
}

fn build_dispatcher(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn NotificationDispatcher>, AppError> {
    let push = &config.push;
    if !push.enabled {
        tracing::info!(code = PUSH_DISABLED, "push notifications disabled");
        return Ok(Arc::new(DisabledDispatcher));
    }

    let credentials = &config.credentials;
    let key_file = credentials
        .service_account_file
        .as_deref()
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_default();
    let missing = [
        ("push.send_endpoint", push.send_endpoint.as_str()),
        ("push.subscribe_endpoint", push.subscribe_endpoint.as_str()),
        ("credentials.service_account_file", key_file.as_str()),
        ("credentials.scope", credentials.scope.as_str()),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty());

    if let Some((field, _)) = missing {
        return Err(AppError::PushConfig {
            details: format!("{field} must be set when push is enabled"),
        });
    }

    let push_config_error = |error: CredentialError| AppError::PushConfig {
        details: error.to_string(),
    };
    let account = ServiceAccountKey::from_file(Path::new(&key_file)).map_err(push_config_error)?;

    let transport = Arc::new(
        ReqwestTransport::new(Duration::from_millis(push.request_timeout_ms)).map_err(
            |error| AppError::PushConfig {
                details: format!("http client: {error}"),
            },
        )?,
    );

    let tokens = Arc::new(
        ServiceAccountTokenSource::new(
            transport.clone(),
            account,
            credentials.scope.clone(),
            Duration::from_millis(credentials.exchange_timeout_ms),
            clock,
        )
        .map_err(push_config_error)?,
    );

    tracing::info!(
        code = PUSH_ENABLED,
        send_endpoint = %push.send_endpoint,
        "push notifications enabled"
    );

    Ok(Arc::new(PushNotificationDispatcher::new(
        transport,
        tokens,
        PushEndpoints {
            send_url: push.send_endpoint.clone(),
            subscribe_url: push.subscribe_endpoint.clone(),
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::session::SessionError, test_support::SERVICE_ACCOUNT_JSON};

    fn config_in(dir: &tempfile::TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.data_dir = Some(dir.path().to_path_buf());
        config.session.user_id = "u1".to_owned();
        config.session.display_name = "Alice".to_owned();
        config
    }

    #[test]
    fn builds_context_with_push_disabled_by_default() {
        let dir = tempfile::tempdir().expect("temp dir");

        let context = build_context(config_in(&dir)).expect("context should build");

        assert!(context.channels.list().is_empty());
        assert_eq!(context.session().expect("session").display_name(), "Alice");
    }

    #[test]
    fn enabled_push_requires_endpoint_and_credentials() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut config = config_in(&dir);
        config.push.enabled = true;

        let err = build_context(config).expect_err("incomplete push config must fail");

        let AppError::PushConfig { details } = err else {
            panic!("expected push config error, got {err:?}");
        };
        assert!(details.contains("push.send_endpoint"));
    }

    #[test]
    fn enabled_push_builds_with_complete_config() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut config = config_in(&dir);
        config.push.enabled = true;
        config.push.send_endpoint = "https://push.test/send".to_owned();
        let key_file = dir.path().join("service_account.json");
        std::fs::write(&key_file, SERVICE_ACCOUNT_JSON).expect("key fixture");
        config.credentials.service_account_file = Some(key_file);

        build_context(config).expect("complete push config should build");
    }

    #[test]
    fn enabled_push_reports_unreadable_key_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut config = config_in(&dir);
        config.push.enabled = true;
        config.push.send_endpoint = "https://push.test/send".to_owned();
        config.credentials.service_account_file = Some(dir.path().join("missing.json"));

        let err = build_context(config).expect_err("missing key file must fail");

        let AppError::PushConfig { details } = err else {
            panic!("expected push config error, got {err:?}");
        };
        assert!(details.contains("missing.json"));
    }

    #[test]
    fn missing_display_name_is_reported_as_invalid_session() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut config = config_in(&dir);
        config.session.display_name = " ".to_owned();

        let context = build_context(config).expect("context should build");

        assert!(matches!(
            context.session(),
            Err(AppError::SessionInvalid(SessionError::MissingDisplayName))
        ));
    }
}

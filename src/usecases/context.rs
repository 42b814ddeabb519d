use std::sync::Arc;

use crate::{
    backend::local_store::LocalMessageStore,
    domain::session::{DeviceToken, SessionContext},
    infra::{config::AppConfig, error::AppError},
    usecases::{
        chat_session::ChatSession,
        contracts::{ChannelRegistry, Clock},
        startup::StoragePlan,
    },
};

pub struct AppContext {
    pub config: AppConfig,
    pub storage: StoragePlan,
    pub store: Arc<LocalMessageStore>,
    pub channels: Arc<dyn ChannelRegistry>,
    pub clock: Arc<dyn Clock>,
    pub chat: ChatSession,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("storage", &self.storage)
            .field("chat", &self.chat)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Identity of the local user, built from the `[session]` section.
    pub fn session(&self) -> Result<SessionContext, AppError> {
        let session = &self.config.session;
        SessionContext::new(
            &session.user_id,
            &session.display_name,
            session.device_token.as_deref().and_then(DeviceToken::new),
        )
        .map_err(AppError::SessionInvalid)
    }
}

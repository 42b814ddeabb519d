use crate::{
    domain::channel::{filter_by_prefix, Channel, ChannelNameError},
    usecases::contracts::{ChannelRegistry, Clock, StoreError},
};

const CHANNEL_CREATE_FAILED: &str = "CHANNELS_CREATE_FAILED";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreateChannelError {
    #[error("invalid channel name: {0}")]
    Name(#[from] ChannelNameError),
    #[error("channel could not be stored: {0}")]
    Store(#[from] StoreError),
}

pub async fn create_channel(
    registry: &dyn ChannelRegistry,
    clock: &dyn Clock,
    name: &str,
) -> Result<Channel, CreateChannelError> {
    let draft = Channel::draft(name, clock.now_ms())?;

    registry.create(draft).await.map_err(|error| {
        tracing::warn!(
            code = CHANNEL_CREATE_FAILED,
            error = %error,
            "channel create failed"
        );
        CreateChannelError::Store(error)
    })
}

/// Channels in creation order, narrowed to names starting with `query`.
pub fn search_channels(registry: &dyn ChannelRegistry, query: Option<&str>) -> Vec<Channel> {
    let channels = registry.list();
    filter_by_prefix(&channels, query.unwrap_or_default())
        .into_iter()
        .cloned()
        .collect()
}

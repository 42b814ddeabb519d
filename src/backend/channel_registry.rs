use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{
    fs::OpenOptions,
    io::AsyncWriteExt,
    sync::{watch, Mutex},
};

use crate::{
    backend::{read_json_lines, StoreLoadError},
    domain::channel::{sort_channels, Channel, ChannelId},
    usecases::contracts::{ChannelRegistry, StoreError},
};

const CHANNEL_CREATED: &str = "REGISTRY_CHANNEL_CREATED";

/// Channel metadata kept in a JSON-lines file and published as a live list.
#[derive(Debug)]
pub struct LocalChannelRegistry {
    file: Option<PathBuf>,
    write_lock: Mutex<()>,
    feed: watch::Sender<Vec<Channel>>,
}

impl LocalChannelRegistry {
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn in_memory() -> Self {
        Self::with_channels(None, Vec::new())
    }

    pub fn open(file: &Path) -> Result<Self, StoreLoadError> {
        let channels = read_json_lines(file)?;
        Ok(Self::with_channels(Some(file.to_path_buf()), channels))
    }

    fn with_channels(file: Option<PathBuf>, mut channels: Vec<Channel>) -> Self {
        sort_channels(&mut channels);
        let (feed, _) = watch::channel(channels);
        Self {
            file,
            write_lock: Mutex::new(()),
            feed,
        }
    }

    async fn persist(&self, channel: &Channel) -> Result<(), StoreError> {
        let Some(file) = &self.file else {
            return Ok(());
        };

        let mut line = serde_json::to_string(channel).map_err(|error| StoreError::Unavailable {
            details: format!("channel encoding failed: {error}"),
        })?;
        line.push('\n');

        let unavailable = |error: std::io::Error| StoreError::Unavailable {
            details: format!("{}: {error}", file.display()),
        };

        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .await
            .map_err(unavailable)?;
        handle.write_all(line.as_bytes()).await.map_err(unavailable)?;
        handle.sync_data().await.map_err(unavailable)?;

        Ok(())
    }
}

#[async_trait]
impl ChannelRegistry for LocalChannelRegistry {
    async fn create(&self, mut channel: Channel) -> Result<Channel, StoreError> {
        let _serialized = self.write_lock.lock().await;

        if channel.id.is_unassigned() {
            let generated = uuid::Uuid::new_v4().simple().to_string();
            channel.id = ChannelId::parse(&generated).map_err(|error| StoreError::Unavailable {
                details: error.to_string(),
            })?;
        } else if self
            .feed
            .borrow()
            .iter()
            .any(|existing| existing.id == channel.id)
        {
            return Err(StoreError::Conflict {
                key: channel.id.to_string(),
            });
        }

        self.persist(&channel).await?;

        self.feed.send_modify(|channels| {
            channels.push(channel.clone());
            sort_channels(channels);
        });

        tracing::info!(
            code = CHANNEL_CREATED,
            channel_id = %channel.id,
            "channel created"
        );

        Ok(channel)
    }

    fn watch(&self) -> watch::Receiver<Vec<Channel>> {
        self.feed.subscribe()
    }
}

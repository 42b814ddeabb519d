//! Durable per-channel message log with live snapshot listeners.
//!
//! Each channel is a JSON-lines file (`<channel>.jsonl`). Appends are
//! serialized, written and fsynced before the in-memory log changes. Every
//! insert then queues the new ordered snapshot on each listener's own
//! channel, so a listener sees one snapshot per change in insertion order.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use tokio::{
    fs::OpenOptions,
    io::AsyncWriteExt,
    sync::{mpsc, Mutex as AsyncMutex},
};

use crate::{
    backend::{channel_file_name, StoreLoadError, LOG_FILE_EXTENSION},
    domain::{
        channel::ChannelId,
        message::{Message, MessageId},
    },
    usecases::contracts::{
        MessageStore, SnapshotCallback, SnapshotEvent, StoreError, SubscriptionError,
        SubscriptionHandle,
    },
};

const STORE_CHANNEL_FILE_SKIPPED: &str = "STORE_CHANNEL_FILE_SKIPPED";
const STORE_LISTENER_STARTED: &str = "STORE_LISTENER_STARTED";
const STORE_LISTENER_CLOSED: &str = "STORE_LISTENER_CLOSED";
const STORE_SHUTDOWN: &str = "STORE_SHUTDOWN";

type Listener = mpsc::UnboundedSender<Arc<Vec<Message>>>;

#[derive(Debug, Default)]
struct ChannelLog {
    messages: Vec<Message>,
    listeners: Vec<Listener>,
}

impl ChannelLog {
    fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            listeners: Vec::new(),
        }
    }

    fn contains(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|message| &message.id == id)
    }

    fn live_listeners(&self) -> usize {
        self.listeners
            .iter()
            .filter(|listener| !listener.is_closed())
            .count()
    }

    fn is_idle(&self) -> bool {
        self.messages.is_empty() && self.live_listeners() == 0
    }

    /// Queues the current snapshot on a new listener before any later change.
    fn attach(&mut self) -> mpsc::UnboundedReceiver<Arc<Vec<Message>>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Arc::new(self.messages.clone()));
        self.listeners.push(tx);
        rx
    }

    fn insert(&mut self, message: Message) {
        let at = self
            .messages
            .partition_point(|existing| existing.snapshot_order(&message).is_lt());
        self.messages.insert(at, message);

        let snapshot = Arc::new(self.messages.clone());
        self.listeners
            .retain(|listener| listener.send(Arc::clone(&snapshot)).is_ok());
    }
}

#[derive(Debug, Default)]
struct StoreState {
    channels: HashMap<ChannelId, ChannelLog>,
    closed: bool,
}

impl StoreState {
    /// Drops channels with no messages whose listeners are all gone.
    fn prune_idle(&mut self) {
        self.channels.retain(|_, log| !log.is_idle());
    }
}

#[derive(Debug)]
pub struct LocalMessageStore {
    dir: Option<PathBuf>,
    state: Mutex<StoreState>,
    write_lock: AsyncMutex<()>,
}

impl LocalMessageStore {
    #[cfg_attr(not(test), allow(dead_code))]
    /// Store without a backing directory; contents last for the process.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            state: Mutex::new(StoreState::default()),
            write_lock: AsyncMutex::new(()),
        }
    }

    /// Opens the store over `dir`, loading every channel log found there.
    pub fn open(dir: &Path) -> Result<Self, StoreLoadError> {
        fs::create_dir_all(dir).map_err(|source| StoreLoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let entries = fs::read_dir(dir).map_err(|source| StoreLoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut state = StoreState::default();
        for entry in entries {
            let path = entry
                .map_err(|source| StoreLoadError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?
                .path();

            if path.extension().and_then(|ext| ext.to_str()) != Some(LOG_FILE_EXTENSION) {
                continue;
            }

            let Some(channel_id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| ChannelId::parse(stem).ok())
            else {
                tracing::warn!(
                    code = STORE_CHANNEL_FILE_SKIPPED,
                    path = %path.display(),
                    "skipping message log with invalid channel id"
                );
                continue;
            };

            let mut messages: Vec<Message> = super::read_json_lines(&path)?;
            messages.sort_by(Message::snapshot_order);
            state.channels.insert(channel_id, ChannelLog::new(messages));
        }

        Ok(Self {
            dir: Some(dir.to_path_buf()),
            state: Mutex::new(state),
            write_lock: AsyncMutex::new(()),
        })
    }

    #[cfg_attr(not(test), allow(dead_code))]
    /// Number of live listeners registered on `channel_id`.
    pub fn listener_count(&self, channel_id: &ChannelId) -> usize {
        self.state()
            .channels
            .get(channel_id)
            .map_or(0, ChannelLog::live_listeners)
    }

    /// Ends every subscription with a terminal `Closed` event and refuses
    /// further appends and subscriptions.
    pub fn shutdown(&self) {
        let mut state = self.state();
        state.closed = true;
        for log in state.channels.values_mut() {
            log.listeners.clear();
        }

        tracing::info!(code = STORE_SHUTDOWN, "message store shut down");
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn persist(&self, channel_id: &ChannelId, message: &Message) -> Result<(), StoreError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        let mut line = serde_json::to_string(message).map_err(|error| StoreError::Unavailable {
            details: format!("message encoding failed: {error}"),
        })?;
        line.push('\n');

        let path = dir.join(channel_file_name(channel_id));
        let unavailable = |error: std::io::Error| StoreError::Unavailable {
            details: format!("{}: {error}", path.display()),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(unavailable)?;
        file.write_all(line.as_bytes()).await.map_err(unavailable)?;
        file.sync_data().await.map_err(unavailable)?;

        Ok(())
    }
}

#[async_trait]
impl MessageStore for LocalMessageStore {
    async fn append(
        &self,
        channel_id: &ChannelId,
        mut message: Message,
    ) -> Result<MessageId, StoreError> {
        if !message.has_content() {
            return Err(StoreError::EmptyMessage);
        }

        let _serialized = self.write_lock.lock().await;

        {
            let mut state = self.state();
            if state.closed {
                return Err(StoreError::Unavailable {
                    details: "store is shut down".to_owned(),
                });
            }

            if message.id.is_unassigned() {
                message.id = MessageId::new(uuid::Uuid::new_v4().simple().to_string());
            } else if state
                .channels
                .get(channel_id)
                .is_some_and(|log| log.contains(&message.id))
            {
                return Err(StoreError::Conflict {
                    key: message.id.to_string(),
                });
            }
        }

        self.persist(channel_id, &message).await?;

        let message_id = message.id.clone();
        let mut state = self.state();
        state.prune_idle();
        state
            .channels
            .entry(channel_id.clone())
            .or_default()
            .insert(message);

        Ok(message_id)
    }

    fn subscribe(
        &self,
        channel_id: &ChannelId,
        on_update: SnapshotCallback,
    ) -> Result<SubscriptionHandle, SubscriptionError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|error| SubscriptionError::Unavailable {
                details: error.to_string(),
            })?;

        let mut snapshots = {
            let mut state = self.state();
            if state.closed {
                return Err(SubscriptionError::Closed);
            }

            state.prune_idle();
            state
                .channels
                .entry(channel_id.clone())
                .or_default()
                .attach()
        };

        tracing::debug!(
            code = STORE_LISTENER_STARTED,
            channel_id = %channel_id,
            "message listener registered"
        );

        let listener_channel = channel_id.clone();
        let task = runtime.spawn(async move {
            while let Some(snapshot) = snapshots.recv().await {
                on_update(SnapshotEvent::Snapshot(snapshot.as_ref().clone()));
            }

            tracing::debug!(
                code = STORE_LISTENER_CLOSED,
                channel_id = %listener_channel,
                "message listener terminated by store"
            );
            on_update(SnapshotEvent::Terminated(SubscriptionError::Closed));
        });

        Ok(SubscriptionHandle::new(move || task.abort()))
    }
}

//! Collaborator contracts used by the chat workflows.
//!
//! Each backend concern (message log, channel list, blob store, push) sits
//! behind a trait so workflows can be exercised against stubs.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::{
    channel::{Channel, ChannelId},
    message::{Message, MessageId},
    session::SessionContext,
};

/// Delivery from a live message subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotEvent {
    /// Entire ordered message log of the channel at this point.
    Snapshot(Vec<Message>),
    /// The subscription ended; no further events follow.
    Terminated(SubscriptionError),
}

pub type SnapshotCallback = Arc<dyn Fn(SnapshotEvent) + Send + Sync>;

/// Live listener registration. Dropping the handle releases the listener.
#[must_use = "dropping the handle releases the listener immediately"]
pub struct SubscriptionHandle {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("active", &self.release.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store is unavailable: {details}")]
    Unavailable { details: String },
    #[error("store denied the write")]
    PermissionDenied,
    #[error("key {key} is already used")]
    Conflict { key: String },
    #[error("message has neither text nor image")]
    EmptyMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    #[error("subscription permission was revoked")]
    PermissionRevoked,
    #[error("store closed the subscription")]
    Closed,
    #[error("store is unavailable: {details}")]
    Unavailable { details: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("blob key {key:?} is not allowed")]
    InvalidKey { key: String },
    #[error("image source could not be read: {details}")]
    SourceUnreadable { details: String },
    #[error("blob write failed: {details}")]
    WriteFailed { details: String },
    #[error("blob {key} was not found")]
    NotFound { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("credential exchange timed out")]
    Timeout,
    #[error("credential exchange rejected with status {status}")]
    Rejected { status: u16 },
    #[error("credential exchange transport failed: {details}")]
    Transport { details: String },
    #[error("credential response was malformed: {details}")]
    Malformed { details: String },
    #[error("service account key is unusable: {details}")]
    InvalidKey { details: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("push backend rejected request with status {status}: {detail}")]
    Rejected { status: u16, detail: String },
    #[error("push transport failed: {details}")]
    Transport { details: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("session has no device token to register")]
    MissingDeviceToken,
}

/// Append-only per-channel message log with ordered live snapshots.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Files `message` under `channel_id`, assigning an id when unassigned.
    async fn append(
        &self,
        channel_id: &ChannelId,
        message: Message,
    ) -> Result<MessageId, StoreError>;

    /// Registers a listener that receives the full ordered log on every change.
    fn subscribe(
        &self,
        channel_id: &ChannelId,
        on_update: SnapshotCallback,
    ) -> Result<SubscriptionHandle, SubscriptionError>;
}

#[async_trait]
pub trait ChannelRegistry: Send + Sync {
    /// Persists a drafted channel and returns it with its assigned id.
    async fn create(&self, channel: Channel) -> Result<Channel, StoreError>;

    /// Live, creation-ordered channel list.
    fn watch(&self) -> watch::Receiver<Vec<Channel>>;

    fn list(&self) -> Vec<Channel> {
        self.watch().borrow().clone()
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_file(&self, key: &str, source: &Path) -> Result<(), UploadError>;
    async fn download_url(&self, key: &str) -> Result<String, UploadError>;
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Subscribes this device to the channel's topic. Safe to repeat.
    async fn register_interest(
        &self,
        session: &SessionContext,
        channel_id: &ChannelId,
    ) -> Result<(), NotifyError>;

    async fn notify_channel(
        &self,
        channel_id: &ChannelId,
        sender_name: &str,
        message_body: &str,
    ) -> Result<(), NotifyError>;
}

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn handle_releases_once_on_explicit_release() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let handle = SubscriptionHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        handle.release();

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handle_releases_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);

        {
            let _handle = SubscriptionHandle::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn notify_error_wraps_credential_error_transparently() {
        let error = NotifyError::from(CredentialError::Timeout);

        assert_eq!(error.to_string(), "credential exchange timed out");
    }
}

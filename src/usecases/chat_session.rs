//! Chat session orchestration: compose-and-send plus live channel views.
//!
//! A compose action validates its input, uploads an attached image, appends
//! the message to the store and, only after the append is confirmed, asks the
//! dispatcher to push a notification. Push is a best-effort side channel: its
//! outcome is reported but never turns a stored message into a failure.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tokio::sync::mpsc;

use crate::{
    domain::{
        channel::ChannelId,
        compose_state::{ComposeEvent, ComposeState},
        message::{normalize_text, Message, MessageId},
        session::SessionContext,
    },
    usecases::contracts::{
        BlobStore, Clock, DeliveryError, MessageStore, NotificationDispatcher, NotifyError,
        SnapshotCallback, SnapshotEvent, StoreError, SubscriptionError, SubscriptionHandle, UploadError,
    },
};

const COMPOSE_SKIPPED: &str = "CHAT_COMPOSE_SKIPPED";
const COMPOSE_STATE_CHANGED: &str = "CHAT_COMPOSE_STATE_CHANGED";
const COMPOSE_INVALID_TRANSITION: &str = "CHAT_COMPOSE_INVALID_TRANSITION";
const COMPOSE_UPLOAD_FAILED: &str = "CHAT_COMPOSE_UPLOAD_FAILED";
const COMPOSE_WRITE_FAILED: &str = "CHAT_COMPOSE_WRITE_FAILED";
const COMPOSE_PERSISTED: &str = "CHAT_COMPOSE_PERSISTED";
const NOTIFY_DELIVERED: &str = "CHAT_NOTIFY_DELIVERED";
const NOTIFY_FAILED: &str = "CHAT_NOTIFY_FAILED";
const NOTIFY_TIMED_OUT: &str = "CHAT_NOTIFY_TIMED_OUT";
const INTEREST_REGISTERED: &str = "CHAT_INTEREST_REGISTERED";
const INTEREST_FAILED: &str = "CHAT_INTEREST_FAILED";
const OPEN_SUBSCRIBE_FAILED: &str = "CHAT_OPEN_SUBSCRIBE_FAILED";
const UPDATE_RECEIVER_GONE: &str = "CHAT_UPDATE_RECEIVER_GONE";

const IMAGE_KEY_PREFIX: &str = "images";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeRequest {
    pub channel_id: ChannelId,
    pub text: Option<String>,
    /// Local image to upload and attach.
    pub image: Option<PathBuf>,
}

impl ComposeRequest {
    pub fn text(channel_id: ChannelId, text: impl Into<String>) -> Self {
        Self {
            channel_id,
            text: Some(text.into()),
            image: None,
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn image(channel_id: ChannelId, path: impl Into<PathBuf>) -> Self {
        Self {
            channel_id,
            text: None,
            image: Some(path.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Delivered,
    Failed(NotifyError),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeOutcome {
    /// Neither text nor image was present; nothing was stored or pushed.
    Skipped,
    Sent {
        message_id: MessageId,
        notification: NotificationOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    #[error("image upload failed: {0}")]
    Upload(#[source] UploadError),
    #[error("message write failed: {0}")]
    Write(#[source] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpenChannelError {
    #[error("channel subscription failed: {0}")]
    Subscription(#[source] SubscriptionError),
}

/// Snapshot event tagged with the channel it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelUpdate {
    pub channel_id: ChannelId,
    pub event: SnapshotEvent,
}

/// An open channel. Dropping the view releases its store listener.
#[derive(Debug)]
pub struct ChannelView {
    channel_id: ChannelId,
    subscription: SubscriptionHandle,
}

impl ChannelView {
    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    pub fn close(self) {
        self.subscription.release();
    }
}

pub struct ChatSession {
    store: Arc<dyn MessageStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    notify_timeout: Duration,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("notify_timeout", &self.notify_timeout)
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    pub fn new(
        store: Arc<dyn MessageStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            store,
            dispatcher,
            blobs,
            clock,
            notify_timeout,
        }
    }

    /// Sends a message composed by `session`.
    ///
    /// # Errors
    /// `ComposeError::Upload` when the attached image cannot be stored (no
    /// message is created) and `ComposeError::Write` when the append fails (no
    /// notification is sent). Notification failures are never errors here.
    pub async fn compose(
        &self,
        session: &SessionContext,
        request: ComposeRequest,
    ) -> Result<ComposeOutcome, ComposeError> {
        let mut tracker = ComposeTracker::start(&request.channel_id);

        let text = normalize_text(request.text.as_deref());
        let image = request
            .image
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty());

        if text.is_none() && image.is_none() {
            tracker.advance(ComposeEvent::NothingToSend);
            tracing::debug!(
                code = COMPOSE_SKIPPED,
                channel_id = %request.channel_id,
                "compose skipped: neither text nor image present"
            );
            return Ok(ComposeOutcome::Skipped);
        }

        let image_url = match image {
            Some(path) => {
                tracker.advance(ComposeEvent::ImageAttached);
                match self.upload_image(path).await {
                    Ok(url) => {
                        tracker.advance(ComposeEvent::Uploaded);
                        Some(url)
                    }
                    Err(error) => {
                        tracker.advance(ComposeEvent::UploadFailed);
                        tracing::warn!(
                            code = COMPOSE_UPLOAD_FAILED,
                            channel_id = %request.channel_id,
                            error = %error,
                            "image upload failed; message not sent"
                        );
                        return Err(ComposeError::Upload(error));
                    }
                }
            }
            None => {
                tracker.advance(ComposeEvent::TextOnly);
                None
            }
        };

        let message = Message {
            id: MessageId::unassigned(),
            sender_id: session.user_id().to_owned(),
            text,
            created_at: self.clock.now_ms(),
            sender_name: session.display_name().to_owned(),
            reply_to: None,
            image_url,
        };
        let body = message.notification_text().to_owned();

        let message_id = match self.store.append(&request.channel_id, message).await {
            Ok(message_id) => {
                tracker.advance(ComposeEvent::Persisted);
                tracing::info!(
                    code = COMPOSE_PERSISTED,
                    channel_id = %request.channel_id,
                    message_id = %message_id,
                    "message persisted"
                );
                message_id
            }
            Err(error) => {
                tracker.advance(ComposeEvent::PersistRejected);
                tracing::warn!(
                    code = COMPOSE_WRITE_FAILED,
                    channel_id = %request.channel_id,
                    error = %error,
                    "message write failed; notification suppressed"
                );
                tracker.advance(ComposeEvent::Finished);
                return Err(ComposeError::Write(error));
            }
        };

        let notification = self
            .dispatch_notification(&request.channel_id, session.display_name(), &body)
            .await;
        tracker.advance(ComposeEvent::Finished);

        Ok(ComposeOutcome::Sent {
            message_id,
            notification,
        })
    }

    /// Opens a live view of `channel_id`, forwarding snapshots to `updates`.
    ///
    /// Topic interest is always attempted as well, but only the subscription
    /// decides whether the open succeeds.
    pub async fn open_channel(
        &self,
        session: &SessionContext,
        channel_id: &ChannelId,
        updates: mpsc::UnboundedSender<ChannelUpdate>,
    ) -> Result<ChannelView, OpenChannelError> {
        let subscription = self
            .store
            .subscribe(channel_id, forward_to(channel_id.clone(), updates));

        self.register_interest(session, channel_id).await;

        let subscription = subscription.map_err(|error| {
            tracing::warn!(
                code = OPEN_SUBSCRIBE_FAILED,
                channel_id = %channel_id,
                error = %error,
                "channel subscription failed"
            );
            OpenChannelError::Subscription(error)
        })?;

        Ok(ChannelView {
            channel_id: channel_id.clone(),
            subscription,
        })
    }

    async fn upload_image(&self, path: &Path) -> Result<String, UploadError> {
        let key = format!("{IMAGE_KEY_PREFIX}/{}", uuid::Uuid::new_v4().simple());
        self.blobs.put_file(&key, path).await?;
        self.blobs.download_url(&key).await
    }

    /// Runs the push on its own task; the timeout only bounds how long the
    /// caller waits, the request itself runs to completion or failure.
    async fn dispatch_notification(
        &self,
        channel_id: &ChannelId,
        sender_name: &str,
        body: &str,
    ) -> NotificationOutcome {
        let dispatcher = Arc::clone(&self.dispatcher);
        let channel = channel_id.clone();
        let sender_name = sender_name.to_owned();
        let body = body.to_owned();

        let dispatch = tokio::spawn(async move {
            let result = dispatcher.notify_channel(&channel, &sender_name, &body).await;
            match &result {
                Ok(()) => tracing::debug!(
                    code = NOTIFY_DELIVERED,
                    channel_id = %channel,
                    "channel notification dispatched"
                ),
                Err(error) => tracing::warn!(
                    code = NOTIFY_FAILED,
                    channel_id = %channel,
                    error = %error,
                    "channel notification failed; message remains stored"
                ),
            }
            result
        });

        match tokio::time::timeout(self.notify_timeout, dispatch).await {
            Ok(Ok(Ok(()))) => NotificationOutcome::Delivered,
            Ok(Ok(Err(error))) => NotificationOutcome::Failed(error),
            Ok(Err(join_error)) => {
                tracing::warn!(
                    code = NOTIFY_FAILED,
                    channel_id = %channel_id,
                    error = %join_error,
                    "channel notification task ended abnormally"
                );
                NotificationOutcome::Failed(NotifyError::Delivery(DeliveryError::Transport {
                    details: join_error.to_string(),
                }))
            }
            Err(_) => {
                tracing::warn!(
                    code = NOTIFY_TIMED_OUT,
                    channel_id = %channel_id,
                    timeout_ms = self.notify_timeout.as_millis() as u64,
                    "channel notification still in flight; message remains stored"
                );
                NotificationOutcome::TimedOut
            }
        }
    }

    async fn register_interest(&self, session: &SessionContext, channel_id: &ChannelId) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let session = session.clone();
        let channel = channel_id.clone();

        let register = tokio::spawn(async move {
            match dispatcher.register_interest(&session, &channel).await {
                Ok(()) => tracing::info!(
                    code = INTEREST_REGISTERED,
                    channel_id = %channel,
                    "registered push interest for channel"
                ),
                Err(error) => tracing::warn!(
                    code = INTEREST_FAILED,
                    channel_id = %channel,
                    error = %error,
                    "push interest registration failed; in-app delivery unaffected"
                ),
            }
        });

        match tokio::time::timeout(self.notify_timeout, register).await {
            Ok(Ok(())) => {}
            Ok(Err(join_error)) => tracing::warn!(
                code = INTEREST_FAILED,
                channel_id = %channel_id,
                error = %join_error,
                "push interest task ended abnormally"
            ),
            Err(_) => tracing::warn!(
                code = INTEREST_FAILED,
                channel_id = %channel_id,
                "push interest registration still in flight; in-app delivery unaffected"
            ),
        }
    }
}

fn forward_to(channel_id: ChannelId, updates: mpsc::UnboundedSender<ChannelUpdate>) -> SnapshotCallback {
    Arc::new(move |event| {
        let update = ChannelUpdate {
            channel_id: channel_id.clone(),
            event,
        };
        if updates.send(update).is_err() {
            tracing::debug!(
                code = UPDATE_RECEIVER_GONE,
                channel_id = %channel_id,
                "channel update dropped: presentation receiver closed"
            );
        }
    })
}

struct ComposeTracker<'a> {
    channel_id: &'a ChannelId,
    state: ComposeState,
}

impl<'a> ComposeTracker<'a> {
    fn start(channel_id: &'a ChannelId) -> Self {
        let mut tracker = Self {
            channel_id,
            state: ComposeState::Idle,
        };
        tracker.advance(ComposeEvent::Started);
        tracker
    }

    fn advance(&mut self, event: ComposeEvent) {
        match self.state.transition(event) {
            Some(next) => {
                tracing::trace!(
                    code = COMPOSE_STATE_CHANGED,
                    channel_id = %self.channel_id,
                    from = self.state.as_label(),
                    to = next.as_label(),
                    "compose state changed"
                );
                self.state = next;
            }
            None => tracing::warn!(
                code = COMPOSE_INVALID_TRANSITION,
                channel_id = %self.channel_id,
                state = self.state.as_label(),
                event = ?event,
                "ignored compose event invalid for current state"
            ),
        }
    }
}

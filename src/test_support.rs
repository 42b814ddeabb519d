use std::{
    collections::VecDeque,
    path::Path,
    sync::{
        atomic::{AtomicI64, AtomicUsize, Ordering},
        Mutex, MutexGuard,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    backend::push::{
        credentials::{AccessToken, ServiceAccountKey, TokenSource},
        transport::{HttpRequest, HttpResponse, HttpTransport, TransportError},
    },
    domain::{
        channel::ChannelId,
        message::{Message, MessageId},
        session::SessionContext,
        topic::Topic,
    },
    usecases::{
        chat_session::ChannelUpdate,
        contracts::{
            BlobStore, Clock, CredentialError, MessageStore, NotificationDispatcher, NotifyError,
            SnapshotCallback, StoreError, SubscriptionError, SubscriptionHandle, UploadError,
        },
    },
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

pub const SERVICE_ACCOUNT_JSON: &str = include_str!("backend/push/testdata/service_account.json");

pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().expect("env lock should not be poisoned")
}

pub fn channel(raw: &str) -> ChannelId {
    ChannelId::parse(raw).expect("test channel id must be valid")
}

pub fn service_account_key() -> ServiceAccountKey {
    ServiceAccountKey::from_json(SERVICE_ACCOUNT_JSON).expect("fixture key must parse")
}

pub fn session() -> SessionContext {
    SessionContext::new("u1", "Alice", None).expect("test session must be valid")
}

pub async fn next_update(rx: &mut mpsc::UnboundedReceiver<ChannelUpdate>) -> ChannelUpdate {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("update should arrive in time")
        .expect("update channel should stay open")
}

pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    panic!("condition was not met in time");
}

/// Clock that ticks one millisecond per reading.
#[derive(Debug)]
pub struct StepClock {
    now: AtomicI64,
}

impl StepClock {
    pub fn starting_at(ms: i64) -> Self {
        Self {
            now: AtomicI64::new(ms),
        }
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for StepClock {
    fn now_ms(&self) -> i64 {
        self.now.fetch_add(1, Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct StubStore {
    append_error: Option<StoreError>,
    subscribe_error: Option<SubscriptionError>,
    appended: Mutex<Vec<(ChannelId, Message)>>,
    next_id: AtomicUsize,
}

impl StubStore {
    pub fn failing_append(error: StoreError) -> Self {
        Self {
            append_error: Some(error),
            ..Self::default()
        }
    }

    pub fn failing_subscribe(error: SubscriptionError) -> Self {
        Self {
            subscribe_error: Some(error),
            ..Self::default()
        }
    }

    pub fn appended(&self) -> Vec<(ChannelId, Message)> {
        self.appended.lock().expect("appended lock").clone()
    }
}

#[async_trait]
impl MessageStore for StubStore {
    async fn append(
        &self,
        channel_id: &ChannelId,
        mut message: Message,
    ) -> Result<MessageId, StoreError> {
        if let Some(error) = &self.append_error {
            return Err(error.clone());
        }
        if !message.has_content() {
            return Err(StoreError::EmptyMessage);
        }

        if message.id.is_unassigned() {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            message.id = MessageId::new(format!("m{n}"));
        }
        let id = message.id.clone();
        self.appended
            .lock()
            .expect("appended lock")
            .push((channel_id.clone(), message));
        Ok(id)
    }

    fn subscribe(
        &self,
        _channel_id: &ChannelId,
        _on_update: SnapshotCallback,
    ) -> Result<SubscriptionHandle, SubscriptionError> {
        match &self.subscribe_error {
            Some(error) => Err(error.clone()),
            None => Ok(SubscriptionHandle::new(|| {})),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyCall {
    pub channel_id: ChannelId,
    pub sender_name: String,
    pub body: String,
    pub topic: String,
}

#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    notify_error: Option<NotifyError>,
    interest_error: Option<NotifyError>,
    stall: Option<Duration>,
    notifications: Mutex<Vec<NotifyCall>>,
    interests: Mutex<Vec<String>>,
    finished: AtomicUsize,
}

impl RecordingDispatcher {
    pub fn failing_notify(error: NotifyError) -> Self {
        Self {
            notify_error: Some(error),
            ..Self::default()
        }
    }

    pub fn failing_interest(error: NotifyError) -> Self {
        Self {
            interest_error: Some(error),
            ..Self::default()
        }
    }

    pub fn stalling(delay: Duration) -> Self {
        Self {
            stall: Some(delay),
            ..Self::default()
        }
    }

    pub fn notifications(&self) -> Vec<NotifyCall> {
        self.notifications.lock().expect("notifications lock").clone()
    }

    pub fn interests(&self) -> Vec<String> {
        self.interests.lock().expect("interests lock").clone()
    }

    /// Calls that ran past their stall and returned.
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    async fn settle(&self, error: Option<&NotifyError>) -> Result<(), NotifyError> {
        if let Some(delay) = self.stall {
            tokio::time::sleep(delay).await;
        }
        self.finished.fetch_add(1, Ordering::SeqCst);

        error.cloned().map_or(Ok(()), Err)
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn register_interest(
        &self,
        _session: &SessionContext,
        channel_id: &ChannelId,
    ) -> Result<(), NotifyError> {
        self.interests
            .lock()
            .expect("interests lock")
            .push(Topic::for_channel(channel_id).as_str().to_owned());

        self.settle(self.interest_error.as_ref()).await
    }

    async fn notify_channel(
        &self,
        channel_id: &ChannelId,
        sender_name: &str,
        message_body: &str,
    ) -> Result<(), NotifyError> {
        self.notifications
            .lock()
            .expect("notifications lock")
            .push(NotifyCall {
                channel_id: channel_id.clone(),
                sender_name: sender_name.to_owned(),
                body: message_body.to_owned(),
                topic: Topic::for_channel(channel_id).as_str().to_owned(),
            });

        self.settle(self.notify_error.as_ref()).await
    }
}

#[derive(Debug, Default)]
pub struct StubBlobStore {
    put_error: Option<UploadError>,
    puts: Mutex<Vec<String>>,
}

impl StubBlobStore {
    pub fn failing(error: UploadError) -> Self {
        Self {
            put_error: Some(error),
            ..Self::default()
        }
    }

    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().expect("puts lock").clone()
    }
}

#[async_trait]
impl BlobStore for StubBlobStore {
    async fn put_file(&self, key: &str, _source: &Path) -> Result<(), UploadError> {
        if let Some(error) = &self.put_error {
            return Err(error.clone());
        }

        self.puts.lock().expect("puts lock").push(key.to_owned());
        Ok(())
    }

    async fn download_url(&self, key: &str) -> Result<String, UploadError> {
        Ok(format!("file:///blobs/{key}"))
    }
}

/// Transport that replays canned responses in order.
#[derive(Debug, Default)]
pub struct StubTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    stall: Option<Duration>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    pub fn with_responses(responses: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn stalling(delay: Duration) -> Self {
        Self {
            stall: Some(delay),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().expect("requests lock").push(request);

        if let Some(delay) = self.stall {
            tokio::time::sleep(delay).await;
        }

        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no stubbed response".to_owned())))
    }
}

#[derive(Debug)]
pub struct StubTokenSource {
    result: Result<AccessToken, CredentialError>,
}

impl StubTokenSource {
    pub fn ok(token: &str) -> Self {
        Self {
            result: Ok(AccessToken::new(token)),
        }
    }

    pub fn failing(error: CredentialError) -> Self {
        Self { result: Err(error) }
    }
}

#[async_trait]
impl TokenSource for StubTokenSource {
    async fn access_token(&self) -> Result<AccessToken, CredentialError> {
        self.result.clone()
    }
}

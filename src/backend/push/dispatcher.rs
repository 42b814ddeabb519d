use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    backend::push::{
        credentials::TokenSource,
        payload::{NotificationRequest, TopicSubscriptionRequest},
        transport::{HttpRequest, HttpTransport, TransportError},
    },
    domain::{channel::ChannelId, session::SessionContext, topic::Topic},
    infra::secrets::redact_text,
    usecases::contracts::{DeliveryError, NotificationDispatcher, NotifyError},
};

const PUSH_NOTIFICATION_SENT: &str = "PUSH_NOTIFICATION_SENT";
const PUSH_TOPIC_SUBSCRIBED: &str = "PUSH_TOPIC_SUBSCRIBED";
const PUSH_CREDENTIAL_FAILED: &str = "PUSH_CREDENTIAL_FAILED";
const PUSH_DISABLED: &str = "PUSH_DISABLED";

const MAX_DETAIL_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEndpoints {
    pub send_url: String,
    pub subscribe_url: String,
}

/// Topic-addressed push over HTTP with bearer credentials.
pub struct PushNotificationDispatcher {
    transport: Arc<dyn HttpTransport>,
    tokens: Arc<dyn TokenSource>,
    endpoints: PushEndpoints,
}

impl PushNotificationDispatcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenSource>,
        endpoints: PushEndpoints,
    ) -> Self {
        Self {
            transport,
            tokens,
            endpoints,
        }
    }

    async fn post_authorized(
        &self,
        topic: &Topic,
        request: HttpRequest,
    ) -> Result<(), NotifyError> {
        let token = self.tokens.access_token().await.map_err(|error| {
            tracing::warn!(
                code = PUSH_CREDENTIAL_FAILED,
                topic = %topic,
                error = %error,
                "push credential exchange failed; request not sent"
            );
            error
        })?;

        let response = self
            .transport
            .post(request.bearer(token.as_str()))
            .await
            .map_err(|error| DeliveryError::Transport {
                details: match error {
                    TransportError::Timeout => "request timed out".to_owned(),
                    TransportError::Request(details) => redact_text(&details),
                },
            })?;

        if !response.is_success() {
            return Err(DeliveryError::Rejected {
                status: response.status,
                detail: response_excerpt(&response.body),
            }
            .into());
        }

        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for PushNotificationDispatcher {
    async fn register_interest(
        &self,
        session: &SessionContext,
        channel_id: &ChannelId,
    ) -> Result<(), NotifyError> {
        let device_token = session
            .device_token()
            .ok_or(NotifyError::MissingDeviceToken)?;
        let topic = Topic::for_channel(channel_id);

        let body = serde_json::to_value(TopicSubscriptionRequest::for_channel(
            channel_id,
            device_token.as_str(),
        ))
        .map_err(|error| DeliveryError::Transport {
            details: error.to_string(),
        })?;

        let request = HttpRequest::json(&self.endpoints.subscribe_url, body)
            .header("access_token_auth", "true");
        self.post_authorized(&topic, request).await?;

        tracing::info!(
            code = PUSH_TOPIC_SUBSCRIBED,
            topic = %topic,
            "device subscribed to channel topic"
        );
        Ok(())
    }

    async fn notify_channel(
        &self,
        channel_id: &ChannelId,
        sender_name: &str,
        message_body: &str,
    ) -> Result<(), NotifyError> {
        let topic = Topic::for_channel(channel_id);

        let body = serde_json::to_value(NotificationRequest::for_channel(
            channel_id,
            sender_name,
            message_body,
        ))
        .map_err(|error| DeliveryError::Transport {
            details: error.to_string(),
        })?;

        self.post_authorized(&topic, HttpRequest::json(&self.endpoints.send_url, body))
            .await?;

        tracing::info!(
            code = PUSH_NOTIFICATION_SENT,
            topic = %topic,
            "channel notification sent"
        );
        Ok(())
    }
}

/// Dispatcher used when push is turned off; accepts every call.
#[derive(Debug, Clone, Default)]
pub struct DisabledDispatcher;

#[async_trait]
impl NotificationDispatcher for DisabledDispatcher {
    async fn register_interest(
        &self,
        _session: &SessionContext,
        channel_id: &ChannelId,
    ) -> Result<(), NotifyError> {
        tracing::debug!(
            code = PUSH_DISABLED,
            topic = %Topic::for_channel(channel_id),
            "push disabled; skipping topic registration"
        );
        Ok(())
    }

    async fn notify_channel(
        &self,
        channel_id: &ChannelId,
        _sender_name: &str,
        _message_body: &str,
    ) -> Result<(), NotifyError> {
        tracing::debug!(
            code = PUSH_DISABLED,
            topic = %Topic::for_channel(channel_id),
            "push disabled; skipping channel notification"
        );
        Ok(())
    }
}

fn response_excerpt(body: &str) -> String {
    redact_text(body).chars().take(MAX_DETAIL_CHARS).collect()
}

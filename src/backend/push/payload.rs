use serde::Serialize;

use crate::domain::{channel::ChannelId, topic::Topic};

/// Topic-addressed notification accepted by the push backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRequest {
    pub message: TopicMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicMessage {
    pub topic: String,
    pub notification: Notification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl NotificationRequest {
    pub fn for_channel(channel_id: &ChannelId, sender_name: &str, message_body: &str) -> Self {
        Self {
            message: TopicMessage {
                topic: Topic::for_channel(channel_id).as_str().to_owned(),
                notification: Notification {
                    title: format!("New message in {channel_id}"),
                    body: format!("{sender_name}: {message_body}"),
                },
            },
        }
    }
}

/// Adds device registrations to a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSubscriptionRequest {
    pub to: String,
    pub registration_tokens: Vec<String>,
}

impl TopicSubscriptionRequest {
    pub fn for_channel(channel_id: &ChannelId, device_token: &str) -> Self {
        Self {
            to: Topic::for_channel(channel_id).address(),
            registration_tokens: vec![device_token.to_owned()],
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn c1() -> ChannelId {
        ChannelId::parse("c1").expect("valid id")
    }

    #[test]
    fn notification_matches_push_wire_shape() {
        let request = NotificationRequest::for_channel(&c1(), "Alice", "hi");

        assert_eq!(
            serde_json::to_value(request).expect("serializable"),
            json!({
                "message": {
                    "topic": "group_c1",
                    "notification": {
                        "title": "New message in c1",
                        "body": "Alice: hi"
                    }
                }
            })
        );
    }

    #[test]
    fn image_only_notification_keeps_sender_prefix() {
        let request = NotificationRequest::for_channel(&c1(), "Alice", "");

        assert_eq!(request.message.notification.body, "Alice: ");
    }

    #[test]
    fn subscription_addresses_the_same_topic_as_notifications() {
        let subscription = TopicSubscriptionRequest::for_channel(&c1(), "device-1");
        let notification = NotificationRequest::for_channel(&c1(), "Alice", "hi");

        assert_eq!(
            subscription.to,
            format!("/topics/{}", notification.message.topic)
        );
        assert_eq!(subscription.registration_tokens, vec!["device-1".to_owned()]);
    }
}

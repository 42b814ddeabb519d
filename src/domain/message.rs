use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Sentinel for a message the store has not keyed yet.
    pub fn unassigned() -> Self {
        Self(String::new())
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to the message being replied to. Never set by the compose flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRef {
    pub message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: String,
    pub text: Option<String>,
    pub created_at: i64,
    pub sender_name: String,
    pub reply_to: Option<ReplyRef>,
    pub image_url: Option<String>,
}

impl Message {
    /// Text used for the notification body; empty for image-only messages.
    pub fn notification_text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    pub fn has_content(&self) -> bool {
        has_content(self.text.as_deref(), self.image_url.as_deref())
    }

    /// Snapshot ordering: creation time, then id for equal timestamps.
    pub fn snapshot_order(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// True when at least one of text or image is non-blank.
pub fn has_content(text: Option<&str>, image: Option<&str>) -> bool {
    let present = |value: Option<&str>| value.is_some_and(|v| !v.trim().is_empty());
    present(text) || present(image)
}

/// Trims text and folds a blank value into `None`.
pub fn normalize_text(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

use std::fmt;

use serde::{Deserialize, Serialize};

const MAX_CHANNEL_NAME_CHARS: usize = 64;

/// Characters the managed store refuses inside a key.
const FORBIDDEN_KEY_CHARS: [char; 6] = ['.', '$', '#', '[', ']', '/'];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Sentinel used before the registry has assigned an id.
    pub fn unassigned() -> Self {
        Self(String::new())
    }

    pub fn parse(raw: &str) -> Result<Self, ChannelIdError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ChannelIdError::Empty);
        }

        if let Some(ch) = raw
            .chars()
            .find(|ch| FORBIDDEN_KEY_CHARS.contains(ch) || ch.is_whitespace())
        {
            return Err(ChannelIdError::ForbiddenChar(ch));
        }

        Ok(Self(raw.to_owned()))
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelIdError {
    #[error("channel id must not be empty")]
    Empty,
    #[error("channel id must not contain {0:?}")]
    ForbiddenChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelNameError {
    #[error("channel name must not be empty")]
    Empty,
    #[error("channel name must be at most {MAX_CHANNEL_NAME_CHARS} characters")]
    TooLong,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub created_at: i64,
}

impl Channel {
    /// Builds a channel that has not been persisted yet.
    pub fn draft(name: &str, created_at: i64) -> Result<Self, ChannelNameError> {
        Ok(Self {
            id: ChannelId::unassigned(),
            name: normalize_name(name)?,
            created_at,
        })
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_id(mut self, id: ChannelId) -> Self {
        self.id = id;
        self
    }
}

fn normalize_name(name: &str) -> Result<String, ChannelNameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ChannelNameError::Empty);
    }

    if name.chars().count() > MAX_CHANNEL_NAME_CHARS {
        return Err(ChannelNameError::TooLong);
    }

    Ok(name.to_owned())
}

/// Orders channels by creation time, oldest first.
pub fn sort_channels(channels: &mut [Channel]) {
    channels.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Case-insensitive name prefix filter. An empty query keeps every channel.
pub fn filter_by_prefix<'a>(channels: &'a [Channel], query: &str) -> Vec<&'a Channel> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return channels.iter().collect();
    }

    channels
        .iter()
        .filter(|channel| channel.name.to_lowercase().starts_with(&query))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: &str, name: &str, created_at: i64) -> Channel {
        Channel {
            id: ChannelId::parse(id).expect("valid id"),
            name: name.to_owned(),
            created_at,
        }
    }

    #[test]
    fn parse_rejects_empty_id() {
        assert_eq!(ChannelId::parse("  "), Err(ChannelIdError::Empty));
    }

    #[test]
    fn parse_rejects_store_key_characters() {
        assert_eq!(
            ChannelId::parse("a/b"),
            Err(ChannelIdError::ForbiddenChar('/'))
        );
        assert_eq!(
            ChannelId::parse("a.b"),
            Err(ChannelIdError::ForbiddenChar('.'))
        );
        assert_eq!(
            ChannelId::parse("a b"),
            Err(ChannelIdError::ForbiddenChar(' '))
        );
    }

    #[test]
    fn parse_trims_surrounding_whitespace() {
        let id = ChannelId::parse(" c1 ").expect("valid id");

        assert_eq!(id.as_str(), "c1");
    }

    #[test]
    fn draft_starts_unassigned_with_trimmed_name() {
        let draft = Channel::draft("  General  ", 10).expect("valid name");

        assert!(draft.id.is_unassigned());
        assert_eq!(draft.name, "General");
        assert_eq!(draft.created_at, 10);
    }

    #[test]
    fn draft_rejects_blank_name() {
        assert_eq!(Channel::draft(" \t", 1), Err(ChannelNameError::Empty));
    }

    #[test]
    fn draft_rejects_overlong_name() {
        let name = "x".repeat(MAX_CHANNEL_NAME_CHARS + 1);

        assert_eq!(Channel::draft(&name, 1), Err(ChannelNameError::TooLong));
    }

    #[test]
    fn sort_orders_by_creation_then_id() {
        let mut channels = vec![
            channel("b", "B", 2),
            channel("c", "C", 1),
            channel("a", "A", 2),
        ];

        sort_channels(&mut channels);

        let ids: Vec<&str> = channels.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn prefix_filter_ignores_case() {
        let channels = vec![
            channel("1", "Rustaceans", 1),
            channel("2", "random", 2),
            channel("3", "General", 3),
        ];

        let found = filter_by_prefix(&channels, "R");

        let names: Vec<&str> = found.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Rustaceans", "random"]);
    }

    #[test]
    fn empty_query_keeps_all_channels() {
        let channels = vec![channel("1", "A", 1), channel("2", "B", 2)];

        assert_eq!(filter_by_prefix(&channels, "").len(), 2);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_value(channel("c1", "General", 5)).expect("serializable");

        assert_eq!(
            json,
            serde_json::json!({"id": "c1", "name": "General", "createdAt": 5})
        );
    }
}

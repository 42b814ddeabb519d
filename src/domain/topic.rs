//! Push topic addressing.
//!
//! Both the device-side interest registration and the server-side publish go
//! through [`Topic::for_channel`]; no other code builds topic strings.

use std::fmt;

use super::channel::ChannelId;

const TOPIC_PREFIX: &str = "group_";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    pub fn for_channel(channel_id: &ChannelId) -> Self {
        Self(format!("{TOPIC_PREFIX}{}", channel_id.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address form used by topic-subscription requests.
    pub fn address(&self) -> String {
        format!("/topics/{}", self.0)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_group_prefixed_topic() {
        let channel_id = ChannelId::parse("c1").expect("valid id");

        assert_eq!(Topic::for_channel(&channel_id).as_str(), "group_c1");
    }

    #[test]
    fn keeps_channel_id_case() {
        let channel_id = ChannelId::parse("AbC").expect("valid id");

        assert_eq!(Topic::for_channel(&channel_id).as_str(), "group_AbC");
    }

    #[test]
    fn address_uses_topics_path() {
        let channel_id = ChannelId::parse("c1").expect("valid id");

        assert_eq!(Topic::for_channel(&channel_id).address(), "/topics/group_c1");
    }
}

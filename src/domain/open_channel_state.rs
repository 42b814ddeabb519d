use std::collections::HashSet;

use super::{
    channel::ChannelId,
    message::{Message, MessageId},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenChannelUiState {
    Empty,
    Loading,
    Ready,
    Closed,
}

/// Presentation state of the channel being viewed.
///
/// Each snapshot replaces the message list wholesale; `apply_snapshot` reports
/// only messages that were not shown before, so re-delivering the same
/// snapshot renders nothing new.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenChannelState {
    channel_id: Option<ChannelId>,
    messages: Vec<Message>,
    shown: HashSet<MessageId>,
    ui_state: OpenChannelUiState,
}

impl Default for OpenChannelState {
    fn default() -> Self {
        Self {
            channel_id: None,
            messages: Vec::new(),
            shown: HashSet::new(),
            ui_state: OpenChannelUiState::Empty,
        }
    }
}

impl OpenChannelState {
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn channel_id(&self) -> Option<&ChannelId> {
        self.channel_id.as_ref()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn ui_state(&self) -> OpenChannelUiState {
        self.ui_state.clone()
    }

    pub fn set_loading(&mut self, channel_id: ChannelId) {
        self.channel_id = Some(channel_id);
        self.messages.clear();
        self.shown.clear();
        self.ui_state = OpenChannelUiState::Loading;
    }

    /// Replaces the message list and returns the messages not shown yet,
    /// in snapshot order.
    pub fn apply_snapshot(&mut self, messages: Vec<Message>) -> Vec<Message> {
        let fresh: Vec<Message> = messages
            .iter()
            .filter(|message| !self.shown.contains(&message.id))
            .cloned()
            .collect();

        self.shown
            .extend(fresh.iter().map(|message| message.id.clone()));
        self.messages = messages;
        self.ui_state = OpenChannelUiState::Ready;

        fresh
    }

    pub fn set_closed(&mut self) {
        self.ui_state = OpenChannelUiState::Closed;
    }

    pub fn is_showing(&self, channel_id: &ChannelId) -> bool {
        self.channel_id.as_ref() == Some(channel_id)
    }
}

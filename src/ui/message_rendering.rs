//! Plain-text message rendering for the console.
//!
//! Each message becomes one line (`HH:MM Sender: text`), an image attachment
//! adds an indented `[Image]` line, and a date separator is printed whenever
//! the local calendar day changes.

use chrono::{Local, NaiveDate, TimeZone};

use crate::domain::{channel::Channel, message::Message};

const EMPTY_MESSAGE: &str = "[Empty message]";
const IMAGE_MARKER: &str = "[Image]";
const INDENT: &str = "      ";

/// Remembers the last rendered day so separators span across snapshots.
#[derive(Debug, Default)]
pub struct MessageRenderer {
    last_date: Option<NaiveDate>,
}

impl MessageRenderer {
    pub fn reset(&mut self) {
        self.last_date = None;
    }

    pub fn render(&mut self, message: &Message) -> Vec<String> {
        let mut lines = Vec::new();

        let date = timestamp_to_date(message.created_at);
        if self.last_date != Some(date) {
            lines.push(format!("——— {} ———", format_date(date)));
            self.last_date = Some(date);
        }

        let time = format_time(message.created_at);
        let text = message.text.as_deref().unwrap_or_default();
        let header = match (text.is_empty(), message.image_url.is_some()) {
            (true, false) => EMPTY_MESSAGE,
            _ => text,
        };

        let mut text_lines = header.lines();
        let first = text_lines.next().unwrap_or_default();
        lines.push(
            format!("{time:>5} {}: {first}", message.sender_name)
                .trim_end()
                .to_owned(),
        );
        lines.extend(text_lines.map(|line| format!("{INDENT}{line}")));

        if let Some(url) = &message.image_url {
            lines.push(format!("{INDENT}{IMAGE_MARKER} {url}"));
        }

        lines
    }
}

pub fn render_channel(channel: &Channel) -> String {
    format!("{}  {}", channel.id, channel.name)
}

fn timestamp_to_date(timestamp_ms: i64) -> NaiveDate {
    match Local.timestamp_millis_opt(timestamp_ms) {
        chrono::LocalResult::Single(dt) => dt.date_naive(),
        chrono::LocalResult::Ambiguous(dt, _) => dt.date_naive(),
        chrono::LocalResult::None => Local::now().date_naive(),
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%-d %b %Y").to_string()
}

fn format_time(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms) {
        chrono::LocalResult::Single(dt) => dt.format("%H:%M").to_string(),
        chrono::LocalResult::Ambiguous(dt, _) => dt.format("%H:%M").to_string(),
        chrono::LocalResult::None => "??:??".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{channel::ChannelId, message::MessageId};

    // Noon UTC keeps the local date stable for timezones within ±11h.
    const DAY_ONE_NOON: i64 = 1_771_070_400_000;
    const DAY_MS: i64 = 86_400_000;

    fn msg(text: Option<&str>, created_at: i64, image_url: Option<&str>) -> Message {
        Message {
            id: MessageId::new("m1"),
            sender_id: "u1".to_owned(),
            text: text.map(str::to_owned),
            created_at,
            sender_name: "Alice".to_owned(),
            reply_to: None,
            image_url: image_url.map(str::to_owned),
        }
    }

    #[test]
    fn first_message_gets_date_separator_and_sender_line() {
        let mut renderer = MessageRenderer::default();

        let lines = renderer.render(&msg(Some("hi"), DAY_ONE_NOON, None));

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("———"));
        assert!(lines[1].ends_with("Alice: hi"));
    }

    #[test]
    fn separator_is_printed_once_per_day() {
        let mut renderer = MessageRenderer::default();
        renderer.render(&msg(Some("one"), DAY_ONE_NOON, None));

        let same_day = renderer.render(&msg(Some("two"), DAY_ONE_NOON + 1_000, None));
        let next_day = renderer.render(&msg(Some("three"), DAY_ONE_NOON + DAY_MS, None));

        assert_eq!(same_day.len(), 1);
        assert_eq!(next_day.len(), 2);
    }

    #[test]
    fn image_only_message_shows_image_line_without_placeholder() {
        let mut renderer = MessageRenderer::default();

        let lines = renderer.render(&msg(None, DAY_ONE_NOON, Some("file:///blobs/cat.png")));

        assert!(lines[1].ends_with("Alice:"));
        assert_eq!(lines[2], format!("{INDENT}[Image] file:///blobs/cat.png"));
    }

    #[test]
    fn empty_message_uses_placeholder() {
        let mut renderer = MessageRenderer::default();

        let lines = renderer.render(&msg(None, DAY_ONE_NOON, None));

        assert!(lines[1].ends_with(EMPTY_MESSAGE));
    }

    #[test]
    fn multiline_text_is_indented() {
        let mut renderer = MessageRenderer::default();

        let lines = renderer.render(&msg(Some("a\nb"), DAY_ONE_NOON, None));

        assert_eq!(lines[2], format!("{INDENT}b"));
    }

    #[test]
    fn channel_line_shows_id_and_name() {
        let channel = Channel {
            id: ChannelId::parse("c1").expect("valid id"),
            name: "General".to_owned(),
            created_at: 0,
        };

        assert_eq!(render_channel(&channel), "c1  General");
    }
}

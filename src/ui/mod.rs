//! UI layer: console interaction and plain-text rendering.

pub mod console;
mod message_rendering;

pub(crate) use message_rendering::{render_channel, MessageRenderer};

/// Returns the UI module name for smoke checks.
pub fn module_name() -> &'static str {
    "ui"
}

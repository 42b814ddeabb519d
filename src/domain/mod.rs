//! Domain layer: core entities and business rules.

pub mod channel;
pub mod compose_state;
pub mod message;
pub mod open_channel_state;
pub mod session;
pub mod topic;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}

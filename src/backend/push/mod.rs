//! Push notification stack: wire payloads, HTTP transport, credentials, and
//! the notification dispatcher built from them.

pub mod credentials;
pub mod dispatcher;
pub mod payload;
pub mod transport;

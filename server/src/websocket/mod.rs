//! WebSocket support for realtime snapshot push.
//!
//! Clients subscribe to named collections and receive the current
//! contents immediately, then a fresh full snapshot after every mutation,
//! until they unsubscribe or disconnect.

mod manager;
mod protocol;

pub use manager::ConnectionManager;
pub use protocol::*;

//! LEGO UART (LUMP) protocol engine.
//!
//! Encodes and decodes the framed messages exchanged between a hub and a
//! LEGO Powered Up device, and drives the host side of a connection through
//! handshake, keep-alive and query scheduling.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte-oriented line abstraction with an in-memory pair
//! - [`frame`]: header and checksum rules, message codec, frame stream
//! - [`session`]: capability handshake and the session loop
//! - [`config`]: JSON configuration for sessions and logging
//! - [`logging`]: `tracing` subscriber setup (behind the `logging` feature)

pub mod config;
#[cfg(feature = "logging")]
pub mod logging;

pub use config::{Config, ConfigError, LogFormat, LogLevel, LoggingConfig};

/// Re-export transport types.
pub mod transport {
    pub use lump_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use lump_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use lump_session::*;
}

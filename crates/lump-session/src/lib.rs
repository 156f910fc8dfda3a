//! Handshake, keep-alive and query scheduling for LUMP UART sessions.
//!
//! A [`Session`] owns one transport and walks it through the protocol:
//! - Handshake at the low baud rate: read the device's capability blob up to
//!   its SYS ACK, answer with ACK, then switch to the production baud rate
//! - Keep-alive: a SYS NACK at least once per configured interval
//! - Queries: at most one outstanding, spaced by a minimum interval, and held
//!   back while a two-part extended-mode frame is in flight
//!
//! The driving loop is explicit: call [`Session::submit`] to queue the next
//! query and [`Session::poll`] to run one iteration.

pub mod capabilities;
pub mod clock;
pub mod config;
pub mod error;
pub mod handshake;
pub mod query;
pub mod session;

pub use capabilities::{DeviceCapabilities, ModeInfo};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{HandshakeConfig, SessionConfig, MAX_KEEPALIVE_INTERVAL};
pub use error::{Result, SessionError};
pub use handshake::{find_capability_blob, CapabilityBlob};
pub use query::Query;
pub use session::{Delivery, Phase, Session, SessionState};

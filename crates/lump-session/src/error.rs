use lump_frame::FrameError;
use lump_transport::TransportError;

use crate::session::Phase;

/// Errors that can occur while driving a LUMP session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-layer error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-layer error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The session configuration is unusable.
    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),

    /// No matching capability blob was seen within the allowed attempts.
    #[error("device not found after {attempts} handshake attempt(s)")]
    DeviceNotFound { attempts: u32 },

    /// The device stopped mid-frame or the line was closed.
    #[error("device disconnected")]
    Disconnected,

    /// The operation is not valid in the current phase.
    #[error("session is {actual:?}, expected {expected:?}")]
    InvalidPhase { expected: Phase, actual: Phase },
}

pub type Result<T> = std::result::Result<T, SessionError>;

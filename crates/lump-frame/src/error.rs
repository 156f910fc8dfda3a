use crate::kind::Category;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    /// The header uses a size class above 32 bytes.
    #[error("invalid size class {class} in header 0x{header:02X}")]
    InvalidSizeClass { header: u8, class: u8 },

    /// A payload length of zero or above 32 bytes was requested.
    #[error("payload size out of range ({len} bytes, expected 1..=32)")]
    SizeOutOfRange { len: usize },

    /// A numeric field does not fit its wire representation.
    #[error("{field} out of range ({value}, max {max})")]
    FieldOutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },

    /// A later optional field was supplied without an earlier one.
    #[error("{0} must be set before later fields")]
    MissingField(&'static str),

    /// Text does not fit the NAME/UNITS payload.
    #[error("text too long ({len} chars, max {max})")]
    TextTooLong { len: usize, max: usize },

    /// Text contains a non-ASCII or NUL character.
    #[error("text must be ASCII without NUL bytes")]
    TextNotAscii,

    /// A mapping flag name is not recognised.
    #[error("unknown mapping flag '{0}'")]
    UnknownMappingFlag(String),

    /// A payload does not match the shape expected for its message type.
    #[error("malformed {message} payload: {detail}")]
    MalformedPayload {
        message: &'static str,
        detail: String,
    },

    /// The message subtype is not known to the codec.
    #[error("unsupported {category} message subtype 0x{subtype:02X}")]
    UnsupportedMessageType { category: Category, subtype: u8 },

    /// The byte source ended in the middle of a frame.
    #[error("truncated frame ({received} of {expected} bytes)")]
    Truncated { expected: usize, received: usize },
}

impl FrameError {
    pub(crate) fn malformed(message: &'static str, detail: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message,
            detail: detail.into(),
        }
    }

    pub(crate) fn bad_length(message: &'static str, expected: &str, found: usize) -> Self {
        Self::malformed(message, format!("expected {expected} bytes, got {found}"))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

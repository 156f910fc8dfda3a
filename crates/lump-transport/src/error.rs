/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An I/O error occurred on the underlying port.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport has been closed, locally or by the peer.
    #[error("transport closed")]
    Closed,

    /// The requested baud rate cannot be applied.
    #[error("unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),
}

pub type Result<T> = std::result::Result<T, TransportError>;

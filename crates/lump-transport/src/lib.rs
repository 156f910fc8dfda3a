//! Serial transport boundary for the LUMP UART protocol.
//!
//! The protocol engine never opens a port itself. It talks to anything that
//! implements [`Transport`]: bounded reads, writes, and a switchable baud rate.
//!
//! This is the lowest layer of the workspace. [`MemoryTransport`] is an
//! in-process implementation used to drive sessions without hardware.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::{MemoryHandle, MemoryTransport, WrittenChunk, MAX_WRITTEN_CHUNKS};
pub use traits::Transport;

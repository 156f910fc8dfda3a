//! Header, checksum and message codecs for LUMP UART frames.
//!
//! Every LUMP frame is built from:
//! - A 1-byte header packing the message category, a size class and a
//!   mode/command field
//! - An info-subtype byte (INFO frames only)
//! - A payload padded to the size class (1, 2, 4, 8, 16 or 32 bytes)
//! - An XOR checksum seeded with 0xFF
//!
//! SYS frames are the bare header byte. Decoding never panics on wire input.

pub mod codec;
pub mod error;
pub mod header;
pub mod kind;
pub mod message;
pub mod stream;

pub use codec::{decode_frame, encode_sequence, ChecksumFault, ReceivedFrame};
pub use error::{FrameError, Result};
pub use header::{
    checksum, decode_header, encode_header, overhead, Header, MAX_PAYLOAD, MAX_SIZE_CLASS,
};
pub use kind::{Category, Command, InfoKind, SysCommand, INFO_MODE_PLUS_8};
pub use message::{
    CmdMessage, DataType, InfoMessage, InfoText, Mapping, MappingFlags, Message,
    MessageDescriptor, ModeCombos, ModeCounts, ValueFormat, ValueRange, Version, VersionInfo,
};
pub use stream::FrameStream;

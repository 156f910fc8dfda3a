use crate::error::{FrameError, Result};
use crate::kind::Category;

/// Largest payload a frame can carry.
pub const MAX_PAYLOAD: usize = 32;

/// Largest valid size class (`1 << 5 == 32`).
pub const MAX_SIZE_CLASS: u8 = 5;

const CHECKSUM_SEED: u8 = 0xFF;

/// A decoded header byte.
///
/// Layout:
/// ```text
/// ┌──────────┬────────────┬─────────────┐
/// │ 7 6      │ 5 4 3      │ 2 1 0       │
/// │ category │ size class │ mode / cmd  │
/// └──────────┴────────────┴─────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub category: Category,
    pub size_class: u8,
    pub mode: u8,
}

impl Header {
    /// Decode a header byte. Size classes 6 and 7 are rejected except on SYS
    /// headers, which carry no size.
    pub fn decode(byte: u8) -> Result<Self> {
        let category = Category::from_header(byte);
        let size_class = (byte >> 3) & 0x07;
        if category != Category::Sys && size_class > MAX_SIZE_CLASS {
            return Err(FrameError::InvalidSizeClass {
                header: byte,
                class: size_class,
            });
        }
        Ok(Self {
            category,
            size_class,
            mode: byte & 0x07,
        })
    }

    pub fn to_byte(self) -> u8 {
        self.category.header_bits() | (self.size_class << 3) | (self.mode & 0x07)
    }

    /// Payload bytes following the header (and subtype byte), before the checksum.
    pub fn payload_len(self) -> usize {
        match self.category {
            Category::Sys => 0,
            _ => 1 << self.size_class,
        }
    }

    /// Total bytes on the wire for a frame with this header.
    pub fn frame_len(self) -> usize {
        match self.category {
            Category::Sys => 1,
            category => self.payload_len() + overhead(category),
        }
    }
}

/// Non-payload bytes in a frame: header and checksum, plus the subtype byte
/// for INFO. SYS frames have no overhead beyond the header itself.
pub const fn overhead(category: Category) -> usize {
    match category {
        Category::Sys => 1,
        Category::Cmd | Category::Data => 2,
        Category::Info => 3,
    }
}

/// XOR fold of `bytes` seeded with 0xFF.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(CHECKSUM_SEED, |acc, b| acc ^ b)
}

/// Decode a header byte into `(category, mode_or_cmd, total_frame_size)`.
pub fn decode_header(byte: u8) -> Result<(Category, u8, usize)> {
    let header = Header::decode(byte)?;
    Ok((header.category, header.mode, header.frame_len()))
}

/// Build the header byte for a payload of `requested_len` bytes.
///
/// The smallest size class holding the payload is chosen and checked by
/// decoding it back; the caller pads the payload to the decoded size minus
/// [`overhead`]. SYS headers are the bare command byte.
pub fn encode_header(category: Category, mode_or_cmd: u8, requested_len: usize) -> Result<u8> {
    if mode_or_cmd > 0x07 {
        return Err(FrameError::FieldOutOfRange {
            field: "mode",
            value: u32::from(mode_or_cmd),
            max: 7,
        });
    }
    if category == Category::Sys {
        return Ok(mode_or_cmd);
    }
    if requested_len == 0 || requested_len > MAX_PAYLOAD {
        return Err(FrameError::SizeOutOfRange { len: requested_len });
    }

    let needed = requested_len + overhead(category);
    let mut len = requested_len;
    loop {
        let class = size_class_for(len)?;
        let byte = category.header_bits() | (class << 3) | mode_or_cmd;
        let (_, _, total) = decode_header(byte)?;
        if total >= needed {
            return Ok(byte);
        }
        len += 1;
    }
}

fn size_class_for(len: usize) -> Result<u8> {
    (0..=MAX_SIZE_CLASS)
        .find(|class| (1usize << class) >= len)
        .ok_or(FrameError::SizeOutOfRange { len })
}

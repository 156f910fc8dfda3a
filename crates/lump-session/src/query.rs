use bytes::{Bytes, BytesMut};
use lump_frame::{CmdMessage, FrameError, Message};

/// Highest mode a query can address.
pub const MAX_QUERY_MODE: u8 = 15;

/// A hub-to-device request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Select a mode; the device answers with DATA frames for it.
    Read { mode: u8 },
    /// Write data to a mode: a CMD EXT_MODE frame (offset 0 or 8) followed
    /// by a DATA frame for `mode % 8`.
    Write { mode: u8, data: Bytes },
}

impl Query {
    pub fn read(mode: u8) -> Self {
        Self::Read { mode }
    }

    pub fn write(mode: u8, data: impl Into<Bytes>) -> Self {
        Self::Write {
            mode,
            data: data.into(),
        }
    }

    /// Write an integer using the fewest little-endian bytes, at least one.
    pub fn write_value(mode: u8, value: u32) -> Self {
        let bytes = value.to_le_bytes();
        let len = bytes.iter().rposition(|b| *b != 0).map_or(1, |i| i + 1);
        Self::write(mode, Bytes::copy_from_slice(&bytes[..len]))
    }

    pub fn mode(&self) -> u8 {
        match self {
            Self::Read { mode } | Self::Write { mode, .. } => *mode,
        }
    }

    /// True for queries sent as two frames.
    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Write { .. })
    }

    /// The frames making up this query, in send order.
    pub fn messages(&self) -> lump_frame::Result<Vec<Message>> {
        let mode = self.mode();
        if mode > MAX_QUERY_MODE {
            return Err(FrameError::FieldOutOfRange {
                field: "mode",
                value: u32::from(mode),
                max: u32::from(MAX_QUERY_MODE),
            });
        }

        Ok(match self {
            Self::Read { mode } => vec![Message::Cmd(CmdMessage::Select(*mode))],
            Self::Write { mode, data } => {
                let offset = if *mode >= 8 { 8 } else { 0 };
                vec![
                    Message::Cmd(CmdMessage::ExtMode(offset)),
                    Message::data(mode % 8, data.clone()),
                ]
            }
        })
    }

    /// Encode every frame of this query, each with its own checksum.
    pub fn encode(&self, dst: &mut BytesMut) -> lump_frame::Result<()> {
        let encoded = lump_frame::encode_sequence(&self.messages()?)?;
        dst.extend_from_slice(&encoded);
        Ok(())
    }

    pub fn to_bytes(&self) -> lump_frame::Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

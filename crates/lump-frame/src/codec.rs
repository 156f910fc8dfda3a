use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::error::Result;
use crate::header::{checksum, Header};
use crate::kind::Category;
use crate::message::Message;

/// Checksum byte found on the wire versus the one computed locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumFault {
    pub found: u8,
    pub expected: u8,
}

/// A frame taken off the wire.
///
/// A checksum mismatch does not drop the frame; it is reported in
/// [`checksum_fault`](Self::checksum_fault) alongside the decoded message.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedFrame {
    pub header: Header,
    /// Raw INFO subtype byte, mode-plus-8 bit included.
    pub subtype: Option<u8>,
    /// Payload as read, including padding.
    pub payload: Bytes,
    /// Every byte of the frame, checksum included.
    pub raw: Bytes,
    pub message: Message,
    pub checksum_fault: Option<ChecksumFault>,
}

impl ReceivedFrame {
    pub fn is_valid(&self) -> bool {
        self.checksum_fault.is_none()
    }

    /// Total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        self.raw.len()
    }
}

/// Decode one frame from the front of `src`.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet;
/// nothing is consumed in that case. A complete frame is always consumed,
/// even when its payload fails to decode, so the caller stays aligned on the
/// next frame boundary. An invalid header consumes nothing.
pub fn decode_frame(src: &mut BytesMut) -> Result<Option<ReceivedFrame>> {
    let Some(&first) = src.first() else {
        return Ok(None);
    };
    let header = Header::decode(first)?;
    let total = header.frame_len();
    if src.len() < total {
        return Ok(None);
    }

    let raw = src.split_to(total).freeze();
    if header.category == Category::Sys {
        let message = Message::decode(header, None, &[])?;
        return Ok(Some(ReceivedFrame {
            header,
            subtype: None,
            payload: Bytes::new(),
            raw,
            message,
            checksum_fault: None,
        }));
    }

    let (subtype, payload_start) = match header.category {
        Category::Info => (Some(raw[1]), 2),
        _ => (None, 1),
    };
    let payload = raw.slice(payload_start..total - 1);

    let found = raw[total - 1];
    let expected = checksum(&raw[..total - 1]);
    let checksum_fault = (found != expected).then_some(ChecksumFault { found, expected });
    if let Some(fault) = checksum_fault {
        debug!(
            header = format_args!("0x{first:02X}"),
            found = format_args!("0x{:02X}", fault.found),
            expected = format_args!("0x{:02X}", fault.expected),
            "frame checksum mismatch"
        );
    }

    let message = Message::decode(header, subtype, &payload)?;
    Ok(Some(ReceivedFrame {
        header,
        subtype,
        payload,
        raw,
        message,
        checksum_fault,
    }))
}

/// Encode `messages` back to back into one byte run.
pub fn encode_sequence<'a, I>(messages: I) -> Result<Bytes>
where
    I: IntoIterator<Item = &'a Message>,
{
    let mut buf = BytesMut::new();
    for message in messages {
        message.encode(&mut buf)?;
    }
    Ok(buf.freeze())
}

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use lump_frame::{
    checksum, decode_frame, encode_header, Category, Command, Message, ReceivedFrame, SysCommand,
};
use lump_transport::{Transport, TransportError};
use tracing::{debug, info, warn};

use crate::capabilities::DeviceCapabilities;
use crate::clock::Clock;
use crate::config::HandshakeConfig;
use crate::error::{Result, SessionError};

const HANDSHAKE_READ_CHUNK: usize = 64;
const MAX_POLL_WAIT: Duration = Duration::from_millis(50);

/// A capability blob: every frame from a CMD TYPE up to and including the
/// SYS ACK that closes the advertisement.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityBlob {
    pub bytes: Bytes,
    pub frames: Vec<ReceivedFrame>,
    /// Offset of the blob's first byte in the scanned buffer.
    pub start: usize,
}

impl CapabilityBlob {
    pub fn end(&self) -> usize {
        self.start + self.bytes.len()
    }

    pub fn has_checksum_faults(&self) -> bool {
        self.frames.iter().any(|frame| !frame.is_valid())
    }

    pub fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities::from_messages(self.frames.iter().map(|frame| &frame.message))
    }

    /// True when this blob appears verbatim inside `reference`.
    pub fn is_contained_in(&self, reference: &[u8]) -> bool {
        !self.bytes.is_empty()
            && reference
                .windows(self.bytes.len())
                .any(|window| window == self.bytes.as_ref())
    }
}

/// Find the first complete capability blob in `buf`.
///
/// Candidates start at a CMD TYPE header whose 3-byte frame checksums
/// correctly; they are walked frame by frame until a SYS ACK. A candidate
/// that hits an undecodable frame is abandoned and scanning resumes at the
/// next byte. Returns `None` when no complete blob is present yet.
pub fn find_capability_blob(buf: &[u8]) -> Option<CapabilityBlob> {
    let type_header = encode_header(Category::Cmd, Command::Type as u8, 1).ok()?;

    for start in 0..buf.len().saturating_sub(2) {
        let candidate = &buf[start..start + 3];
        if candidate[0] != type_header || checksum(&candidate[..2]) != candidate[2] {
            continue;
        }
        if let Some(blob) = walk_blob(buf, start) {
            return Some(blob);
        }
    }
    None
}

fn walk_blob(buf: &[u8], start: usize) -> Option<CapabilityBlob> {
    let mut rest = BytesMut::from(&buf[start..]);
    let mut frames = Vec::new();
    let mut len = 0;

    loop {
        let frame = decode_frame(&mut rest).ok()??;
        len += frame.wire_size();
        let is_ack = frame.message == Message::Sys(SysCommand::Ack);
        frames.push(frame);
        if is_ack {
            return Some(CapabilityBlob {
                bytes: Bytes::copy_from_slice(&buf[start..start + len]),
                frames,
                start,
            });
        }
    }
}

/// Read capability blobs until one matches the configured reference.
///
/// Each attempt reads until a complete blob arrives or the attempt timeout
/// elapses on `clock`. A blob with checksum faults, or one not contained in
/// the reference, fails the attempt.
pub fn await_capabilities<T, C>(
    transport: &mut T,
    clock: &C,
    config: &HandshakeConfig,
) -> Result<CapabilityBlob>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    let mut buf = BytesMut::new();

    for attempt in 1..=config.attempts {
        let deadline = clock.now() + config.attempt_timeout;

        let blob = loop {
            if let Some(blob) = find_capability_blob(&buf) {
                let _ = buf.split_to(blob.end());
                break Some(blob);
            }

            let now = clock.now();
            if now >= deadline {
                break None;
            }

            let wait = (deadline - now).min(MAX_POLL_WAIT);
            let chunk = match transport.read(HANDSHAKE_READ_CHUNK, wait) {
                Ok(chunk) => chunk,
                Err(TransportError::Closed) => return Err(SessionError::Disconnected),
                Err(err) => return Err(err.into()),
            };
            if !chunk.is_empty() {
                debug!(rx = %hex::encode_upper(&chunk), "handshake bytes");
                buf.extend_from_slice(&chunk);
            }
        };

        let Some(blob) = blob else {
            warn!(attempt, "no capability blob before attempt timeout");
            buf.clear();
            continue;
        };

        if blob.has_checksum_faults() {
            warn!(attempt, "capability blob has checksum faults");
            continue;
        }
        if let Some(reference) = &config.expected_capabilities {
            if !blob.is_contained_in(reference) {
                warn!(
                    attempt,
                    blob = %hex::encode_upper(&blob.bytes),
                    "capability blob does not match the expected device"
                );
                continue;
            }
        }

        info!(attempt, len = blob.bytes.len(), "capability blob accepted");
        return Ok(blob);
    }

    Err(SessionError::DeviceNotFound {
        attempts: config.attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use lump_frame::CmdMessage;
    use lump_transport::MemoryTransport;

    const BLOB: [u8; 12] = [
        0x40, 0x22, 0x9D, // TYPE 34
        0x49, 0x03, 0x02, 0xB7, // MODES 4/3
        0x52, 0x00, 0xC2, 0x01, 0x00, // SPEED (checksum follows)
    ];

    fn blob() -> Vec<u8> {
        let mut out = BLOB.to_vec();
        out.push(0x6E);
        out.push(0x04);
        out
    }

    #[test]
    fn test_find_blob_after_noise() {
        let mut buf = vec![0x00, 0xFF, 0x40, 0x13];
        buf.extend(blob());
        buf.push(0x02);

        let found = find_capability_blob(&buf).unwrap();
        assert_eq!(found.start, 4);
        assert_eq!(found.bytes.as_ref(), blob().as_slice());
        assert_eq!(found.frames.len(), 4);
        assert_eq!(found.end(), buf.len() - 1);
        assert!(!found.has_checksum_faults());

        let caps = found.capabilities();
        assert_eq!(caps.type_id, Some(34));
        assert_eq!(caps.speed, Some(115_200));
    }

    #[test]
    fn test_incomplete_blob_not_found() {
        let full = blob();
        assert!(find_capability_blob(&full[..full.len() - 1]).is_none());
        assert!(find_capability_blob(&[]).is_none());
    }

    #[test]
    fn test_containment() {
        let found = find_capability_blob(&blob()).unwrap();
        let mut reference = vec![0xAA];
        reference.extend(blob());
        assert!(found.is_contained_in(&reference));
        assert!(!found.is_contained_in(&blob()[1..]));
    }

    #[test]
    fn test_checksum_fault_in_blob_detected() {
        let mut bad = blob();
        bad[6] ^= 0x01;
        let found = find_capability_blob(&bad).unwrap();
        assert!(found.has_checksum_faults());
    }

    #[test]
    fn test_await_capabilities_matches_reference() {
        let (mut transport, device) = MemoryTransport::new(2400);
        device.push(&blob());
        let clock = ManualClock::new();
        let config = HandshakeConfig {
            expected_capabilities: Some(blob()),
            ..HandshakeConfig::default()
        };

        let found = await_capabilities(&mut transport, &clock, &config).unwrap();
        assert_eq!(found.frames[0].message, Message::Cmd(CmdMessage::Type(34)));
    }

    #[test]
    fn test_await_capabilities_mismatch_exhausts_attempts() {
        let (mut transport, device) = MemoryTransport::new(2400);
        let mut other = vec![0x40, 0x3D, 0x82, 0x04];
        other.extend(vec![0x40, 0x3D, 0x82, 0x04]);
        other.extend(vec![0x40, 0x3D, 0x82, 0x04]);
        device.push(&other);

        let clock = ManualClock::new();
        let config = HandshakeConfig {
            expected_capabilities: Some(blob()),
            ..HandshakeConfig::default()
        };

        let err = await_capabilities(&mut transport, &clock, &config).unwrap_err();
        assert!(matches!(err, SessionError::DeviceNotFound { attempts: 3 }));
    }

    #[test]
    fn test_await_capabilities_second_blob_accepted() {
        let (mut transport, device) = MemoryTransport::new(2400);
        let mut stream = vec![0x40, 0x3D, 0x82, 0x04];
        stream.extend(blob());
        device.push(&stream);

        let clock = ManualClock::new();
        let config = HandshakeConfig {
            expected_capabilities: Some(blob()),
            ..HandshakeConfig::default()
        };

        let found = await_capabilities(&mut transport, &clock, &config).unwrap();
        assert_eq!(found.capabilities().type_id, Some(34));
    }

    #[test]
    fn test_closed_line_is_disconnect() {
        let (mut transport, device) = MemoryTransport::new(2400);
        device.close();
        let clock = ManualClock::new();
        let err = await_capabilities(&mut transport, &clock, &HandshakeConfig::default())
            .unwrap_err();
        assert!(matches!(err, SessionError::Disconnected));
    }
}

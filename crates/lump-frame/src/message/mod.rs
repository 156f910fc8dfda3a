//! Typed message payloads and their frame encoding.

mod cmd;
mod info;

pub use cmd::{CmdMessage, ModeCounts, Version, VersionInfo};
pub use info::{
    DataType, InfoMessage, InfoText, Mapping, MappingFlags, ModeCombos, ValueFormat, ValueRange,
    MAX_FLAGGED_TEXT_LEN, MAX_TEXT_LEN, NAME_FLAGS_LEN,
};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::header::{checksum, encode_header, overhead, Header};
use crate::kind::{Category, Command, InfoKind, SysCommand, INFO_MODE_PLUS_8};

/// Highest logical mode an INFO message can describe.
pub const MAX_INFO_MODE: u8 = 15;

/// Selects the codec for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageDescriptor {
    Sys(SysCommand),
    Cmd(Command),
    Info { kind: InfoKind, mode: u8 },
    Data { mode: u8 },
    Unsupported { category: Category, subtype: u8 },
}

/// A decoded (or to-be-encoded) LUMP message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Sys(SysCommand),
    Cmd(CmdMessage),
    /// Capability descriptor for a logical mode (0..=15).
    Info { mode: u8, body: InfoMessage },
    /// Mode data. `mode` is the 3-bit header field.
    Data { mode: u8, payload: Bytes },
    /// A frame whose subtype is not known. The payload is kept as read.
    Unsupported {
        category: Category,
        mode: u8,
        subtype: u8,
        payload: Bytes,
    },
}

struct WireParts {
    category: Category,
    mode: u8,
    subtype: Option<u8>,
    payload: Vec<u8>,
    min_len: usize,
}

impl Message {
    pub fn info(mode: u8, body: InfoMessage) -> Self {
        Self::Info { mode, body }
    }

    pub fn data(mode: u8, payload: impl Into<Bytes>) -> Self {
        Self::Data {
            mode,
            payload: payload.into(),
        }
    }

    pub fn descriptor(&self) -> MessageDescriptor {
        match self {
            Self::Sys(command) => MessageDescriptor::Sys(*command),
            Self::Cmd(cmd) => MessageDescriptor::Cmd(cmd.command()),
            Self::Info { mode, body } => MessageDescriptor::Info {
                kind: body.kind(),
                mode: *mode,
            },
            Self::Data { mode, .. } => MessageDescriptor::Data { mode: *mode },
            Self::Unsupported {
                category, subtype, ..
            } => MessageDescriptor::Unsupported {
                category: *category,
                subtype: *subtype,
            },
        }
    }

    fn wire_parts(&self) -> Result<WireParts> {
        let parts = match self {
            Self::Sys(command) => WireParts {
                category: Category::Sys,
                mode: command.byte() & 0x07,
                subtype: None,
                payload: Vec::new(),
                min_len: 0,
            },
            Self::Cmd(cmd) => WireParts {
                category: Category::Cmd,
                mode: cmd.command() as u8,
                subtype: None,
                payload: cmd.encode_payload()?,
                min_len: 1,
            },
            Self::Info { mode, body } => {
                if *mode > MAX_INFO_MODE {
                    return Err(FrameError::FieldOutOfRange {
                        field: "mode",
                        value: u32::from(*mode),
                        max: u32::from(MAX_INFO_MODE),
                    });
                }
                let (wire_mode, plus_8) = if *mode >= 8 {
                    (mode - 8, INFO_MODE_PLUS_8)
                } else {
                    (*mode, 0)
                };
                WireParts {
                    category: Category::Info,
                    mode: wire_mode,
                    subtype: Some(body.kind().id() | plus_8),
                    payload: body.encode_payload()?,
                    min_len: body.min_payload_len(),
                }
            }
            Self::Data { mode, payload } => WireParts {
                category: Category::Data,
                mode: *mode,
                subtype: None,
                payload: payload.to_vec(),
                min_len: 1,
            },
            Self::Unsupported {
                category,
                mode,
                subtype,
                payload,
            } => WireParts {
                category: *category,
                mode: *mode,
                subtype: (*category == Category::Info).then_some(*subtype),
                payload: payload.to_vec(),
                min_len: 1,
            },
        };
        Ok(parts)
    }

    /// Append the complete wire frame to `dst`.
    ///
    /// The payload is zero-padded to its size class and the checksum is
    /// computed over everything before it. Nothing is written on error.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let parts = self.wire_parts()?;

        if parts.category == Category::Sys {
            let byte = match self {
                Self::Unsupported { subtype, .. } => *subtype,
                _ => encode_header(Category::Sys, parts.mode, 1)?,
            };
            dst.put_u8(byte);
            return Ok(());
        }

        let requested = parts.payload.len().max(parts.min_len);
        let header = encode_header(parts.category, parts.mode, requested)?;
        let padded = Header::decode(header)?.payload_len();

        let start = dst.len();
        dst.reserve(padded + overhead(parts.category));
        dst.put_u8(header);
        if let Some(subtype) = parts.subtype {
            dst.put_u8(subtype);
        }
        dst.put_slice(&parts.payload);
        dst.put_bytes(0, padded - parts.payload.len());
        let sum = checksum(&dst[start..]);
        dst.put_u8(sum);
        Ok(())
    }

    /// Encode into a standalone buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode a message from its header, raw subtype byte (INFO only) and payload.
    ///
    /// Unknown INFO subtypes and SYS bytes decode to [`Message::Unsupported`].
    pub fn decode(header: Header, subtype: Option<u8>, payload: &[u8]) -> Result<Self> {
        match header.category {
            Category::Sys => {
                let byte = header.to_byte();
                Ok(match SysCommand::from_byte(byte) {
                    Some(command) => Self::Sys(command),
                    None => Self::Unsupported {
                        category: Category::Sys,
                        mode: header.mode,
                        subtype: byte,
                        payload: Bytes::new(),
                    },
                })
            }
            Category::Cmd => {
                CmdMessage::decode(Command::from_field(header.mode), payload).map(Self::Cmd)
            }
            Category::Info => {
                let raw = subtype.ok_or_else(|| {
                    FrameError::malformed("INFO", "missing info subtype byte")
                })?;
                let mode = if raw & INFO_MODE_PLUS_8 != 0 {
                    header.mode + 8
                } else {
                    header.mode
                };
                match InfoMessage::decode_id(raw & !INFO_MODE_PLUS_8, payload) {
                    Ok(body) => Ok(Self::Info { mode, body }),
                    Err(FrameError::UnsupportedMessageType { .. }) => Ok(Self::Unsupported {
                        category: Category::Info,
                        mode: header.mode,
                        subtype: raw,
                        payload: Bytes::copy_from_slice(payload),
                    }),
                    Err(err) => Err(err),
                }
            }
            Category::Data => Ok(Self::Data {
                mode: header.mode,
                payload: Bytes::copy_from_slice(payload),
            }),
        }
    }
}

impl From<CmdMessage> for Message {
    fn from(cmd: CmdMessage) -> Self {
        Self::Cmd(cmd)
    }
}

impl From<SysCommand> for Message {
    fn from(command: SysCommand) -> Self {
        Self::Sys(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encoded(message: Message) -> Vec<u8> {
        message.to_bytes().unwrap().to_vec()
    }

    #[test]
    fn test_info_name_with_flags_mode_plus_8() {
        let msg = Message::info(
            9,
            InfoMessage::Name(InfoText::with_flags(
                "CALIB",
                [0x40, 0x40, 0x00, 0x00, 0x04, 0x84],
            )),
        );
        assert_eq!(
            encoded(msg),
            vec![
                0xA1, 0x20, 0x43, 0x41, 0x4C, 0x49, 0x42, 0x00, 0x40, 0x40, 0x00, 0x00, 0x04,
                0x84, 0x00, 0x00, 0x00, 0x00, 0xBB
            ]
        );
    }

    #[test]
    fn test_info_vectors() {
        assert_eq!(
            encoded(Message::info(9, InfoMessage::Units(InfoText::new("")))),
            vec![0x81, 0x24, 0x00, 0x5A]
        );
        assert_eq!(
            encoded(Message::info(3, InfoMessage::Name(InfoText::new("LPF2-CAL")))),
            vec![0x9B, 0x00, 0x4C, 0x50, 0x46, 0x32, 0x2D, 0x43, 0x41, 0x4C, 0x6F]
        );
        assert_eq!(
            encoded(Message::info(3, InfoMessage::Raw(ValueRange::new(-45.0, 45.0)))),
            vec![0x9B, 0x01, 0x00, 0x00, 0x34, 0xC2, 0x00, 0x00, 0x34, 0x42, 0xE5]
        );
        assert_eq!(
            encoded(Message::info(3, InfoMessage::Pct(ValueRange::new(-100.0, 100.0)))),
            vec![0x9B, 0x02, 0x00, 0x00, 0xC8, 0xC2, 0x00, 0x00, 0xC8, 0x42, 0xE6]
        );
        assert_eq!(
            encoded(Message::info(3, InfoMessage::Si(ValueRange::new(-45.0, 45.0)))),
            vec![0x9B, 0x03, 0x00, 0x00, 0x34, 0xC2, 0x00, 0x00, 0x34, 0x42, 0xE7]
        );
        assert_eq!(
            encoded(Message::info(3, InfoMessage::Units(InfoText::new("CAL")))),
            vec![0x93, 0x04, 0x43, 0x41, 0x4C, 0x00, 0x26]
        );
        assert_eq!(
            encoded(Message::info(
                3,
                InfoMessage::Mapping(Mapping {
                    input: MappingFlags::ABSOLUTE,
                    output: MappingFlags::empty(),
                })
            )),
            vec![0x8B, 0x05, 0x10, 0x00, 0x61]
        );
        assert_eq!(
            encoded(Message::info(
                3,
                InfoMessage::Format(ValueFormat::new(3, DataType::Int8, 3, 0))
            )),
            vec![0x93, 0x80, 0x03, 0x00, 0x03, 0x00, 0xEC]
        );
    }

    #[test]
    fn test_cmd_vectors() {
        assert_eq!(encoded(CmdMessage::Type(34).into()), vec![0x40, 0x22, 0x9D]);
        assert_eq!(
            encoded(CmdMessage::Modes(ModeCounts::new(4).with_views(3)).into()),
            vec![0x49, 0x03, 0x02, 0xB7]
        );
        assert_eq!(
            encoded(CmdMessage::Speed(115_200).into()),
            vec![0x52, 0x00, 0xC2, 0x01, 0x00, 0x6E]
        );
        assert_eq!(
            encoded(
                CmdMessage::Version(VersionInfo {
                    firmware: Version::new(1, 0, 0, 0),
                    hardware: Version::new(1, 0, 0, 0),
                })
                .into()
            ),
            vec![0x5F, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x10, 0xA0]
        );
    }

    #[test]
    fn test_extended_mode_counts_use_four_bytes() {
        let counts = ModeCounts::new(2).with_views(2).with_extended(2, 2);
        let bytes = encoded(CmdMessage::Modes(counts).into());
        assert_eq!(bytes.len(), 6);
        assert_eq!(&bytes[1..5], &[0x01, 0x01, 0x01, 0x01]);

        let lone_modes2 = ModeCounts {
            views2: None,
            ..counts
        };
        assert_eq!(
            Message::from(CmdMessage::Modes(lone_modes2)).to_bytes(),
            Err(FrameError::MissingField("views2"))
        );
    }

    #[test]
    fn test_sys_encodes_bare_byte() {
        assert_eq!(encoded(SysCommand::Ack.into()), vec![0x04]);
        assert_eq!(encoded(SysCommand::Nack.into()), vec![0x02]);
        assert_eq!(encoded(SysCommand::Sync.into()), vec![0x00]);
    }

    #[test]
    fn test_data_padded_to_size_class() {
        let bytes = encoded(Message::data(5, vec![1, 2, 3]));
        assert_eq!(bytes.len(), 6);
        assert_eq!(bytes[0], 0xD5);
        assert_eq!(&bytes[1..5], &[1, 2, 3, 0]);
        assert_eq!(bytes[5], checksum(&bytes[..5]));
    }

    #[test]
    fn test_info_mode_above_15_rejected() {
        let err = Message::info(16, InfoMessage::Units(InfoText::new("X")))
            .to_bytes()
            .unwrap_err();
        assert!(matches!(err, FrameError::FieldOutOfRange { field: "mode", .. }));
    }

    #[test]
    fn test_encode_error_writes_nothing() {
        let mut buf = BytesMut::from(&[0xAA][..]);
        let err = Message::data(0, vec![0u8; 33]).encode(&mut buf).unwrap_err();
        assert_eq!(err, FrameError::SizeOutOfRange { len: 33 });
        assert_eq!(buf.as_ref(), &[0xAA]);
    }

    #[test]
    fn test_decode_mode_plus_8() {
        let header = Header::decode(0x89).unwrap();
        let msg = Message::decode(header, Some(0x25), &[0x00, 0x00]).unwrap();
        assert_eq!(msg, Message::info(9, InfoMessage::Units(InfoText::new(""))));
        assert_eq!(
            msg.descriptor(),
            MessageDescriptor::Info {
                kind: InfoKind::Units,
                mode: 9
            }
        );
    }

    #[test]
    fn test_decode_unknown_info_subtype_is_unsupported() {
        let header = Header::decode(0x80).unwrap();
        let msg = Message::decode(header, Some(0x07), &[0x55]).unwrap();
        assert_eq!(
            msg,
            Message::Unsupported {
                category: Category::Info,
                mode: 0,
                subtype: 0x07,
                payload: Bytes::from_static(&[0x55]),
            }
        );
        // Re-encodes byte for byte.
        assert_eq!(encoded(msg), vec![0x80, 0x07, 0x55, 0x2D]);
    }

    fn roundtrip(message: &Message) -> Message {
        let mut buf = BytesMut::from(message.to_bytes().unwrap().as_ref());
        let frame = crate::codec::decode_frame(&mut buf).unwrap().unwrap();
        assert!(buf.is_empty());
        assert!(frame.is_valid());
        frame.message
    }

    proptest! {
        #[test]
        fn prop_range_roundtrip(mode in 0u8..=15, min in -1.0e6f32..1.0e6, max in -1.0e6f32..1.0e6) {
            let message = Message::info(mode, InfoMessage::Si(ValueRange::new(min, max)));
            prop_assert_eq!(roundtrip(&message), message);
        }

        #[test]
        fn prop_speed_and_version_roundtrip(
            baud in any::<u32>(),
            major in 0u8..16,
            minor in 0u8..16,
            bugfix in any::<u8>(),
            build in any::<u16>(),
        ) {
            let speed = Message::Cmd(CmdMessage::Speed(baud));
            prop_assert_eq!(roundtrip(&speed), speed);

            let version = Version::new(major, minor, bugfix, build);
            let message = Message::Cmd(CmdMessage::Version(VersionInfo {
                firmware: version,
                hardware: version,
            }));
            prop_assert_eq!(roundtrip(&message), message);
        }

        #[test]
        fn prop_data_payload_padded_with_zeros(
            mode in 0u8..8,
            payload in proptest::collection::vec(any::<u8>(), 1..=32),
        ) {
            let decoded = roundtrip(&Message::data(mode, payload.clone()));
            let Message::Data { mode: got_mode, payload: got } = decoded else {
                panic!("expected DATA");
            };
            prop_assert_eq!(got_mode, mode);
            prop_assert!(got.len().is_power_of_two());
            prop_assert!(got.len() >= payload.len() && got.len() < payload.len() * 2);
            prop_assert_eq!(&got[..payload.len()], payload.as_slice());
            prop_assert!(got[payload.len()..].iter().all(|b| *b == 0));
        }
    }
}

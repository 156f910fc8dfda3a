use bytes::Bytes;

use crate::error::{FrameError, Result};
use crate::kind::Command;

/// Payload of a CMD frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmdMessage {
    /// Device type id.
    Type(u8),
    Modes(ModeCounts),
    /// Production baud rate requested by the device.
    Speed(u32),
    /// Mode selected by the hub.
    Select(u8),
    /// Raw bytes written to the device.
    Write(Bytes),
    Unk1(Bytes),
    /// Offset (0 or 8) applied to the mode of the next DATA frame.
    ExtMode(u8),
    Version(VersionInfo),
}

/// Mode and view counts advertised by CMD MODES.
///
/// Each count is stored on the wire as `count - 1`. Valid forms are
/// `modes`, `modes + views`, or all four fields: the extended pair travels
/// together, since a lone `modes2` would be padded to a phantom `views2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeCounts {
    pub modes: u16,
    pub views: Option<u16>,
    pub modes2: Option<u16>,
    pub views2: Option<u16>,
}

impl ModeCounts {
    pub fn new(modes: u16) -> Self {
        Self {
            modes,
            views: None,
            modes2: None,
            views2: None,
        }
    }

    pub fn with_views(mut self, views: u16) -> Self {
        self.views = Some(views);
        self
    }

    pub fn with_extended(mut self, modes2: u16, views2: u16) -> Self {
        self.modes2 = Some(modes2);
        self.views2 = Some(views2);
        self
    }

    /// Total number of modes, using the extended count when present.
    pub fn total_modes(&self) -> u16 {
        self.modes2.unwrap_or(self.modes)
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let fields = [
            ("modes", Some(self.modes)),
            ("views", self.views),
            ("modes2", self.modes2),
            ("views2", self.views2),
        ];
        let present = fields.iter().take_while(|(_, v)| v.is_some()).count();
        if fields[present..].iter().any(|(_, v)| v.is_some()) {
            return Err(FrameError::MissingField(fields[present].0));
        }
        if present == 3 {
            return Err(FrameError::MissingField("views2"));
        }

        fields[..present]
            .iter()
            .map(|&(field, value)| {
                let count = value.unwrap_or_default();
                if count == 0 || count > 256 {
                    return Err(FrameError::FieldOutOfRange {
                        field,
                        value: u32::from(count),
                        max: 256,
                    });
                }
                Ok((count - 1) as u8)
            })
            .collect()
    }

    fn decode(payload: &[u8]) -> Result<Self> {
        if payload.is_empty() || payload.len() > 4 {
            return Err(FrameError::bad_length("CMD_MODES", "1..=4", payload.len()));
        }
        let count = |i: usize| payload.get(i).map(|b| u16::from(*b) + 1);
        Ok(Self {
            modes: u16::from(payload[0]) + 1,
            views: count(1),
            modes2: count(2),
            views2: count(3),
        })
    }
}

/// A firmware or hardware version record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub bugfix: u8,
    pub build: u16,
}

impl Version {
    pub fn new(major: u8, minor: u8, bugfix: u8, build: u16) -> Self {
        Self {
            major,
            minor,
            bugfix,
            build,
        }
    }

    /// Packed as build (LE u16), bugfix, then major/minor nibbles.
    fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        for (field, value) in [("major", self.major), ("minor", self.minor)] {
            if value > 0x0F {
                return Err(FrameError::FieldOutOfRange {
                    field,
                    value: u32::from(value),
                    max: 15,
                });
            }
        }
        out.extend_from_slice(&self.build.to_le_bytes());
        out.push(self.bugfix);
        out.push((self.major << 4) | self.minor);
        Ok(())
    }

    fn decode(record: &[u8]) -> Self {
        Self {
            major: record[3] >> 4,
            minor: record[3] & 0x0F,
            bugfix: record[2],
            build: u16::from_le_bytes([record[0], record[1]]),
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{:04}",
            self.major, self.minor, self.bugfix, self.build
        )
    }
}

/// CMD VERSION payload: firmware then hardware record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionInfo {
    pub firmware: Version,
    pub hardware: Version,
}

impl CmdMessage {
    pub fn command(&self) -> Command {
        match self {
            Self::Type(_) => Command::Type,
            Self::Modes(_) => Command::Modes,
            Self::Speed(_) => Command::Speed,
            Self::Select(_) => Command::Select,
            Self::Write(_) => Command::Write,
            Self::Unk1(_) => Command::Unk1,
            Self::ExtMode(_) => Command::ExtMode,
            Self::Version(_) => Command::Version,
        }
    }

    pub(crate) fn encode_payload(&self) -> Result<Vec<u8>> {
        match self {
            Self::Type(id) => Ok(vec![*id]),
            Self::Modes(counts) => counts.encode(),
            Self::Speed(baud) => Ok(baud.to_le_bytes().to_vec()),
            Self::Select(mode) => Ok(vec![*mode]),
            Self::ExtMode(offset) => Ok(vec![check_ext_offset(*offset)?]),
            Self::Write(raw) | Self::Unk1(raw) => Ok(raw.to_vec()),
            Self::Version(info) => {
                let mut out = Vec::with_capacity(8);
                info.firmware.encode(&mut out)?;
                info.hardware.encode(&mut out)?;
                Ok(out)
            }
        }
    }

    /// Decode the payload of a CMD frame carrying `command`.
    pub fn decode(command: Command, payload: &[u8]) -> Result<Self> {
        let name = command.name();
        let single = |payload: &[u8]| match payload {
            [byte] => Ok(*byte),
            _ => Err(FrameError::bad_length(name, "1", payload.len())),
        };

        match command {
            Command::Type => single(payload).map(Self::Type),
            Command::Select => single(payload).map(Self::Select),
            Command::ExtMode => match single(payload)? {
                offset @ (0 | 8) => Ok(Self::ExtMode(offset)),
                offset => Err(FrameError::malformed(
                    name,
                    format!("offset {offset} is not 0 or 8"),
                )),
            },
            Command::Modes => ModeCounts::decode(payload).map(Self::Modes),
            Command::Speed => {
                let raw: [u8; 4] = payload
                    .try_into()
                    .map_err(|_| FrameError::bad_length(name, "4", payload.len()))?;
                Ok(Self::Speed(u32::from_le_bytes(raw)))
            }
            Command::Version => {
                if payload.len() != 8 {
                    return Err(FrameError::bad_length(name, "8", payload.len()));
                }
                Ok(Self::Version(VersionInfo {
                    firmware: Version::decode(&payload[..4]),
                    hardware: Version::decode(&payload[4..]),
                }))
            }
            Command::Write => Ok(Self::Write(Bytes::copy_from_slice(payload))),
            Command::Unk1 => Ok(Self::Unk1(Bytes::copy_from_slice(payload))),
        }
    }
}

fn check_ext_offset(offset: u8) -> Result<u8> {
    match offset {
        0 | 8 => Ok(offset),
        _ => Err(FrameError::FieldOutOfRange {
            field: "ext_mode",
            value: u32::from(offset),
            max: 8,
        }),
    }
}

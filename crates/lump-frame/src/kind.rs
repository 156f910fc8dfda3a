//! Wire identifiers: message categories, command opcodes, info subtypes and
//! system bytes.

use std::fmt;

/// Bit set on the INFO subtype byte when the logical mode is 8..=15.
pub const INFO_MODE_PLUS_8: u8 = 0x20;

/// Message category, stored in the top two bits of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Category {
    /// Single-byte system messages (sync, keep-alive, ack).
    Sys = 0,
    /// Device commands.
    Cmd = 1,
    /// Per-mode capability descriptors.
    Info = 2,
    /// Mode data.
    Data = 3,
}

impl Category {
    /// Extract the category from a header byte.
    pub const fn from_header(byte: u8) -> Self {
        match byte >> 6 {
            0 => Self::Sys,
            1 => Self::Cmd,
            2 => Self::Info,
            _ => Self::Data,
        }
    }

    /// Category bits already shifted into header position.
    pub const fn header_bits(self) -> u8 {
        (self as u8) << 6
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Sys => "SYS",
            Self::Cmd => "CMD",
            Self::Info => "INFO",
            Self::Data => "DATA",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// CMD opcodes, carried in the header mode field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    Type = 0,
    Modes = 1,
    Speed = 2,
    Select = 3,
    Write = 4,
    Unk1 = 5,
    ExtMode = 6,
    Version = 7,
}

impl Command {
    /// Map the 3-bit mode field to an opcode. Every value is assigned.
    pub const fn from_field(field: u8) -> Self {
        match field & 0x07 {
            0 => Self::Type,
            1 => Self::Modes,
            2 => Self::Speed,
            3 => Self::Select,
            4 => Self::Write,
            5 => Self::Unk1,
            6 => Self::ExtMode,
            _ => Self::Version,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Type => "CMD_TYPE",
            Self::Modes => "CMD_MODES",
            Self::Speed => "CMD_SPEED",
            Self::Select => "CMD_SELECT",
            Self::Write => "CMD_WRITE",
            Self::Unk1 => "CMD_UNK1",
            Self::ExtMode => "CMD_EXT_MODE",
            Self::Version => "CMD_VERSION",
        }
    }
}

/// INFO subtype ids, carried in the byte following an INFO header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InfoKind {
    Name = 0x00,
    Raw = 0x01,
    Pct = 0x02,
    Si = 0x03,
    Units = 0x04,
    Mapping = 0x05,
    ModeCombos = 0x06,
    Format = 0x80,
}

impl InfoKind {
    /// Look up a subtype id with the mode-plus-8 bit already cleared.
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0x00 => Some(Self::Name),
            0x01 => Some(Self::Raw),
            0x02 => Some(Self::Pct),
            0x03 => Some(Self::Si),
            0x04 => Some(Self::Units),
            0x05 => Some(Self::Mapping),
            0x06 => Some(Self::ModeCombos),
            0x80 => Some(Self::Format),
            _ => None,
        }
    }

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Name => "INFO_NAME",
            Self::Raw => "INFO_RAW",
            Self::Pct => "INFO_PCT",
            Self::Si => "INFO_SI",
            Self::Units => "INFO_UNITS",
            Self::Mapping => "INFO_MAPPING",
            Self::ModeCombos => "INFO_MODE_COMBOS",
            Self::Format => "INFO_FORMAT",
        }
    }
}

/// System bytes. A SYS frame is the bare byte, no payload or checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SysCommand {
    Sync = 0x00,
    /// Keep-alive sent by the hub.
    Nack = 0x02,
    /// End of the device's capability advertisement.
    Ack = 0x04,
}

impl SysCommand {
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Sync),
            0x02 => Some(Self::Nack),
            0x04 => Some(Self::Ack),
            _ => None,
        }
    }

    pub const fn byte(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Sync => "SYS_SYNC",
            Self::Nack => "SYS_NACK",
            Self::Ack => "SYS_ACK",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_header() {
        assert_eq!(Category::from_header(0x04), Category::Sys);
        assert_eq!(Category::from_header(0x40), Category::Cmd);
        assert_eq!(Category::from_header(0x9B), Category::Info);
        assert_eq!(Category::from_header(0xC0), Category::Data);
        assert_eq!(Category::Data.header_bits(), 0xC0);
    }

    #[test]
    fn test_command_covers_every_field_value() {
        for field in 0..8u8 {
            assert_eq!(Command::from_field(field) as u8, field);
        }
    }

    #[test]
    fn test_info_kind_lookup() {
        assert_eq!(InfoKind::from_id(0x80), Some(InfoKind::Format));
        assert_eq!(InfoKind::from_id(0x06), Some(InfoKind::ModeCombos));
        assert_eq!(InfoKind::from_id(0x07), None);
        assert_eq!(InfoKind::from_id(0x80 | INFO_MODE_PLUS_8), None);
    }

    #[test]
    fn test_sys_bytes() {
        assert_eq!(SysCommand::from_byte(0x02), Some(SysCommand::Nack));
        assert_eq!(SysCommand::from_byte(0x04), Some(SysCommand::Ack));
        assert_eq!(SysCommand::from_byte(0x01), None);
        assert_eq!(SysCommand::Sync.name(), "SYS_SYNC");
    }
}

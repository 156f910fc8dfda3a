use std::collections::BTreeSet;

use tracing::warn;

use crate::error::{FrameError, Result};
use crate::kind::{Category, InfoKind};

/// Longest NAME/UNITS text without a flags suffix.
pub const MAX_TEXT_LEN: usize = 11;

/// Longest NAME/UNITS text followed by a flags suffix.
pub const MAX_FLAGGED_TEXT_LEN: usize = 5;

/// Length of the raw flags suffix after a short NAME.
pub const NAME_FLAGS_LEN: usize = 6;

/// Smallest payload a flagged NAME is padded to, so that decoding sees more
/// than 12 bytes and splits the suffix back off.
const FLAGGED_MIN_PAYLOAD: usize = 13;

/// Payload of an INFO frame, for one mode.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoMessage {
    Name(InfoText),
    Raw(ValueRange),
    Pct(ValueRange),
    Si(ValueRange),
    Units(InfoText),
    Mapping(Mapping),
    ModeCombos(ModeCombos),
    Format(ValueFormat),
}

/// NAME or UNITS text, optionally followed by six raw flag bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InfoText {
    pub text: String,
    pub flags: Option<[u8; NAME_FLAGS_LEN]>,
}

impl InfoText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            flags: None,
        }
    }

    pub fn with_flags(text: impl Into<String>, flags: [u8; NAME_FLAGS_LEN]) -> Self {
        Self {
            text: text.into(),
            flags: Some(flags),
        }
    }

    fn encode(&self) -> Result<Vec<u8>> {
        if !self.text.is_ascii() || self.text.contains('\0') {
            return Err(FrameError::TextNotAscii);
        }
        let max = if self.flags.is_some() {
            MAX_FLAGGED_TEXT_LEN
        } else {
            MAX_TEXT_LEN
        };
        if self.text.len() > max {
            return Err(FrameError::TextTooLong {
                len: self.text.len(),
                max,
            });
        }

        let mut out = self.text.as_bytes().to_vec();
        if let Some(flags) = self.flags {
            out.push(0);
            out.extend_from_slice(&flags);
        } else if out.is_empty() {
            out.push(0);
        }
        Ok(out)
    }

    fn decode(payload: &[u8]) -> Self {
        let split = if payload.len() > 12 {
            payload[..NAME_FLAGS_LEN].iter().position(|b| *b == 0)
        } else {
            None
        };

        match split {
            Some(zero) => {
                let mut flags = [0u8; NAME_FLAGS_LEN];
                flags.copy_from_slice(&payload[zero + 1..zero + 1 + NAME_FLAGS_LEN]);
                Self {
                    text: text_from(&payload[..zero]),
                    flags: Some(flags),
                }
            }
            None => Self::new(text_from(payload)),
        }
    }
}

fn text_from(raw: &[u8]) -> String {
    let end = raw.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// `(min, max)` pair carried by RAW, PCT and SI.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8);
        out.extend_from_slice(&self.min.to_le_bytes());
        out.extend_from_slice(&self.max.to_le_bytes());
        out
    }

    fn decode(name: &'static str, payload: &[u8]) -> Result<Self> {
        if payload.len() != 8 {
            return Err(FrameError::bad_length(name, "8", payload.len()));
        }
        Ok(Self {
            min: f32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
            max: f32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]),
        })
    }
}

/// One byte of INFO MAPPING flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MappingFlags(pub u8);

impl MappingFlags {
    pub const NA: Self = Self(1 << 0);
    pub const DISCRETE: Self = Self(1 << 2);
    pub const RELATIVE: Self = Self(1 << 3);
    pub const ABSOLUTE: Self = Self(1 << 4);
    pub const FUNC_MAPPING_2: Self = Self(1 << 6);
    pub const NULL: Self = Self(1 << 7);

    const NAMED: [(u8, &'static str); 6] = [
        (1 << 0, "N/A"),
        (1 << 2, "Discrete"),
        (1 << 3, "Relative"),
        (1 << 4, "Absolute"),
        (1 << 6, "FuncMapping2.0+"),
        (1 << 7, "NULL"),
    ];

    /// Alternate spellings accepted by [`from_names`](Self::from_names).
    const ALIASES: [(u8, &'static str); 1] = [(1 << 6, "Func mapping 2.0+")];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Build flags from symbolic names.
    ///
    /// "N/A" is ambiguous on the wire (several unused bits read as N/A); it is
    /// accepted, mapped to bit 0 and logged. Bit 6 is also accepted as
    /// "Func mapping 2.0+"; [`names`](Self::names) always emits "FuncMapping2.0+".
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut bits = 0u8;
        for name in names {
            let name = name.as_ref();
            if name == "N/A" {
                warn!("mapping flag \"N/A\" is ambiguous, encoding it as bit 0");
            }
            let (bit, _) = Self::NAMED
                .iter()
                .chain(Self::ALIASES.iter())
                .find(|(_, known)| *known == name)
                .ok_or_else(|| FrameError::UnknownMappingFlag(name.to_string()))?;
            bits |= bit;
        }
        Ok(Self(bits))
    }

    /// Names of the set bits, lowest bit first. Bits 1 and 5 read as "N/A".
    pub fn names(self) -> Vec<&'static str> {
        (0..8u8)
            .filter(|bit| self.0 & (1 << bit) != 0)
            .map(|bit| match bit {
                1 | 5 => "N/A",
                _ => Self::NAMED
                    .iter()
                    .find(|(mask, _)| *mask == 1 << bit)
                    .map_or("N/A", |(_, name)| *name),
            })
            .collect()
    }
}

impl std::ops::BitOr for MappingFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Input and output mapping of a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mapping {
    pub input: MappingFlags,
    pub output: MappingFlags,
}

/// Mode combinations a device can report together.
///
/// Each word is a bitmask over mode numbers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModeCombos(pub Vec<u16>);

impl ModeCombos {
    /// Build one word per set of modes.
    pub fn from_mode_sets<I, M>(sets: I) -> Result<Self>
    where
        I: IntoIterator<Item = M>,
        M: IntoIterator<Item = u8>,
    {
        let mut words = Vec::new();
        for set in sets {
            let mut word = 0u16;
            for mode in set {
                if mode > 15 {
                    return Err(FrameError::FieldOutOfRange {
                        field: "mode",
                        value: u32::from(mode),
                        max: 15,
                    });
                }
                word |= 1 << mode;
            }
            words.push(word);
        }
        Ok(Self(words))
    }

    pub fn words(&self) -> &[u16] {
        &self.0
    }

    /// Every mode asserted by any combination.
    pub fn modes(&self) -> BTreeSet<u8> {
        self.0
            .iter()
            .flat_map(|word| (0..16u8).filter(move |bit| word & (1 << bit) != 0))
            .collect()
    }

    fn encode(&self) -> Result<Vec<u8>> {
        if self.0.len() * 2 > crate::header::MAX_PAYLOAD {
            return Err(FrameError::SizeOutOfRange {
                len: self.0.len() * 2,
            });
        }
        if self.0.is_empty() {
            return Ok(vec![0, 0]);
        }
        Ok(self.0.iter().flat_map(|w| w.to_le_bytes()).collect())
    }

    fn decode(payload: &[u8]) -> Result<Self> {
        if payload.is_empty() || payload.len() % 2 != 0 {
            return Err(FrameError::bad_length(
                InfoKind::ModeCombos.name(),
                "an even number of",
                payload.len(),
            ));
        }
        let mut words: Vec<u16> = payload
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        while words.last() == Some(&0) {
            words.pop();
        }
        Ok(Self(words))
    }
}

/// Sample encoding used by a mode's DATA frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    Int8 = 0,
    Int16 = 1,
    Int32 = 2,
    Float32 = 3,
}

impl DataType {
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Int8),
            1 => Some(Self::Int16),
            2 => Some(Self::Int32),
            3 => Some(Self::Float32),
            _ => None,
        }
    }

    /// Size of one sample in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::Int8 => 1,
            Self::Int16 => 2,
            Self::Int32 | Self::Float32 => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Float32 => "float32",
        }
    }
}

/// INFO FORMAT payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueFormat {
    pub data_sets: u8,
    pub data_type: DataType,
    pub figures: u8,
    pub decimals: u8,
}

impl ValueFormat {
    pub fn new(data_sets: u8, data_type: DataType, figures: u8, decimals: u8) -> Self {
        Self {
            data_sets,
            data_type,
            figures,
            decimals,
        }
    }

    /// Bytes one DATA sample set occupies.
    pub fn sample_len(&self) -> usize {
        usize::from(self.data_sets) * self.data_type.size()
    }

    /// True when a sample set would not fit a 32-byte payload. Never rejected.
    pub fn exceeds_payload_limit(&self) -> bool {
        self.sample_len() > crate::header::MAX_PAYLOAD
    }

    fn check_limit(&self) {
        if self.exceeds_payload_limit() {
            warn!(
                data_sets = self.data_sets,
                data_type = self.data_type.name(),
                "format exceeds the 32-byte payload limit"
            );
        }
    }

    fn encode(&self) -> Vec<u8> {
        self.check_limit();
        vec![
            self.data_sets,
            self.data_type as u8,
            self.figures,
            self.decimals,
        ]
    }

    fn decode(payload: &[u8]) -> Result<Self> {
        let name = InfoKind::Format.name();
        let [data_sets, data_type, figures, decimals] = payload else {
            return Err(FrameError::bad_length(name, "4", payload.len()));
        };
        let data_type = DataType::from_byte(*data_type)
            .ok_or_else(|| FrameError::malformed(name, format!("unknown data type {data_type}")))?;
        let format = Self::new(*data_sets, data_type, *figures, *decimals);
        format.check_limit();
        Ok(format)
    }
}

impl InfoMessage {
    pub fn kind(&self) -> InfoKind {
        match self {
            Self::Name(_) => InfoKind::Name,
            Self::Raw(_) => InfoKind::Raw,
            Self::Pct(_) => InfoKind::Pct,
            Self::Si(_) => InfoKind::Si,
            Self::Units(_) => InfoKind::Units,
            Self::Mapping(_) => InfoKind::Mapping,
            Self::ModeCombos(_) => InfoKind::ModeCombos,
            Self::Format(_) => InfoKind::Format,
        }
    }

    pub(crate) fn encode_payload(&self) -> Result<Vec<u8>> {
        match self {
            Self::Name(text) | Self::Units(text) => text.encode(),
            Self::Raw(range) | Self::Pct(range) | Self::Si(range) => Ok(range.encode()),
            Self::Mapping(mapping) => Ok(vec![mapping.input.bits(), mapping.output.bits()]),
            Self::ModeCombos(combos) => combos.encode(),
            Self::Format(format) => Ok(format.encode()),
        }
    }

    /// Payload length the frame must be padded to at minimum.
    pub(crate) fn min_payload_len(&self) -> usize {
        match self {
            Self::Name(InfoText { flags: Some(_), .. }) => FLAGGED_MIN_PAYLOAD,
            _ => 1,
        }
    }

    /// Decode the payload of an INFO frame of subtype `kind`.
    pub fn decode(kind: InfoKind, payload: &[u8]) -> Result<Self> {
        let name = kind.name();
        match kind {
            InfoKind::Name => Ok(Self::Name(InfoText::decode(payload))),
            InfoKind::Units => Ok(Self::Units(InfoText::decode(payload))),
            InfoKind::Raw => ValueRange::decode(name, payload).map(Self::Raw),
            InfoKind::Pct => ValueRange::decode(name, payload).map(Self::Pct),
            InfoKind::Si => ValueRange::decode(name, payload).map(Self::Si),
            InfoKind::Mapping => match payload {
                [input, output] => Ok(Self::Mapping(Mapping {
                    input: MappingFlags(*input),
                    output: MappingFlags(*output),
                })),
                _ => Err(FrameError::bad_length(name, "2", payload.len())),
            },
            InfoKind::ModeCombos => ModeCombos::decode(payload).map(Self::ModeCombos),
            InfoKind::Format => ValueFormat::decode(payload).map(Self::Format),
        }
    }

    /// Decode by raw subtype id, with the mode-plus-8 bit already cleared.
    pub fn decode_id(id: u8, payload: &[u8]) -> Result<Self> {
        let kind = InfoKind::from_id(id).ok_or(FrameError::UnsupportedMessageType {
            category: Category::Info,
            subtype: id,
        })?;
        Self::decode(kind, payload)
    }
}

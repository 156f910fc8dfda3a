use std::collections::BTreeMap;

use bytes::Bytes;
use lump_frame::{
    encode_sequence, CmdMessage, InfoMessage, InfoText, Mapping, Message, ModeCombos, ModeCounts,
    SysCommand, ValueFormat, ValueRange, VersionInfo,
};

/// Everything a device advertised about one mode.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModeInfo {
    pub name: Option<InfoText>,
    pub raw: Option<ValueRange>,
    pub pct: Option<ValueRange>,
    pub si: Option<ValueRange>,
    pub units: Option<InfoText>,
    pub mapping: Option<Mapping>,
    pub format: Option<ValueFormat>,
}

/// Summary of a capability blob.
///
/// Built by folding decoded messages in order; a later message for the same
/// field replaces an earlier one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceCapabilities {
    pub type_id: Option<u8>,
    pub modes: Option<ModeCounts>,
    pub speed: Option<u32>,
    pub version: Option<VersionInfo>,
    pub combos: Option<ModeCombos>,
    pub mode_info: BTreeMap<u8, ModeInfo>,
}

impl DeviceCapabilities {
    pub fn from_messages<'a, I>(messages: I) -> Self
    where
        I: IntoIterator<Item = &'a Message>,
    {
        let mut caps = Self::default();
        for message in messages {
            caps.apply(message);
        }
        caps
    }

    /// Fold one message into the summary. Messages that carry no capability
    /// (SYS, DATA, hub commands) are ignored.
    pub fn apply(&mut self, message: &Message) {
        match message {
            Message::Cmd(CmdMessage::Type(id)) => self.type_id = Some(*id),
            Message::Cmd(CmdMessage::Modes(counts)) => self.modes = Some(*counts),
            Message::Cmd(CmdMessage::Speed(baud)) => self.speed = Some(*baud),
            Message::Cmd(CmdMessage::Version(info)) => self.version = Some(*info),
            Message::Info { mode, body } => {
                let info = self.mode_info.entry(*mode).or_default();
                match body {
                    InfoMessage::Name(text) => info.name = Some(text.clone()),
                    InfoMessage::Raw(range) => info.raw = Some(*range),
                    InfoMessage::Pct(range) => info.pct = Some(*range),
                    InfoMessage::Si(range) => info.si = Some(*range),
                    InfoMessage::Units(text) => info.units = Some(text.clone()),
                    InfoMessage::Mapping(mapping) => info.mapping = Some(*mapping),
                    InfoMessage::Format(format) => info.format = Some(*format),
                    InfoMessage::ModeCombos(combos) => self.combos = Some(combos.clone()),
                }
            }
            _ => {}
        }
    }

    pub fn mode(&self, mode: u8) -> Option<&ModeInfo> {
        self.mode_info.get(&mode)
    }

    /// Messages a device would send to advertise these capabilities.
    ///
    /// Order: TYPE, MODES, SPEED, VERSION, then each mode from highest to
    /// lowest (NAME, RAW, PCT, SI, UNITS, MAPPING, MODE_COMBOS on mode 0,
    /// FORMAT), then SYS ACK.
    pub fn to_messages(&self) -> Vec<Message> {
        let mut out = Vec::new();
        let cmds = [
            self.type_id.map(CmdMessage::Type),
            self.modes.map(CmdMessage::Modes),
            self.speed.map(CmdMessage::Speed),
            self.version.map(CmdMessage::Version),
        ];
        out.extend(cmds.into_iter().flatten().map(Message::Cmd));

        for (&mode, info) in self.mode_info.iter().rev() {
            let combos = (mode == 0)
                .then(|| self.combos.clone().map(InfoMessage::ModeCombos))
                .flatten();
            let bodies = [
                info.name.clone().map(InfoMessage::Name),
                info.raw.map(InfoMessage::Raw),
                info.pct.map(InfoMessage::Pct),
                info.si.map(InfoMessage::Si),
                info.units.clone().map(InfoMessage::Units),
                info.mapping.map(InfoMessage::Mapping),
                combos,
                info.format.map(InfoMessage::Format),
            ];
            out.extend(
                bodies
                    .into_iter()
                    .flatten()
                    .map(|body| Message::info(mode, body)),
            );
        }

        out.push(Message::Sys(SysCommand::Ack));
        out
    }

    /// Encode [`to_messages`](Self::to_messages) into one byte run.
    pub fn to_blob(&self) -> lump_frame::Result<Bytes> {
        encode_sequence(&self.to_messages())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lump_frame::{DataType, FrameStream, MappingFlags, Version};

    fn sample() -> DeviceCapabilities {
        let mut caps = DeviceCapabilities {
            type_id: Some(34),
            modes: Some(ModeCounts::new(2).with_views(2)),
            speed: Some(115_200),
            version: Some(VersionInfo {
                firmware: Version::new(1, 0, 0, 0),
                hardware: Version::new(1, 0, 0, 0),
            }),
            combos: None,
            mode_info: BTreeMap::new(),
        };
        caps.mode_info.insert(
            1,
            ModeInfo {
                name: Some(InfoText::new("TILT")),
                raw: Some(ValueRange::new(0.0, 10.0)),
                pct: Some(ValueRange::new(0.0, 100.0)),
                si: Some(ValueRange::new(0.0, 10.0)),
                units: Some(InfoText::new("DIR")),
                mapping: Some(Mapping {
                    input: MappingFlags::DISCRETE,
                    output: MappingFlags::empty(),
                }),
                format: Some(ValueFormat::new(1, DataType::Int8, 2, 0)),
            },
        );
        caps.mode_info.insert(
            0,
            ModeInfo {
                name: Some(InfoText::new("ANGLE")),
                format: Some(ValueFormat::new(2, DataType::Int8, 3, 0)),
                ..ModeInfo::default()
            },
        );
        caps
    }

    #[test]
    fn test_blob_order_ends_with_ack() {
        let messages = sample().to_messages();
        assert_eq!(messages.first(), Some(&Message::Cmd(CmdMessage::Type(34))));
        assert_eq!(messages.last(), Some(&Message::Sys(SysCommand::Ack)));

        let modes: Vec<u8> = messages
            .iter()
            .filter_map(|m| match m {
                Message::Info { mode, .. } => Some(*mode),
                _ => None,
            })
            .collect();
        assert!(modes.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_blob_decodes_back_to_same_summary() {
        let caps = sample();
        let blob = caps.to_blob().unwrap();
        let messages: Vec<Message> = FrameStream::new(blob.iter().copied())
            .map(|frame| frame.unwrap().message)
            .collect();
        assert_eq!(DeviceCapabilities::from_messages(&messages), caps);
    }

    #[test]
    fn test_non_capability_messages_ignored() {
        let caps = DeviceCapabilities::from_messages(&[
            Message::Sys(SysCommand::Nack),
            Message::data(0, vec![1]),
            Message::Cmd(CmdMessage::Select(1)),
        ]);
        assert_eq!(caps, DeviceCapabilities::default());
    }

    #[test]
    fn test_mode_combos_attached_to_mode_zero() {
        let mut caps = sample();
        caps.combos = Some(ModeCombos(vec![0x0003]));
        let messages = caps.to_messages();
        assert!(messages.contains(&Message::info(
            0,
            InfoMessage::ModeCombos(ModeCombos(vec![0x0003]))
        )));
        assert_eq!(
            DeviceCapabilities::from_messages(&messages).combos,
            Some(ModeCombos(vec![0x0003]))
        );
    }
}

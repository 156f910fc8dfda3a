use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Longest keep-alive interval a device tolerates before resetting.
pub const MAX_KEEPALIVE_INTERVAL: Duration = Duration::from_millis(200);

/// Configuration for the capability handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandshakeConfig {
    /// Baud rate the device advertises its capabilities at.
    pub handshake_baud: u32,
    /// Baud rate used once the handshake is acknowledged.
    pub production_baud: u32,
    /// Capability blobs tried before giving up.
    pub attempts: u32,
    /// Time allowed for each attempt to produce a complete blob.
    #[serde(with = "duration_str")]
    pub attempt_timeout: Duration,
    /// Pause between sending ACK and switching baud rate.
    #[serde(with = "duration_str")]
    pub settle_delay: Duration,
    /// Reference capability blob. A received blob must be contained in it.
    /// `None` accepts any well-formed blob.
    #[serde(
        with = "hex_blob",
        skip_serializing_if = "Option::is_none"
    )]
    pub expected_capabilities: Option<Vec<u8>>,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            handshake_baud: 2400,
            production_baud: 115_200,
            attempts: 3,
            attempt_timeout: Duration::from_secs(2),
            settle_delay: Duration::from_millis(200),
            expected_capabilities: None,
        }
    }
}

impl HandshakeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.handshake_baud == 0 || self.production_baud == 0 {
            return Err(invalid("baud rates must be greater than zero"));
        }
        if self.attempts == 0 {
            return Err(invalid("handshake attempts must be at least 1"));
        }
        if self.attempt_timeout.is_zero() {
            return Err(invalid("handshake attempt timeout must be greater than zero"));
        }
        if self
            .expected_capabilities
            .as_ref()
            .is_some_and(|blob| blob.is_empty())
        {
            return Err(invalid("expected capability blob must not be empty"));
        }
        Ok(())
    }
}

/// Timing configuration for an active session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub handshake: HandshakeConfig,
    /// Time between keep-alive bytes. Must not exceed 200ms.
    #[serde(with = "duration_str")]
    pub keepalive_interval: Duration,
    /// Upper bound for a single read in [`Session::poll`](crate::Session::poll).
    #[serde(with = "duration_str")]
    pub read_timeout: Duration,
    /// Minimum time between two outgoing queries.
    #[serde(with = "duration_str")]
    pub min_query_spacing: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake: HandshakeConfig::default(),
            keepalive_interval: Duration::from_millis(100),
            read_timeout: Duration::from_millis(100),
            min_query_spacing: Duration::from_millis(10),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        self.handshake.validate()?;
        if self.keepalive_interval.is_zero() {
            return Err(invalid("keep-alive interval must be greater than zero"));
        }
        if self.keepalive_interval > MAX_KEEPALIVE_INTERVAL {
            return Err(invalid(format!(
                "keep-alive interval {:?} exceeds {:?}",
                self.keepalive_interval, MAX_KEEPALIVE_INTERVAL
            )));
        }
        if self.read_timeout.is_zero() {
            return Err(invalid("read timeout must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> SessionError {
    SessionError::InvalidConfig(message.into())
}

/// Parse "150ms", "2s" or a bare number of seconds.
pub fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration value: {input}"))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 1000 == 0 && millis > 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{millis}ms")
    }
}

mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

mod hex_blob {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(blob) => serializer.serialize_str(&hex::encode_upper(blob)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|text| {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            hex::decode(compact).map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}

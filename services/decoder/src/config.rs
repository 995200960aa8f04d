//! Decoder configuration loading.
//!
//! TOML is the sole config source; no environment variable overrides.
//! Default config path: `decoder.toml` in the working directory.
//!
//! # Required fields
//! - `listen` — bind address for the upstream (timing server) listener
//! - `rfid.target` — address of the RFID tag-read stream
//! - `device.id`
//!
//! Everything else has a default. The clock offset default of 11 hours
//! reproduces the original deployment's local-time emulation; it is a
//! setting here, not a constant.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level decoder configuration, validated.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Bind address for the upstream listener, e.g. `0.0.0.0:3601`.
    pub listen: SocketAddr,
    pub device: DeviceConfig,
    pub rfid: RfidConfig,
    /// Hours added to UTC to obtain the decoder clock.
    pub clock_offset_hours: i64,
    /// Sequence number carried by the first forwarded passing.
    pub first_passing_no: u64,
    /// Interval of the Operational/Idle status log line, in ms.
    pub status_interval_ms: u64,
}

#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub id: String,
    pub protocol_version: String,
    pub box_name: String,
    pub firmware_version: String,
}

#[derive(Debug, Clone)]
pub struct RfidConfig {
    /// Address of the tag-read source, e.g. `192.168.0.52:10000`.
    pub target: SocketAddr,
    /// Delay between reconnect attempts, in ms.
    pub reconnect_ms: u64,
}

// ---------------------------------------------------------------------------
// Raw TOML deserialization types (with Option for optional fields)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawConfig {
    listen: Option<String>,
    device: Option<RawDeviceConfig>,
    rfid: Option<RawRfidConfig>,
    clock_offset_hours: Option<i64>,
    first_passing_no: Option<u64>,
    status_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawDeviceConfig {
    id: Option<String>,
    protocol_version: Option<String>,
    box_name: Option<String>,
    firmware_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRfidConfig {
    target: Option<String>,
    reconnect_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<DecoderConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&text)
}

/// Parse config TOML from a string (separated from file I/O for tests).
pub fn parse_config(text: &str) -> Result<DecoderConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(text)?;

    let listen = raw.listen.ok_or(ConfigError::MissingField("listen"))?;
    let listen = parse_addr("listen", &listen)?;

    let device = raw.device.ok_or(ConfigError::MissingField("device"))?;
    let device = DeviceConfig {
        id: device.id.ok_or(ConfigError::MissingField("device.id"))?,
        protocol_version: device.protocol_version.unwrap_or_else(|| "1.2".to_owned()),
        box_name: device
            .box_name
            .unwrap_or_else(|| "Race Result Emulator".to_owned()),
        firmware_version: device.firmware_version.unwrap_or_else(|| "1.94".to_owned()),
    };
    if device.protocol_version.parse::<f64>().is_err() {
        return Err(ConfigError::InvalidValue {
            field: "device.protocol_version",
            value: device.protocol_version,
        });
    }

    let rfid = raw.rfid.ok_or(ConfigError::MissingField("rfid"))?;
    let target = rfid.target.ok_or(ConfigError::MissingField("rfid.target"))?;
    let rfid = RfidConfig {
        target: parse_addr("rfid.target", &target)?,
        reconnect_ms: rfid.reconnect_ms.unwrap_or(5000),
    };

    Ok(DecoderConfig {
        listen,
        device,
        rfid,
        clock_offset_hours: raw.clock_offset_hours.unwrap_or(11),
        first_passing_no: raw.first_passing_no.unwrap_or(1),
        status_interval_ms: raw.status_interval_ms.unwrap_or(5000),
    })
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .parse::<SocketAddr>()
        .map_err(|_| ConfigError::InvalidValue {
            field,
            value: value.to_owned(),
        })
}

use std::fmt;

// ---------------------------------------------------------------------------
// DeviceIdentity
// ---------------------------------------------------------------------------

/// The immutable identity of the emulated decoder.
///
/// Built once from configuration at startup and shared read-only by every
/// worker. The protocol version is kept both as the configured string (used
/// verbatim in replies) and as a parsed number (used for negotiation), so
/// that `SETPROTOCOL` replies are byte-identical to the configured value.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    device_id: String,
    protocol_version: String,
    protocol_version_num: f64,
    box_name: String,
    firmware_version: String,
}

impl DeviceIdentity {
    /// Create a new identity. Fails if `protocol_version` is not a number
    /// of the form `X` or `X.Y`.
    pub fn new(
        device_id: impl Into<String>,
        protocol_version: &str,
        box_name: impl Into<String>,
        firmware_version: impl Into<String>,
    ) -> Result<DeviceIdentity, InvalidProtocolVersion> {
        let num = protocol_version
            .parse::<f64>()
            .map_err(|_| InvalidProtocolVersion(protocol_version.to_owned()))?;
        Ok(DeviceIdentity {
            device_id: device_id.into(),
            protocol_version: protocol_version.to_owned(),
            protocol_version_num: num,
            box_name: box_name.into(),
            firmware_version: firmware_version.into(),
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// The declared protocol version, exactly as configured.
    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    pub fn box_name(&self) -> &str {
        &self.box_name
    }

    pub fn firmware_version(&self) -> &str {
        &self.firmware_version
    }

    /// Protocol negotiation: the device accepts a session whose requested
    /// maximum version is at least the declared version.
    pub fn supports(&self, requested: f64) -> bool {
        requested >= self.protocol_version_num
    }
}

/// The configured protocol version string did not parse as a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidProtocolVersion(pub String);

impl fmt::Display for InvalidProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid protocol version: {}", self.0)
    }
}

impl std::error::Error for InvalidProtocolVersion {}

#[cfg(test)]
mod tests {
    use super::DeviceIdentity;

    fn identity() -> DeviceIdentity {
        DeviceIdentity::new("D-1234", "1.2", "Race Result Emulator", "1.94").unwrap()
    }

    #[test]
    fn supports_accepts_equal_and_newer_versions() {
        let id = identity();
        assert!(id.supports(1.2));
        assert!(id.supports(1.3));
        assert!(id.supports(3.0));
    }

    #[test]
    fn supports_rejects_older_versions() {
        let id = identity();
        assert!(!id.supports(1.1));
        assert!(!id.supports(1.0));
    }

    #[test]
    fn protocol_version_string_is_preserved_verbatim() {
        let id = DeviceIdentity::new("D-1", "1.20", "Box", "1.94").unwrap();
        assert_eq!(id.protocol_version(), "1.20");
    }

    #[test]
    fn non_numeric_version_is_rejected() {
        assert!(DeviceIdentity::new("D-1", "one.two", "Box", "1.94").is_err());
    }
}

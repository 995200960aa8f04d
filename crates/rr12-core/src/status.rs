//! `GETSTATUS` snapshot formatting.
//!
//! The snapshot is 27 `;`-joined fields. On real hardware most of them come
//! from telemetry; the emulation sources them from a [`StatusTelemetry`]
//! value whose `Default` carries the canned emulation constants, so tests
//! and callers can inject different readings without touching the
//! formatter.

use crate::clock;
use chrono::NaiveDateTime;

/// Number of fields in a status snapshot.
pub const STATUS_FIELDS: usize = 27;

// Error-flag bitmask, reported in the `<ErrorFlags>` field.
pub const ERR_UHF_MODULE: u32 = 1;
pub const ERR_ACTIVE_LOOP: u32 = 16;
pub const ERR_ACTIVE_LOOP_LIMIT: u32 = 32;
pub const ERR_ACTIVE_CONNECTION_SOLVED: u32 = 64;
pub const ERR_GPS_TIME_SYNC: u32 = 256;
pub const ERR_GPS_COMMUNICATION: u32 = 512;
pub const ERR_ACTIVE_TIME_SYNC: u32 = 1024;

// ---------------------------------------------------------------------------
// StatusTelemetry
// ---------------------------------------------------------------------------

/// Device telemetry backing a status snapshot.
///
/// A real decoder fills this from hardware; the emulation uses the
/// defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusTelemetry {
    pub has_power: bool,
    /// 8 antenna-presence indicators of the UHF unit, e.g. `00011001`.
    pub antennas: String,
    pub in_operation_mode: bool,
    pub file_number: u32,
    pub gps_has_fix: bool,
    pub latitude: String,
    pub longitude: String,
    pub reader_healthy: bool,
    /// Battery charge in percent.
    pub battery_charge: u8,
    pub board_temperature: i32,
    pub reader_temperature: i32,
    pub uhf_frequency: u8,
    pub active_ext_connected: bool,
    pub time_is_running: bool,
    /// 0 manual, 1 GPS, 2 GPS but estimated.
    pub time_source: u8,
    pub scheduled_standby_enabled: bool,
    pub in_standby: bool,
    pub error_flags: u32,
}

impl Default for StatusTelemetry {
    fn default() -> StatusTelemetry {
        StatusTelemetry {
            has_power: true,
            antennas: "00011001".to_owned(),
            in_operation_mode: true,
            file_number: 1,
            gps_has_fix: true,
            latitude: "49.721".to_owned(),
            longitude: "8.254939".to_owned(),
            reader_healthy: true,
            battery_charge: 100,
            board_temperature: 10,
            reader_temperature: 10,
            uhf_frequency: 0,
            active_ext_connected: false,
            time_is_running: false,
            time_source: 1,
            scheduled_standby_enabled: true,
            in_standby: true,
            error_flags: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// StatusSnapshot
// ---------------------------------------------------------------------------

/// A `GETSTATUS` reply, built per request and discarded after
/// serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub time: NaiveDateTime,
    pub telemetry: StatusTelemetry,
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

impl StatusSnapshot {
    /// Serialize to the RR12 wire format, without the CRLF terminator.
    pub fn to_line(&self) -> String {
        let t = &self.telemetry;
        let fields: [&str; STATUS_FIELDS] = [
            "GETSTATUS",
            &clock::date_field(self.time),
            &clock::time_field(self.time),
            flag(t.has_power),
            &t.antennas,
            flag(t.in_operation_mode),
            &t.file_number.to_string(),
            flag(t.gps_has_fix),
            &t.latitude,
            &t.longitude,
            flag(t.reader_healthy),
            &t.battery_charge.to_string(),
            &t.board_temperature.to_string(),
            &t.reader_temperature.to_string(),
            &t.uhf_frequency.to_string(),
            flag(t.active_ext_connected),
            // Channel, loop id, loop power, loop connected, loop
            // over-power: only present with an active extension.
            "",
            "",
            "",
            "",
            "",
            flag(t.time_is_running),
            &t.time_source.to_string(),
            flag(t.scheduled_standby_enabled),
            flag(t.in_standby),
            &format!("0x{:x}", t.error_flags),
            // External 12 V supply, optional.
            "",
        ];
        fields.join(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            time: NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_milli_opt(10, 30, 2, 41)
                .unwrap(),
            telemetry: StatusTelemetry::default(),
        }
    }

    #[test]
    fn line_is_byte_exact_with_default_telemetry() {
        assert_eq!(
            snapshot().to_line(),
            "GETSTATUS;2025-06-01;10:30:02.041;1;00011001;1;1;1;49.721;8.254939;1;100;10;10;0;0;;;;;;0;1;1;1;0x0;"
        );
    }

    #[test]
    fn line_has_27_fields_with_empties_preserved() {
        let line = snapshot().to_line();
        assert_eq!(line.split(';').count(), STATUS_FIELDS);
    }

    #[test]
    fn error_flags_render_as_hex_bitmask() {
        let mut snap = snapshot();
        snap.telemetry.error_flags = ERR_UHF_MODULE | ERR_GPS_TIME_SYNC;
        let line = snap.to_line();
        let fields: Vec<&str> = line.split(';').collect();
        assert_eq!(fields[25], "0x101");
    }

    #[test]
    fn error_flag_bits_match_documented_values() {
        assert_eq!(ERR_UHF_MODULE, 1);
        assert_eq!(ERR_ACTIVE_LOOP, 16);
        assert_eq!(ERR_ACTIVE_LOOP_LIMIT, 32);
        assert_eq!(ERR_ACTIVE_CONNECTION_SOLVED, 64);
        assert_eq!(ERR_GPS_TIME_SYNC, 256);
        assert_eq!(ERR_GPS_COMMUNICATION, 512);
        assert_eq!(ERR_ACTIVE_TIME_SYNC, 1024);
    }
}

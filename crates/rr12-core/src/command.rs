//! RR12 command grammar and reply table.
//!
//! Commands arrive as one trimmed ASCII line, fields joined by `;`; the
//! first field selects the command. Parsing is separated from dispatch so
//! every command can be unit-tested without constructing a session: the
//! session layer parses with [`Command::parse`], applies any state effect,
//! and formats the reply with the pure builders below.
//!
//! Replies are returned without the CRLF terminator; the transport appends
//! it.

use crate::identity::DeviceIdentity;
use std::fmt;

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A parsed RR12 command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `SETPROTOCOL;<=X.Y` — negotiate the protocol version.
    SetProtocol { requested: f64 },
    /// `GETCONFIG;<section>;<key>` — read a configuration value.
    GetConfig { section: String, key: String },
    /// `GETFIRMWAREVERSION`
    GetFirmwareVersion,
    /// `SETPUSHPASSINGS;<push>;<holdMs>` — toggle operational mode.
    SetPushPassings { push: i32, hold_ms: i32 },
    /// `GETACTIVESTATUS`
    GetActiveStatus,
    /// `GETSTATUS`
    GetStatus,
    /// `PASSINGS`
    Passings,
}

/// Why a request line did not produce a [`Command`].
///
/// Neither variant is fatal: the session logs it and keeps reading. An
/// unknown command gets no reply at all — silence is the documented
/// behavior on the wire, not an error reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// First token matched no known command.
    Unknown(String),
    /// Known command with arguments that failed to parse.
    Malformed {
        command: &'static str,
        reason: String,
    },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Unknown(cmd) => write!(f, "unknown command: {}", cmd),
            CommandError::Malformed { command, reason } => {
                write!(f, "malformed {} command: {}", command, reason)
            }
        }
    }
}

impl std::error::Error for CommandError {}

impl Command {
    /// Parse one trimmed request line.
    pub fn parse(request: &str) -> Result<Command, CommandError> {
        let tokens: Vec<&str> = request.split(';').collect();
        match tokens[0] {
            "SETPROTOCOL" => {
                // Grammar: SETPROTOCOL;<=X.Y — the literal "<=" precedes
                // the requested maximum version.
                let arg = tokens.get(1).copied().unwrap_or("");
                let version = arg.strip_prefix("<=").ok_or_else(|| CommandError::Malformed {
                    command: "SETPROTOCOL",
                    reason: format!("expected <=X.Y, got {:?}", arg),
                })?;
                let requested =
                    version
                        .parse::<f64>()
                        .map_err(|_| CommandError::Malformed {
                            command: "SETPROTOCOL",
                            reason: format!("non-numeric version {:?}", version),
                        })?;
                Ok(Command::SetProtocol { requested })
            }
            "GETCONFIG" => match (tokens.get(1), tokens.get(2)) {
                (Some(section), Some(key)) => Ok(Command::GetConfig {
                    section: (*section).to_owned(),
                    key: (*key).to_owned(),
                }),
                _ => Err(CommandError::Malformed {
                    command: "GETCONFIG",
                    reason: "expected GETCONFIG;<section>;<key>".to_owned(),
                }),
            },
            "GETFIRMWAREVERSION" => Ok(Command::GetFirmwareVersion),
            "SETPUSHPASSINGS" => {
                let parse_int = |idx: usize, name: &str| {
                    tokens
                        .get(idx)
                        .and_then(|t| t.parse::<i32>().ok())
                        .ok_or_else(|| CommandError::Malformed {
                            command: "SETPUSHPASSINGS",
                            reason: format!("non-numeric {}", name),
                        })
                };
                Ok(Command::SetPushPassings {
                    push: parse_int(1, "push")?,
                    hold_ms: parse_int(2, "holdMs")?,
                })
            }
            "GETACTIVESTATUS" => Ok(Command::GetActiveStatus),
            "GETSTATUS" => Ok(Command::GetStatus),
            "PASSINGS" => Ok(Command::Passings),
            other => Err(CommandError::Unknown(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Reply builders
// ---------------------------------------------------------------------------

/// Reply to `SETPROTOCOL`: echo the declared version on accept, or the
/// fixed error string on reject. The session stays open either way.
pub fn protocol_reply(identity: &DeviceIdentity, requested: f64) -> String {
    if identity.supports(requested) {
        format!("SETPROTOCOL;{}", identity.protocol_version())
    } else {
        "ERROR,Unsupported protocol version".to_owned()
    }
}

/// The fixed `GETCONFIG` lookup table. Unrecognized section/key pairs get
/// no reply on the wire (the caller logs them).
pub fn config_reply(identity: &DeviceIdentity, section: &str, key: &str) -> Option<String> {
    match (section, key) {
        ("GENERAL", "BOXNAME") => Some(format!(
            "GETCONFIG;GENERAL;BOXNAME;{};{}",
            identity.box_name(),
            identity.device_id()
        )),
        ("UPLOAD", "CUSTNO") => Some("GETCONFIG;UPLOAD;CUSTNO;123456".to_owned()),
        ("DETECTION", "DEADTIME") => Some("GETCONFIG;DETECTION;DEADTIME;500".to_owned()),
        ("DETECTION", "REACTIONTIME") => Some("GETCONFIG;DETECTION;REACTIONTIME;500".to_owned()),
        ("DETECTION", "NOTIFICATION") => Some("GETCONFIG;DETECTION;NOTIFICATION;BEEP".to_owned()),
        _ => None,
    }
}

pub fn firmware_reply(identity: &DeviceIdentity) -> String {
    format!("GETFIRMWAREVERSION;{}", identity.firmware_version())
}

/// Echo reply to `SETPUSHPASSINGS` — the values verbatim, after the state
/// effect has been applied by the caller.
pub fn push_passings_reply(push: i32, hold_ms: i32) -> String {
    format!("SETPUSHPASSINGS;{};{}", push, hold_ms)
}

/// Canned `GETACTIVESTATUS` reply; the emulation has no active extension
/// telemetry to report, so the fields are fixed.
pub fn active_status_reply() -> String {
    "GETACTIVESTATUS;1;0;1;1;100;1;1;1;1;100;12;1;1".to_owned()
}

pub fn passings_reply() -> String {
    "PASSINGS;1".to_owned()
}

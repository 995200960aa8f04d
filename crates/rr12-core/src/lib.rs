//! RR12 decoder protocol primitives.
//!
//! This crate contains the pure, socket-free parts of the RR12 decoder
//! protocol: the command grammar, the reply table, and the passing/status
//! record formatters. Everything here is deterministic given its inputs so
//! the exact wire strings can be tested without a TCP connection.
//!
//! The RR12 wire format is ASCII text, fields joined by `;`, lines
//! terminated by CRLF. The CRLF terminator is appended by the transport
//! layer, not by the formatters in this crate.

pub mod clock;
pub mod command;
pub mod identity;
pub mod passing;
pub mod status;

pub use command::{Command, CommandError};
pub use identity::DeviceIdentity;
pub use passing::PassingRecord;
pub use status::{StatusSnapshot, StatusTelemetry};

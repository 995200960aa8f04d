mod forwarder;
mod reporters;
mod rfid;
mod session;

pub use forwarder::{Forwarder, Outbound};
pub use reporters::{payload_repeater, status_reporter};
pub use rfid::RfidConnector;
pub use session::UpstreamListener;

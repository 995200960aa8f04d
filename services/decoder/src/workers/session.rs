//! Upstream (timing server) session handling.
//!
//! One connection at a time: the accept loop hands the write half to the
//! forwarder, then drives the session's read/dispatch loop to completion
//! before accepting again. A newly accepted connection replaces the
//! previous session's write half immediately, so a stale peer that never
//! closed cleanly cannot hold the decoder hostage.
//!
//! Dispatch failures never end the session: malformed and unknown commands
//! are logged and the loop keeps reading. Only a zero-length read or an
//! I/O error closes the session.

use crate::state::DecoderState;
use crate::workers::forwarder::Outbound;
use rr12_core::command::{self, Command, CommandError};
use rr12_core::{DeviceIdentity, StatusSnapshot, StatusTelemetry, clock};
use std::net::SocketAddr;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, tcp::OwnedReadHalf};
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, warn};

/// Accepts upstream sessions and dispatches their commands.
pub struct UpstreamListener {
    listener: TcpListener,
    state: DecoderState,
    identity: DeviceIdentity,
    outbound: Sender<Outbound>,
    clock_offset_hours: i64,
}

impl UpstreamListener {
    pub async fn new(
        bind: SocketAddr,
        state: DecoderState,
        identity: DeviceIdentity,
        outbound: Sender<Outbound>,
        clock_offset_hours: i64,
    ) -> Self {
        let listener = TcpListener::bind(bind).await.expect("Unable to bind to port");
        info!(addr = %listener.local_addr().expect("local_addr after bind"), "listening for upstream");

        UpstreamListener {
            listener,
            state,
            identity,
            outbound,
            clock_offset_hours,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr().expect("local_addr after bind")
    }

    /// Accept loop. Sessions are handled sequentially, to completion.
    pub async fn begin(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    info!(%peer, "upstream connected");
                    let (read_half, write_half) = stream.into_split();
                    if self.outbound.send(Outbound::Attach(write_half)).await.is_err() {
                        warn!("forwarder unavailable, stopping listener");
                        return;
                    }
                    self.handle_session(read_half).await;
                    info!(%peer, "upstream session ended");
                    if self.outbound.send(Outbound::Detach).await.is_err() {
                        warn!("forwarder unavailable, stopping listener");
                        return;
                    }
                }
                Err(error) => {
                    warn!(%error, "failed to accept upstream connection");
                }
            }
        }
    }

    /// Read/dispatch loop for one session.
    async fn handle_session(&self, mut read_half: OwnedReadHalf) {
        let mut buffer = [0u8; 1024];
        loop {
            let n = match read_half.read(&mut buffer).await {
                Ok(0) => {
                    debug!("upstream closed or no data received");
                    return;
                }
                Ok(n) => n,
                Err(error) => {
                    warn!(%error, "error reading from upstream");
                    return;
                }
            };
            let request = String::from_utf8_lossy(&buffer[..n]).trim().to_owned();
            debug!(%request, "received from upstream");

            if let Some(reply) = self.dispatch(&request) {
                if self.outbound.send(Outbound::Line(reply)).await.is_err() {
                    warn!("forwarder unavailable, ending session");
                    return;
                }
            }
        }
    }

    /// Interpret one request and produce its reply, applying any state
    /// effect. `None` means silence on the wire (unknown command,
    /// unrecognized config pair, parse failure).
    fn dispatch(&self, request: &str) -> Option<String> {
        match Command::parse(request) {
            Ok(Command::SetProtocol { requested }) => {
                Some(command::protocol_reply(&self.identity, requested))
            }
            Ok(Command::GetConfig { section, key }) => {
                let reply = command::config_reply(&self.identity, &section, &key);
                if reply.is_none() {
                    // Not an error on the wire: the device just stays quiet.
                    info!(%section, %key, "no config entry, missing response");
                }
                reply
            }
            Ok(Command::GetFirmwareVersion) => Some(command::firmware_reply(&self.identity)),
            Ok(Command::SetPushPassings { push, hold_ms }) => {
                self.state.set_push_passings(push, hold_ms);
                Some(command::push_passings_reply(push, hold_ms))
            }
            Ok(Command::GetActiveStatus) => Some(command::active_status_reply()),
            Ok(Command::GetStatus) => {
                let snapshot = StatusSnapshot {
                    time: clock::decoder_time(self.clock_offset_hours),
                    telemetry: StatusTelemetry::default(),
                };
                Some(snapshot.to_line())
            }
            Ok(Command::Passings) => Some(command::passings_reply()),
            Err(CommandError::Unknown(cmd)) => {
                info!(command = %cmd, "unknown command");
                None
            }
            Err(error @ CommandError::Malformed { .. }) => {
                warn!(%error, "dropping malformed command");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UpstreamListener;
    use crate::state::DecoderState;
    use rr12_core::DeviceIdentity;
    use tokio::sync::mpsc;

    async fn listener_under_test() -> (UpstreamListener, mpsc::Receiver<super::Outbound>) {
        let (tx, rx) = mpsc::channel(16);
        let listener = UpstreamListener::new(
            "127.0.0.1:0".parse().unwrap(),
            DecoderState::new(1),
            DeviceIdentity::new("D-4711", "1.2", "Race Result Emulator", "1.94").unwrap(),
            tx,
            11,
        )
        .await;
        (listener, rx)
    }

    #[tokio::test]
    async fn dispatch_answers_each_command_from_the_table() {
        let (listener, _rx) = listener_under_test().await;

        assert_eq!(
            listener.dispatch("SETPROTOCOL;<=1.3").as_deref(),
            Some("SETPROTOCOL;1.2")
        );
        assert_eq!(
            listener.dispatch("SETPROTOCOL;<=1.0").as_deref(),
            Some("ERROR,Unsupported protocol version")
        );
        assert_eq!(
            listener.dispatch("GETCONFIG;GENERAL;BOXNAME").as_deref(),
            Some("GETCONFIG;GENERAL;BOXNAME;Race Result Emulator;D-4711")
        );
        assert_eq!(
            listener.dispatch("GETFIRMWAREVERSION").as_deref(),
            Some("GETFIRMWAREVERSION;1.94")
        );
        assert_eq!(
            listener.dispatch("GETACTIVESTATUS").as_deref(),
            Some("GETACTIVESTATUS;1;0;1;1;100;1;1;1;1;100;12;1;1")
        );
        assert_eq!(listener.dispatch("PASSINGS").as_deref(), Some("PASSINGS;1"));
    }

    #[tokio::test]
    async fn dispatch_is_silent_for_unknown_and_malformed_input() {
        let (listener, _rx) = listener_under_test().await;

        assert_eq!(listener.dispatch("REBOOT"), None);
        assert_eq!(listener.dispatch("GETCONFIG;GENERAL;SERIAL"), None);
        assert_eq!(listener.dispatch("SETPUSHPASSINGS;yes;no"), None);
        assert_eq!(listener.dispatch("SETPROTOCOL;1.3"), None);
    }

    #[tokio::test]
    async fn dispatch_setpushpassings_updates_state_and_echoes() {
        let (listener, _rx) = listener_under_test().await;

        assert_eq!(
            listener.dispatch("SETPUSHPASSINGS;1;1000").as_deref(),
            Some("SETPUSHPASSINGS;1;1000")
        );
        assert!(listener.state.is_operational());

        assert_eq!(
            listener.dispatch("SETPUSHPASSINGS;0;500").as_deref(),
            Some("SETPUSHPASSINGS;0;500")
        );
        assert!(!listener.state.is_operational());
    }

    #[tokio::test]
    async fn dispatch_getstatus_produces_a_27_field_snapshot() {
        let (listener, _rx) = listener_under_test().await;

        let line = listener.dispatch("GETSTATUS").unwrap();
        assert!(line.starts_with("GETSTATUS;"));
        assert_eq!(line.split(';').count(), rr12_core::status::STATUS_FIELDS);
    }
}

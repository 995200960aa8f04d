//! RFID stream ingestion.
//!
//! Maintains the outbound connection to the tag-read source for the
//! lifetime of the process: connect, read, and on any failure drop back to
//! disconnected and retry after a fixed delay. There is no retry limit and
//! no jitter — the reader is expected to come back eventually.

use crate::state::DecoderState;
use crate::workers::forwarder::Outbound;
use rr12_core::{DeviceIdentity, PassingRecord, clock};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc::Sender;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Receives tag reads from the RFID source and republishes them upstream
/// as passing records.
pub struct RfidConnector {
    target: SocketAddr,
    reconnect_delay: Duration,
    state: DecoderState,
    identity: DeviceIdentity,
    outbound: Sender<Outbound>,
    clock_offset_hours: i64,
    stream: Option<TcpStream>,
}

impl RfidConnector {
    pub fn new(
        target: SocketAddr,
        reconnect_delay: Duration,
        state: DecoderState,
        identity: DeviceIdentity,
        outbound: Sender<Outbound>,
        clock_offset_hours: i64,
    ) -> Self {
        info!(%target, "waiting for RFID stream");

        RfidConnector {
            target,
            reconnect_delay,
            state,
            identity,
            outbound,
            clock_offset_hours,
            stream: None,
        }
    }

    /// Connect/read loop.
    ///
    /// This function should never return.
    pub async fn begin(&mut self) {
        let mut buffer = [0u8; 1024];
        loop {
            match self.stream.as_mut() {
                Some(stream) => match stream.read(&mut buffer).await {
                    Ok(0) => {
                        info!("RFID stream closed, reconnecting");
                        self.stream = None;
                        sleep(self.reconnect_delay).await;
                    }
                    Ok(n) => {
                        let payload = String::from_utf8_lossy(&buffer[..n]).trim().to_owned();
                        debug!(%payload, "received RFID data");
                        self.handle_payload(payload).await;
                    }
                    Err(error) => {
                        warn!(%error, "error reading from RFID stream");
                        self.stream = None;
                        sleep(self.reconnect_delay).await;
                    }
                },
                None => match TcpStream::connect(self.target).await {
                    Ok(stream) => {
                        info!(target = %self.target, "connected to RFID stream");
                        self.stream = Some(stream);
                    }
                    Err(error) => {
                        warn!(%error, "failed to connect to RFID stream, retrying");
                        sleep(self.reconnect_delay).await;
                    }
                },
            }
        }
    }

    /// Record the payload and, when pushing is on and an upstream session
    /// is attached, forward it as the next numbered passing.
    async fn handle_payload(&self, payload: String) {
        self.state.store_payload(payload.clone());

        if !(self.state.is_operational() && self.state.session_open()) {
            return;
        }
        let record = PassingRecord {
            passing_no: self.state.next_passing_no(),
            tag_code: payload,
            time: clock::decoder_time(self.clock_offset_hours),
        };
        let line = record.to_line(&self.identity);
        // A stale or full forwarder never stops ingestion.
        if self.outbound.send(Outbound::Line(line)).await.is_err() {
            warn!("forwarder unavailable, dropping passing");
        }
    }
}

//! Periodic background tasks layered on the shared state.
//!
//! `status_reporter` is observability only. `payload_repeater` re-sends the
//! last raw RFID payload upstream once a second while operational — the
//! decoder behavior some timing servers rely on as a keep-alive; it goes
//! through the forwarder like every other writer, so it can never tear a
//! concurrent passing or reply.

use crate::state::DecoderState;
use crate::workers::forwarder::Outbound;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Interval of the raw payload re-send.
const RESEND_INTERVAL: Duration = Duration::from_millis(1000);

/// Log the operational state at a fixed interval.
///
/// This function should never return.
pub async fn status_reporter(state: DecoderState, interval: Duration) {
    loop {
        if state.is_operational() {
            info!("system status: Operational");
        } else {
            info!("system status: Idle");
        }
        sleep(interval).await;
    }
}

/// Re-send the last payload verbatim (not reformatted as a passing) while
/// operational and connected.
///
/// This function should never return.
pub async fn payload_repeater(state: DecoderState, outbound: Sender<Outbound>) {
    loop {
        if state.is_operational() && state.session_open() {
            match state.last_payload() {
                Some(payload) if !payload.is_empty() => {
                    debug!(%payload, "re-sending last RFID data");
                    if outbound.send(Outbound::Line(payload)).await.is_err() {
                        warn!("forwarder unavailable, skipping re-send");
                    }
                }
                _ => debug!("no RFID data to send"),
            }
        }
        sleep(RESEND_INTERVAL).await;
    }
}

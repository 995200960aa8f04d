//! RR12 decoder emulator.
//!
//! Bridges an upstream timing server speaking the RR12 decoder protocol to
//! a downstream RFID tag-read TCP stream: commands in, passing records out.

use futures::{future::FutureExt, future::select_all, pin_mut};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::error;

pub mod config;
pub mod state;
pub mod workers;

pub use config::{ConfigError, DecoderConfig, load_config};
pub use rr12_core::DeviceIdentity;

use state::DecoderState;
use workers::{Forwarder, Outbound, RfidConnector, UpstreamListener};

async fn signal_handler() {
    tokio::signal::ctrl_c().await.expect("ctrl-c handler");
}

/// Run the decoder until ctrl-c or a worker gives up.
///
/// Dropping the worker futures on return cancels them at their next await
/// point and closes their sockets.
pub async fn run(config: DecoderConfig) {
    let identity = match DeviceIdentity::new(
        &config.device.id,
        &config.device.protocol_version,
        &config.device.box_name,
        &config.device.firmware_version,
    ) {
        Ok(identity) => identity,
        Err(e) => {
            // Config validation catches this before run(); double-check
            // because DeviceIdentity is also constructible directly.
            error!(error = %e, "invalid device identity");
            return;
        }
    };
    let state = DecoderState::new(config.first_passing_no);

    // Bus carrying every outbound write to the single forwarder owner.
    let (outbound_tx, outbound_rx) = mpsc::channel::<Outbound>(64);

    let forwarder = Forwarder::new(outbound_rx, state.clone());
    let listener = UpstreamListener::new(
        config.listen,
        state.clone(),
        identity.clone(),
        outbound_tx.clone(),
        config.clock_offset_hours,
    )
    .await;
    let mut rfid = RfidConnector::new(
        config.rfid.target,
        Duration::from_millis(config.rfid.reconnect_ms),
        state.clone(),
        identity,
        outbound_tx.clone(),
        config.clock_offset_hours,
    );

    let fut_forwarder = forwarder.begin().fuse();
    let fut_listener = listener.begin().fuse();
    let fut_rfid = rfid.begin().fuse();
    let fut_status = workers::status_reporter(
        state.clone(),
        Duration::from_millis(config.status_interval_ms),
    )
    .fuse();
    let fut_repeater = workers::payload_repeater(state.clone(), outbound_tx.clone()).fuse();
    let fut_sig = signal_handler().fuse();

    pin_mut!(
        fut_forwarder,
        fut_listener,
        fut_rfid,
        fut_status,
        fut_repeater,
        fut_sig
    );
    let futures: Vec<Pin<&mut dyn Future<Output = ()>>> = vec![
        fut_forwarder,
        fut_listener,
        fut_rfid,
        fut_status,
        fut_repeater,
        fut_sig,
    ];
    // If any of them finish, end the program as something went wrong
    select_all(futures).await;
}

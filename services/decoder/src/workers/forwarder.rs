//! The single owner of the upstream write side.
//!
//! Three independent sources write to the upstream connection: command
//! replies, RFID-triggered passings, and the periodic payload re-send.
//! Letting them write directly would interleave partial lines, so they all
//! funnel through one mpsc channel into this task, which holds the only
//! write half. Channel FIFO order also guarantees that the reply to a
//! command is flushed before any passing or re-send queued after it.

use crate::state::DecoderState;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info, warn};

/// A message for the forwarder task.
#[derive(Debug)]
pub enum Outbound {
    /// Install a newly accepted session's write half. The previous write
    /// half, if any, is dropped — closing the old session's write side
    /// atomically with the replacement.
    Attach(OwnedWriteHalf),
    /// The session handler's read loop ended: drop the write half and
    /// mark the session closed, so passings stop being numbered and
    /// queued into a dead socket.
    Detach,
    /// One protocol line to write upstream. The CRLF terminator is added
    /// here if missing, so every write on the wire is a complete line.
    Line(String),
}

/// Serializes all upstream writes through one task.
pub struct Forwarder {
    rx: Receiver<Outbound>,
    state: DecoderState,
    session: Option<OwnedWriteHalf>,
}

impl Forwarder {
    pub fn new(rx: Receiver<Outbound>, state: DecoderState) -> Self {
        Forwarder {
            rx,
            state,
            session: None,
        }
    }

    /// Run until every sender is dropped.
    pub async fn begin(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                Outbound::Attach(write_half) => {
                    if self.session.is_some() {
                        info!("replacing upstream session");
                    }
                    self.session = Some(write_half);
                    self.state.set_session_open(true);
                }
                Outbound::Detach => {
                    debug!("upstream session detached");
                    self.session = None;
                    self.state.set_session_open(false);
                }
                Outbound::Line(line) => self.write_line(line).await,
            }
        }
    }

    async fn write_line(&mut self, mut line: String) {
        let Some(session) = self.session.as_mut() else {
            debug!("no upstream session, dropping line");
            return;
        };
        if !line.ends_with("\r\n") {
            line.push_str("\r\n");
        }
        if let Err(error) = session.write_all(line.as_bytes()).await {
            warn!(%error, "upstream write failed, detaching session");
            self.session = None;
            self.state.set_session_open(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Forwarder, Outbound};
    use crate::state::DecoderState;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;
    use tokio::time::{Duration, timeout};

    async fn attached_forwarder() -> (mpsc::Sender<Outbound>, TcpStream, DecoderState) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().unwrap();
        let connect = tokio::spawn(async move { TcpStream::connect(addr).await });
        let (server_stream, _) = listener.accept().await.expect("accept");
        let peer = connect.await.expect("join").expect("connect");

        let (tx, rx) = mpsc::channel(64);
        let state = DecoderState::new(1);
        tokio::spawn(Forwarder::new(rx, state.clone()).begin());

        let (_read_half, write_half) = server_stream.into_split();
        tx.send(Outbound::Attach(write_half)).await.unwrap();
        // Wait until the forwarder task has processed the attach; on the
        // current-thread runtime it has not been polled yet at this point.
        for _ in 0..100 {
            if state.session_open() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        (tx, peer, state)
    }

    async fn read_for(peer: &mut TcpStream, ms: u64) -> String {
        let mut collected = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            match timeout(Duration::from_millis(ms), peer.read(&mut buf)).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(n)) => collected.extend_from_slice(&buf[..n]),
                Ok(Err(e)) => panic!("read error: {e}"),
            }
        }
        String::from_utf8(collected).expect("utf8")
    }

    #[tokio::test]
    async fn attach_marks_session_open() {
        let (_tx, _peer, state) = attached_forwarder().await;
        assert!(state.session_open());
    }

    #[tokio::test]
    async fn lines_are_crlf_terminated_exactly_once() {
        let (tx, mut peer, _state) = attached_forwarder().await;
        tx.send(Outbound::Line("PASSINGS;1".to_owned())).await.unwrap();
        tx.send(Outbound::Line("GETFIRMWAREVERSION;1.94\r\n".to_owned()))
            .await
            .unwrap();

        let text = read_for(&mut peer, 100).await;
        assert_eq!(text, "PASSINGS;1\r\nGETFIRMWAREVERSION;1.94\r\n");
    }

    #[tokio::test]
    async fn concurrent_senders_never_interleave_partial_lines() {
        let (tx, mut peer, _state) = attached_forwarder().await;

        let mut tasks = Vec::new();
        for source in ["reply", "passing", "resend"] {
            let tx = tx.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..50 {
                    tx.send(Outbound::Line(format!("{};{};payload", source, i)))
                        .await
                        .unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let text = read_for(&mut peer, 200).await;
        assert!(text.ends_with("\r\n"));
        let lines: Vec<&str> = text.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 150);
        for line in lines {
            let fields: Vec<&str> = line.split(';').collect();
            assert_eq!(fields.len(), 3, "torn line on the wire: {line:?}");
            assert!(["reply", "passing", "resend"].contains(&fields[0]));
            assert_eq!(fields[2], "payload");
        }
    }

    #[tokio::test]
    async fn detach_drops_write_half_and_marks_session_closed() {
        let (tx, mut peer, state) = attached_forwarder().await;
        assert!(state.session_open());

        tx.send(Outbound::Detach).await.unwrap();
        for _ in 0..100 {
            if !state.session_open() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!state.session_open());

        // Lines after the detach are dropped; the peer sees EOF because
        // dropping the write half shuts the write side down.
        tx.send(Outbound::Line("PASSINGS;1".to_owned())).await.unwrap();
        let text = read_for(&mut peer, 100).await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn write_failure_detaches_session() {
        let (tx, peer, state) = attached_forwarder().await;
        drop(peer);

        // Keep writing until the broken pipe is observed.
        for _ in 0..200 {
            tx.send(Outbound::Line("x".repeat(64 * 1024))).await.unwrap();
            if !state.session_open() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected write failure to detach the session");
    }

    #[tokio::test]
    async fn attach_replaces_previous_session() {
        let (tx, mut old_peer, _state) = attached_forwarder().await;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = tokio::spawn(async move { TcpStream::connect(addr).await });
        let (server_stream, _) = listener.accept().await.unwrap();
        let mut new_peer = connect.await.unwrap().unwrap();
        let (_read_half, write_half) = server_stream.into_split();
        tx.send(Outbound::Attach(write_half)).await.unwrap();

        tx.send(Outbound::Line("#P;1;E2001".to_owned())).await.unwrap();

        let new_text = read_for(&mut new_peer, 100).await;
        assert_eq!(new_text, "#P;1;E2001\r\n");
        let old_text = read_for(&mut old_peer, 100).await;
        assert_eq!(old_text, "");
    }
}

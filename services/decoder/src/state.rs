//! Shared decoder state.
//!
//! Everything mutable that more than one worker touches lives behind this
//! handle: the operational flag, the push hold time, the last RFID payload,
//! the passing counter, and whether an upstream session is currently
//! attached. Workers go through the accessor methods; the mutex never
//! escapes.

use std::sync::{Arc, Mutex};

/// Cloneable handle to the shared state. Clones refer to the same state.
#[derive(Debug, Clone, Default)]
pub struct DecoderState {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    operational: bool,
    push_hold_ms: i32,
    /// Most recent trimmed RFID payload. Overwrite semantics: a fast
    /// producer can shadow intermediate reads, which is accepted.
    last_payload: Option<String>,
    /// Next passing number to hand out. Monotonic for the process
    /// lifetime; never reset, not even across RFID reconnects.
    next_passing_no: u64,
    /// Maintained by the forwarder as sessions attach and detach.
    session_open: bool,
}

impl DecoderState {
    /// Create state with the configured first passing number.
    pub fn new(first_passing_no: u64) -> DecoderState {
        DecoderState {
            inner: Arc::new(Mutex::new(Inner {
                next_passing_no: first_passing_no,
                ..Inner::default()
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("decoder state mutex poisoned")
    }

    /// Apply a `SETPUSHPASSINGS` command: operational iff `push != 0`.
    pub fn set_push_passings(&self, push: i32, hold_ms: i32) {
        let mut inner = self.lock();
        inner.operational = push != 0;
        inner.push_hold_ms = hold_ms;
    }

    pub fn is_operational(&self) -> bool {
        self.lock().operational
    }

    pub fn push_hold_ms(&self) -> i32 {
        self.lock().push_hold_ms
    }

    pub fn store_payload(&self, payload: String) {
        self.lock().last_payload = Some(payload);
    }

    pub fn last_payload(&self) -> Option<String> {
        self.lock().last_payload.clone()
    }

    /// Take the next passing number and advance the counter.
    pub fn next_passing_no(&self) -> u64 {
        let mut inner = self.lock();
        let no = inner.next_passing_no;
        inner.next_passing_no += 1;
        no
    }

    pub fn set_session_open(&self, open: bool) {
        self.lock().session_open = open;
    }

    pub fn session_open(&self) -> bool {
        self.lock().session_open
    }
}

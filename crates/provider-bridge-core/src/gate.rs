use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::domain::HostHandler;

/// Holds host-directed messages back until the host signer announces itself.
#[derive(Debug, Default)]
pub struct ReadinessGate {
    ready: AtomicBool,
}

impl ReadinessGate {
    pub fn new(ready: bool) -> Self {
        Self {
            ready: AtomicBool::new(ready),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Opens the gate. There is no way to close it again.
    pub fn mark_ready(&self) {
        if !self.ready.swap(true, Ordering::AcqRel) {
            debug!(target: "bridge::gate", "host signer ready");
        }
    }

    pub fn admits(&self, handler: HostHandler) -> bool {
        self.is_ready() || handler.bypasses_gate()
    }
}

use std::sync::{Arc, Mutex};

use provider_bridge_core::{BridgeError, NativeChannelPort, NativeMessage};

/// Native channel that keeps every host-directed message for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingChannelAdapter {
    inner: Arc<Mutex<ChannelState>>,
}

#[derive(Debug, Default)]
struct ChannelState {
    sent: Vec<NativeMessage>,
    closed: bool,
}

impl RecordingChannelAdapter {
    pub fn sent(&self) -> Result<Vec<NativeMessage>, BridgeError> {
        let g = self
            .inner
            .lock()
            .map_err(|e| BridgeError::Internal(format!("channel lock poisoned: {e}")))?;
        Ok(g.sent.clone())
    }

    pub fn drain(&self) -> Result<Vec<NativeMessage>, BridgeError> {
        let mut g = self
            .inner
            .lock()
            .map_err(|e| BridgeError::Internal(format!("channel lock poisoned: {e}")))?;
        Ok(std::mem::take(&mut g.sent))
    }

    /// Makes every later post fail, as if the host tore the handler down.
    pub fn close(&self) -> Result<(), BridgeError> {
        let mut g = self
            .inner
            .lock()
            .map_err(|e| BridgeError::Internal(format!("channel lock poisoned: {e}")))?;
        g.closed = true;
        Ok(())
    }
}

impl NativeChannelPort for RecordingChannelAdapter {
    fn post_message(&self, message: NativeMessage) -> Result<(), BridgeError> {
        let mut g = self
            .inner
            .lock()
            .map_err(|e| BridgeError::Internal(format!("channel lock poisoned: {e}")))?;
        if g.closed {
            return Err(BridgeError::Transport(format!(
                "native handler {} is gone",
                message.name
            )));
        }
        g.sent.push(message);
        Ok(())
    }
}

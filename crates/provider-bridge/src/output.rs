use std::io::Write;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use provider_bridge_core::{BridgeError, NativeChannelPort, NativeMessage};

/// Newline-delimited JSON sink shared by the driver and the native channel.
#[derive(Clone)]
pub struct LineSink {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl LineSink {
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    pub fn emit(&self, line: &Value) -> Result<(), BridgeError> {
        let mut w = self
            .writer
            .lock()
            .map_err(|e| BridgeError::Internal(format!("output lock poisoned: {e}")))?;
        writeln!(w, "{line}")
            .and_then(|_| w.flush())
            .map_err(|e| BridgeError::Transport(format!("stdout write failed: {e}")))
    }
}

/// Posts host-directed messages as `{"native": {name, object, id}}` lines.
#[derive(Clone)]
pub struct LineChannel {
    sink: LineSink,
}

impl LineChannel {
    pub fn new(sink: LineSink) -> Self {
        Self { sink }
    }
}

impl NativeChannelPort for LineChannel {
    fn post_message(&self, message: NativeMessage) -> Result<(), BridgeError> {
        self.sink.emit(&serde_json::json!({ "native": message }))
    }
}

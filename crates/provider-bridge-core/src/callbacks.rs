use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use tracing::warn;

use crate::domain::{InternalId, ResponseEnvelope};
use crate::ports::BridgeError;

pub type Completion = Result<ResponseEnvelope, BridgeError>;
pub type CompletionHandler = Box<dyn FnOnce(Completion) + Send>;

/// One-shot completion handlers keyed by the wire id.
#[derive(Default)]
pub struct CallbackRegistry {
    handlers: Mutex<HashMap<InternalId, CompletionHandler>>,
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self.handlers.lock().map(|g| g.len()).ok();
        f.debug_struct("CallbackRegistry")
            .field("pending", &pending)
            .finish()
    }
}

impl CallbackRegistry {
    pub fn register(&self, id: InternalId, handler: CompletionHandler) -> Result<(), BridgeError> {
        let mut g = self
            .handlers
            .lock()
            .map_err(|e| BridgeError::poisoned("callback registry", e))?;
        if g.insert(id, handler).is_some() {
            warn!(target: "bridge::callbacks", "replaced pending handler for id {}", id);
        }
        Ok(())
    }

    /// Removes the handler for `id` and runs it once. Returns `false` when no
    /// handler was waiting, in which case the completion is dropped.
    pub fn resolve(&self, id: InternalId, completion: Completion) -> Result<bool, BridgeError> {
        let handler = self
            .handlers
            .lock()
            .map_err(|e| BridgeError::poisoned("callback registry", e))?
            .remove(&id);
        match handler {
            Some(handler) => {
                handler(completion);
                Ok(true)
            }
            None => {
                warn!(target: "bridge::callbacks", "dropping completion for unknown id {}", id);
                Ok(false)
            }
        }
    }

    /// Deregisters without invoking the handler.
    pub fn remove(&self, id: InternalId) -> Result<bool, BridgeError> {
        let mut g = self
            .handlers
            .lock()
            .map_err(|e| BridgeError::poisoned("callback registry", e))?;
        Ok(g.remove(&id).is_some())
    }

    pub fn contains(&self, id: InternalId) -> Result<bool, BridgeError> {
        let g = self
            .handlers
            .lock()
            .map_err(|e| BridgeError::poisoned("callback registry", e))?;
        Ok(g.contains_key(&id))
    }

    pub fn len(&self) -> Result<usize, BridgeError> {
        let g = self
            .handlers
            .lock()
            .map_err(|e| BridgeError::poisoned("callback registry", e))?;
        Ok(g.len())
    }

    pub fn is_empty(&self) -> Result<bool, BridgeError> {
        Ok(self.len()? == 0)
    }
}

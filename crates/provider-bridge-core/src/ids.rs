//! Translation between caller-supplied request ids and the integer ids the
//! native channel requires.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tracing::trace;

use crate::domain::{InternalId, Request, RequestId};
use crate::ports::BridgeError;

#[derive(Debug, Default)]
pub struct IdMapping {
    table: Mutex<IdTable>,
}

#[derive(Debug, Default)]
struct IdTable {
    last_issued: u64,
    in_flight: HashSet<u64>,
    originals: HashMap<u64, RequestId>,
}

impl IdTable {
    fn fresh(&mut self) -> u64 {
        loop {
            self.last_issued = self.last_issued.wrapping_add(1).max(1);
            if !self.in_flight.contains(&self.last_issued) {
                return self.last_issued;
            }
        }
    }
}

impl IdMapping {
    /// Ensures `request.id` is a safe integer that no other in-flight call uses.
    ///
    /// Missing ids get a fresh id and no reverse entry. Non-integer or colliding
    /// ids get a fresh id and the original is remembered until `try_pop_id`.
    pub fn try_intify_id(&self, request: &mut Request) -> Result<InternalId, BridgeError> {
        let mut g = self
            .table
            .lock()
            .map_err(|e| BridgeError::poisoned("id mapping", e))?;

        let reusable = request
            .id
            .as_ref()
            .and_then(RequestId::as_safe_integer)
            .filter(|n| !g.in_flight.contains(n));

        let internal = match (reusable, request.id.take()) {
            (Some(n), _) => n,
            (None, None) => g.fresh(),
            (None, Some(original)) => {
                let n = g.fresh();
                trace!(target: "bridge::ids", "rewrote id {} -> {}", original, n);
                g.originals.insert(n, original);
                n
            }
        };
        g.in_flight.insert(internal);
        let internal = InternalId(internal);
        request.id = Some(internal.into());
        Ok(internal)
    }

    /// Releases `id` and returns the id the caller originally supplied, or `id`
    /// itself when it was never rewritten.
    pub fn try_pop_id(&self, id: InternalId) -> Result<RequestId, BridgeError> {
        let mut g = self
            .table
            .lock()
            .map_err(|e| BridgeError::poisoned("id mapping", e))?;
        g.in_flight.remove(&id.0);
        Ok(g.originals.remove(&id.0).unwrap_or_else(|| id.into()))
    }

    /// Number of rewritten ids still waiting for a response.
    pub fn len(&self) -> Result<usize, BridgeError> {
        let g = self
            .table
            .lock()
            .map_err(|e| BridgeError::poisoned("id mapping", e))?;
        Ok(g.originals.len())
    }

    pub fn is_empty(&self) -> Result<bool, BridgeError> {
        Ok(self.len()? == 0)
    }

    pub fn is_in_flight(&self, id: InternalId) -> Result<bool, BridgeError> {
        let g = self
            .table
            .lock()
            .map_err(|e| BridgeError::poisoned("id mapping", e))?;
        Ok(g.in_flight.contains(&id.0))
    }
}

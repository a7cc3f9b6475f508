//! Observer output hub.
//!
//! A mutex-guarded map of buffered per-entity channels shared by every
//! instance task and the connection handlers. Sends are non-blocking
//! send-or-drop: a slow or stalled observer can never stall simulation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use warren_core::EntityId;

use crate::protocol::ServerResponse;

/// Clone-able handle to the shared observer map.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<Mutex<HashMap<EntityId, mpsc::Sender<ServerResponse>>>>,
    buffer: usize,
}

impl Broadcaster {
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            buffer: buffer.max(1),
        }
    }

    /// Registers an observer channel for an entity, returning the receiving
    /// end. Re-registering under the same identity drops (and thereby
    /// closes) the previous channel rather than erroring.
    pub fn register(&self, entity: EntityId) -> mpsc::Receiver<ServerResponse> {
        let (tx, rx) = mpsc::channel(self.buffer);
        let previous = self
            .inner
            .lock()
            .expect("broadcaster mutex poisoned")
            .insert(entity, tx);
        if previous.is_some() {
            tracing::debug!(entity = %entity, "replaced existing observer channel");
        }
        rx
    }

    pub fn unregister(&self, entity: EntityId) {
        self.inner
            .lock()
            .expect("broadcaster mutex poisoned")
            .remove(&entity);
    }

    pub fn is_subscribed(&self, entity: EntityId) -> bool {
        self.inner
            .lock()
            .expect("broadcaster mutex poisoned")
            .contains_key(&entity)
    }

    /// Best-effort delivery. A full buffer or a gone receiver drops the
    /// frame; the simulation never waits on an observer.
    pub fn send(&self, entity: EntityId, response: ServerResponse) {
        let sender = {
            let map = self.inner.lock().expect("broadcaster mutex poisoned");
            map.get(&entity).cloned()
        };
        let Some(sender) = sender else {
            return;
        };
        if let Err(err) = sender.try_send(response) {
            tracing::trace!(entity = %entity, ?err, "dropped frame for slow observer");
        }
    }
}

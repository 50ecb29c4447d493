//! Session Pool
//!
//! Serves many users from one process. Each user gets a separate
//! [`Session`] built by the same wiring function, so every session starts
//! from the declared defaults and none of them share mutable state. The pool
//! only serializes access to each individual session.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::reactive::Session;

/// Identifier of a session in a pool. Ids are unique within the pool that
/// issued them, counting from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Declares the inputs, nodes, views and sinks of a fresh session.
pub type Wiring = dyn Fn(&mut Session) -> Result<()> + Send + Sync;

/// A set of independent sessions.
pub struct SessionPool {
    config: SessionConfig,
    wiring: Arc<Wiring>,
    sessions: DashMap<SessionId, Arc<Mutex<Session>>>,
    next_id: AtomicU64,
}

impl SessionPool {
    pub fn new<F>(config: SessionConfig, wiring: F) -> Self
    where
        F: Fn(&mut Session) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            config,
            wiring: Arc::new(wiring),
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Build and validate a new session. Wiring errors are returned and no
    /// session is registered.
    pub fn open(&self) -> Result<SessionId> {
        let mut session = Session::new(self.config.clone());
        (self.wiring)(&mut session)?;
        session.validate()?;

        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sessions.insert(id, Arc::new(Mutex::new(session)));
        tracing::info!(session = %id, open = self.sessions.len(), "session opened");
        Ok(id)
    }

    /// Run `f` with exclusive access to a session. `None` if the session does
    /// not exist.
    pub fn with<R>(&self, id: SessionId, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        // Clone the handle so the map shard is not locked while `f` runs.
        let session = self.sessions.get(&id).map(|entry| Arc::clone(entry.value()))?;
        let mut guard = session.lock();
        Some(f(&mut guard))
    }

    /// Drop a session. Returns whether it existed.
    pub fn close(&self, id: SessionId) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            tracing::info!(session = %id, "session closed");
        }
        removed
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionPool")
            .field("config", &self.config)
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

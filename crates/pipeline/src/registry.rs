//! Handle table for host bindings
//!
//! Bindings see sessions only as opaque non-zero integers. Each entry is
//! locked on its own, so different sessions can be driven from different
//! threads while calls on one session are serialized.

use audx_config::SessionConfig;
use audx_core::{Error, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::engine::EngineStats;
use crate::session::{FeedOutput, StreamSession};

/// Opaque session identifier; 0 is never issued
pub type SessionHandle = u64;

/// Handle value reported to bindings when creation fails
pub const NULL_HANDLE: SessionHandle = 0;

pub struct SessionRegistry {
    sessions: DashMap<SessionHandle, Arc<Mutex<StreamSession>>>,
    next_handle: AtomicU64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn create(&self, config: &SessionConfig) -> Result<SessionHandle> {
        let session = StreamSession::create(config)?;
        Ok(self.insert(session))
    }

    /// Binding-style create: `NULL_HANDLE` on failure, error logged
    pub fn create_raw(&self, config: &SessionConfig) -> SessionHandle {
        match self.create(config) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    input_rate = config.input_sample_rate,
                    "Failed to create stream session"
                );
                NULL_HANDLE
            },
        }
    }

    /// Take ownership of an already built session
    pub fn insert(&self, session: StreamSession) -> SessionHandle {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.sessions.insert(handle, Arc::new(Mutex::new(session)));
        tracing::debug!(handle, "Session registered");
        handle
    }

    /// Remove and release a session; a second destroy fails
    pub fn destroy(&self, handle: SessionHandle) -> Result<()> {
        self.sessions
            .remove(&handle)
            .map(|_| tracing::debug!(handle, "Session destroyed"))
            .ok_or(Error::InvalidHandle(handle))
    }

    pub fn feed(&self, handle: SessionHandle, samples: &[i16]) -> Result<FeedOutput> {
        self.session(handle)?.lock().feed(samples)
    }

    pub fn flush(&self, handle: SessionHandle) -> Result<FeedOutput> {
        self.session(handle)?.lock().flush()
    }

    pub fn stats(&self, handle: SessionHandle) -> Result<EngineStats> {
        Ok(self.session(handle)?.lock().stats())
    }

    pub fn reset_stats(&self, handle: SessionHandle) -> Result<()> {
        self.session(handle)?.lock().reset_stats();
        Ok(())
    }

    pub fn contains(&self, handle: SessionHandle) -> bool {
        handle != NULL_HANDLE && self.sessions.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Clone the entry out so the map shard is unlocked before the session is
    fn session(&self, handle: SessionHandle) -> Result<Arc<Mutex<StreamSession>>> {
        if handle == NULL_HANDLE {
            return Err(Error::InvalidHandle(handle));
        }
        self.sessions
            .get(&handle)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(Error::InvalidHandle(handle))
    }
}

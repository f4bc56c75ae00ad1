//! One trigger cycle at a time per service identity.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::context::{ExecContext, Interrupted};

/// What a caller does when a cycle is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Wait for the running cycle, then proceed on the fresh window.
    Wait,
    /// Give up immediately.
    FailFast,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquireError {
    #[error("a trigger cycle is already running for {key:?}")]
    InProgress { key: String },

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

/// Held for the whole evaluate → build → publish → mark sequence.
#[derive(Debug)]
pub struct FlightGuard {
    _guard: OwnedMutexGuard<()>,
}

#[derive(Debug, Default)]
pub struct SingleFlight {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(
        &self,
        ctx: &ExecContext,
        key: &str,
        mode: LockMode,
    ) -> Result<FlightGuard, AcquireError> {
        // clone the handle so the map shard is not locked while waiting
        let lock = self.locks.entry(key.to_string()).or_default().clone();
        let guard = match mode {
            LockMode::Wait => ctx.run(lock.lock_owned()).await?,
            LockMode::FailFast => lock.try_lock_owned().map_err(|_| AcquireError::InProgress {
                key: key.to_string(),
            })?,
        };
        Ok(FlightGuard { _guard: guard })
    }
}

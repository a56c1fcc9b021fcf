//! Per-branch mutation locks
//!
//! The filesystem under a branch directory is shared state: a publish and a
//! remove racing on one branch can each scan, delete and rebuild against a
//! half-mutated view. Every mutating operation therefore holds its branch's
//! lock across the whole scan-mutate-rebuild sequence. Branches lock
//! independently, so traffic on one branch never stalls another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of per-branch exclusive locks, created on first touch.
#[derive(Clone, Default)]
pub struct BranchLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl BranchLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `branch`, waiting behind any holder.
    pub async fn lock(&self, branch: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(map.entry(branch.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}

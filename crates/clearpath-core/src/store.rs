//! The shared simulation state store.
//!
//! [`StateStore`] owns the one [`SimulationState`] in the process. Every
//! component holds it through an `Arc` and goes through its lock; readers
//! always receive copies, so no reference into the state outlives a call.
//!
//! Mutations that also broadcast should send from inside the
//! [`mutate`](StateStore::mutate) closure. Holding the write lock while
//! sending keeps the broadcast order identical to the mutation order, so a
//! client never sees an alert land after the `emergency_reset` that wiped
//! it.

use clearpath_types::SimulationState;
use tokio::sync::RwLock;

/// Lock-guarded owner of the simulation state.
#[derive(Debug, Default)]
pub struct StateStore {
    state: RwLock<SimulationState>,
}

impl StateStore {
    /// Create a store holding the idle default state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of the full state.
    pub async fn snapshot(&self) -> SimulationState {
        self.state.read().await.clone()
    }

    /// Run `f` against the state under the read lock.
    pub async fn read<R>(&self, f: impl FnOnce(&SimulationState) -> R) -> R {
        let guard = self.state.read().await;
        f(&guard)
    }

    /// Apply `f` to the state in place under the write lock and return its
    /// result.
    pub async fn mutate<R>(&self, f: impl FnOnce(&mut SimulationState) -> R) -> R {
        let mut guard = self.state.write().await;
        f(&mut guard)
    }
}

//! Vehicle state store
//!
//! One writer, many readers. Each update clones the current snapshot,
//! mutates the copy and swaps it in whole, so a reader never sees a
//! half-applied message. Every published snapshot is also broadcast in
//! order to subscribers.
//!
//! Mutation is crate-private: only the link session's receive task (and the
//! session itself, after that task has been joined) writes to the store.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::broadcast;

use super::VehicleState;

/// Default number of snapshots buffered per subscriber
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 256;

/// Shared, atomically swapped vehicle state
pub struct VehicleStore {
    current: ArcSwap<VehicleState>,
    updates: broadcast::Sender<Arc<VehicleState>>,
}

impl Default for VehicleStore {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_CAPACITY)
    }
}

impl VehicleStore {
    /// Create a store holding the default state
    ///
    /// # Arguments
    ///
    /// * `capacity` - Snapshots a subscriber may fall behind before it lags
    pub fn new(capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(capacity.max(1));
        Self {
            current: ArcSwap::from_pointee(VehicleState::default()),
            updates,
        }
    }

    /// Latest complete snapshot
    pub fn snapshot(&self) -> Arc<VehicleState> {
        self.current.load_full()
    }

    /// Receive every snapshot published from now on, in order.
    ///
    /// A subscriber that falls more than `capacity` snapshots behind gets
    /// `RecvError::Lagged` and resumes from the oldest retained one.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<VehicleState>> {
        self.updates.subscribe()
    }

    /// Apply `f` to a copy of the current state and publish the result.
    pub(crate) fn update(&self, f: impl FnOnce(&mut VehicleState)) {
        let mut next = VehicleState::clone(&self.current.load());
        f(&mut next);
        self.publish(next);
    }

    /// Apply a fallible change to a copy of the current state.
    ///
    /// The copy is published only when `f` returns `Ok(true)`; on `Ok(false)`
    /// or an error the current snapshot stays untouched.
    pub(crate) fn try_update<E>(
        &self,
        f: impl FnOnce(&mut VehicleState) -> Result<bool, E>,
    ) -> Result<bool, E> {
        let mut next = VehicleState::clone(&self.current.load());
        let changed = f(&mut next)?;
        if changed {
            self.publish(next);
        }
        Ok(changed)
    }

    /// Replace the state with defaults and publish it.
    pub(crate) fn reset(&self) {
        self.publish(VehicleState::default());
    }

    fn publish(&self, state: VehicleState) {
        let state = Arc::new(state);
        self.current.store(state.clone());
        // Err only means nobody is subscribed
        let _ = self.updates.send(state);
    }
}

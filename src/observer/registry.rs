use crate::observer::handle::{ObserverHandle, ObserverId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Set of currently connected observers.
///
/// Membership changes never block a broadcast: the hub iterates a
/// point-in-time `snapshot()` instead of the live map.
pub struct ObserverRegistry {
    observers: DashMap<ObserverId, ObserverHandle>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            observers: DashMap::new(),
        }
    }

    /// Register an observer. Re-adding a registered observer is a no-op.
    ///
    /// Returns true if the observer was newly added.
    pub(crate) fn add(&self, observer: ObserverHandle) -> bool {
        match self.observers.entry(observer.id()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(observer);
                true
            }
        }
    }

    /// Deregister an observer. Removing an absent observer is a no-op.
    ///
    /// Returns true only for the call that actually removed it, so racing
    /// removals (hub eviction vs. connection teardown) agree on a single winner.
    pub(crate) fn remove(&self, id: &ObserverId) -> bool {
        self.observers.remove(id).is_some()
    }

    /// Point-in-time copy of every registered handle
    pub fn snapshot(&self) -> Vec<ObserverHandle> {
        self.observers
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn contains(&self, id: &ObserverId) -> bool {
        self.observers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Drop every handle, returning how many were registered
    pub(crate) fn clear(&self) -> usize {
        let count = self.observers.len();
        self.observers.clear();
        count
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

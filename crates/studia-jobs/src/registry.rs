//! In-flight job registry.
//!
//! Tracks which records currently have a background job running so a second
//! trigger for the same record is rejected instead of queued behind the
//! first.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

/// Process-wide set of record ids with a job in flight.
///
/// Admission is a single test-and-set under one lock. The returned guard
/// removes the id again on drop, so a job that panics or is cancelled still
/// releases its slot.
#[derive(Clone, Default)]
pub struct InFlightRegistry {
    running: Arc<Mutex<HashSet<Uuid>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to admit `id`. Returns `None` when a job for it is already
    /// running.
    pub fn try_admit(&self, id: Uuid) -> Option<InFlightGuard> {
        let mut running = self
            .running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !running.insert(id) {
            return None;
        }
        Some(InFlightGuard {
            running: Arc::clone(&self.running),
            id,
        })
    }

    /// Whether a job for `id` is currently admitted.
    pub fn contains(&self, id: Uuid) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&id)
    }

    /// Number of jobs currently in flight.
    pub fn len(&self) -> usize {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases the admitted id when dropped.
pub struct InFlightGuard {
    running: Arc<Mutex<HashSet<Uuid>>>,
    id: Uuid,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_and_release_on_drop() {
        let registry = InFlightRegistry::new();
        let id = Uuid::new_v4();

        let guard = registry.try_admit(id).expect("first admit succeeds");
        assert!(registry.contains(id));
        assert_eq!(registry.len(), 1);

        drop(guard);
        assert!(!registry.contains(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_second_admit_rejected_while_held() {
        let registry = InFlightRegistry::new();
        let id = Uuid::new_v4();

        let _guard = registry.try_admit(id).expect("first admit succeeds");
        assert!(registry.try_admit(id).is_none());

        drop(_guard);
        assert!(registry.try_admit(id).is_some());
    }

    #[test]
    fn test_distinct_ids_are_independent() {
        let registry = InFlightRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let _guard_a = registry.try_admit(a).expect("admit a");
        let _guard_b = registry.try_admit(b).expect("admit b");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let registry = InFlightRegistry::new();
        let other = registry.clone();
        let id = Uuid::new_v4();

        let _guard = registry.try_admit(id).expect("admit");
        assert!(other.contains(id));
        assert!(other.try_admit(id).is_none());
    }

    #[test]
    fn test_guard_outlives_registry_handle() {
        let registry = InFlightRegistry::new();
        let id = Uuid::new_v4();

        let guard = registry.try_admit(id).expect("admit");
        let watcher = registry.clone();
        drop(registry);

        // The guard still holds the slot through the shared set.
        assert!(watcher.contains(id));
        drop(guard);
        assert!(!watcher.contains(id));
    }
}

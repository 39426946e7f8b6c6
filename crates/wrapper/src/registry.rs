use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::descriptor::ObjectKey;

/// Maps domain object identity to the live wrapper of that object.
///
/// Entries are weak, the registry keeps neither the wrapper nor the domain object alive.  Wrappers
/// evict their own entry when dropped, dead entries left behind by a race are swept when the map grows.
///
/// A wrapper must never be dropped while the registry lock is held, its `Drop` takes the lock.
pub(crate) struct Registry<V> {
    state: Mutex<RegistryState<V>>,
}

struct RegistryState<V> {
    entries: HashMap<ObjectKey, Weak<V>>,
    prune_at: usize,
}

impl<V> Registry<V> {
    const MIN_PRUNE_AT: usize = 64;

    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                entries: HashMap::new(),
                prune_at: Self::MIN_PRUNE_AT,
            }),
        }
    }

    /// Returns the live value for `key`, or registers the value built by `create`.
    ///
    /// `create` runs under the registry lock, so concurrent callers for the same key get the same value.
    pub fn get_or_insert_with(&self, key: ObjectKey, create: impl FnOnce() -> Arc<V>) -> Arc<V> {
        let mut state = self.state.lock();
        if let Some(existing) = state
            .entries
            .get(&key)
            .and_then(Weak::upgrade)
        {
            return existing;
        }

        let created = create();
        state
            .entries
            .insert(key, Arc::downgrade(&created));
        trace!("Registered wrapper. key: {}, entries: {}", key, state.entries.len());

        if state.entries.len() >= state.prune_at {
            Self::prune(&mut state);
        }
        created
    }

    /// Removes the entry for `key` if it still refers to `value`.
    pub fn evict(&self, key: ObjectKey, value: *const V) {
        let mut state = self.state.lock();
        if let Some(entry) = state.entries.get(&key) {
            if std::ptr::eq(entry.as_ptr(), value) {
                state.entries.remove(&key);
                trace!("Evicted wrapper. key: {}", key);
            }
        }
    }

    /// Removes every dead entry, returns how many were removed.
    pub fn purge(&self) -> usize {
        Self::prune(&mut self.state.lock())
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    fn prune(state: &mut RegistryState<V>) -> usize {
        let before = state.entries.len();
        // strong_count, not upgrade, an upgraded value dropped here could re-enter `evict`
        state
            .entries
            .retain(|_, entry| entry.strong_count() > 0);
        state.prune_at = (state.entries.len() * 2).max(Self::MIN_PRUNE_AT);
        before - state.entries.len()
    }
}

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::scope::Scope;
use crate::sentry::{Sentry, SentryId};

/// Identifies the backing sequence of an [`IndependentList`].
///
/// In-place edits keep the identity, [`IndependentList::replace`] starts a new one.  Consumers mirroring
/// the list use this to tell a structural edit from a wholesale replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListIdentity {
    pub list: SentryId,
    pub generation: u64,
}

/// An independent sequence with structural edits.
///
/// Every effective edit invalidates the computations that read the list.
///
/// Cloning an `IndependentList` creates a new handle to the **same** list.
pub struct IndependentList<T> {
    inner: Arc<ListInner<T>>,
}

struct ListInner<T> {
    sentry: Sentry,
    state: Mutex<ListState<T>>,
}

struct ListState<T> {
    items: Vec<T>,
    generation: u64,
}

impl<T> Clone for IndependentList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> IndependentList<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            inner: Arc::new(ListInner {
                sentry: Sentry::new(),
                state: Mutex::new(ListState {
                    items,
                    generation: 0,
                }),
            }),
        }
    }

    pub fn sentry(&self) -> &Sentry {
        &self.inner.sentry
    }

    pub fn with<R>(&self, scope: &Scope<'_>, f: impl FnOnce(&[T]) -> R) -> R {
        scope.record(&self.inner.sentry);
        let state = self.inner.state.lock();
        f(&state.items)
    }

    pub fn len(&self, scope: &Scope<'_>) -> usize {
        self.with(scope, <[T]>::len)
    }

    pub fn is_empty(&self, scope: &Scope<'_>) -> bool {
        self.with(scope, <[T]>::is_empty)
    }

    pub fn identity(&self, scope: &Scope<'_>) -> ListIdentity {
        scope.record(&self.inner.sentry);
        ListIdentity {
            list: self.inner.sentry.id(),
            generation: self.inner.state.lock().generation,
        }
    }

    pub fn push(&self, item: T) {
        self.edit("push", |state| state.items.push(item));
    }

    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&self, index: usize, item: T) {
        self.edit("insert", |state| state.items.insert(index, item));
    }

    /// Returns `None`, without invalidating dependents, if `index` is out of bounds.
    pub fn remove(&self, index: usize) -> Option<T> {
        let removed = {
            let mut state = self.inner.state.lock();
            if index >= state.items.len() {
                return None;
            }
            state.items.remove(index)
        };
        trace!("Edited list. list: {}, edit: remove, index: {}", self.inner.sentry.id(), index);
        self.inner.sentry.invalidate();
        Some(removed)
    }

    pub fn clear(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.items.is_empty() {
                return;
            }
            state.items.clear();
        }
        self.inner.sentry.invalidate();
    }

    /// Replaces the whole backing sequence.
    pub fn replace(&self, items: Vec<T>) {
        self.edit("replace", |state| {
            state.items = items;
            state.generation += 1;
        });
    }

    fn edit(&self, edit: &str, f: impl FnOnce(&mut ListState<T>)) {
        {
            let mut state = self.inner.state.lock();
            f(&mut state);
        }
        trace!("Edited list. list: {}, edit: {}", self.inner.sentry.id(), edit);
        self.inner.sentry.invalidate();
    }
}

impl<T: Clone + Send + 'static> IndependentList<T> {
    pub fn get(&self, scope: &Scope<'_>) -> Vec<T> {
        self.with(scope, <[T]>::to_vec)
    }
}

impl<T: PartialEq + Send + 'static> IndependentList<T> {
    /// Replaces the item at `index`.  Writing an equal item is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&self, index: usize, item: T) -> bool {
        {
            let mut state = self.inner.state.lock();
            if state.items[index] == item {
                return false;
            }
            state.items[index] = item;
        }
        self.inner.sentry.invalidate();
        true
    }
}

impl<T: Send + 'static> Default for IndependentList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> FromIterator<T> for IndependentList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: Debug> Debug for IndependentList<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("IndependentList")
            .field("sentry", &self.inner.sentry.id())
            .field("generation", &state.generation)
            .field("items", &state.items)
            .finish()
    }
}

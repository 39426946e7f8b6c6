use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::scope::Scope;
use crate::sentry::Sentry;

/// A thread-safe container for state that can be written directly.
///
/// Reads made through a recording [`Scope`] make the running computation depend on this value; writes
/// that change the value invalidate every such computation.
///
/// Cloning an `Independent` creates a new handle to the **same** value.
pub struct Independent<T> {
    inner: Arc<IndependentInner<T>>,
}

struct IndependentInner<T> {
    sentry: Sentry,
    value: Mutex<T>,
}

impl<T> Clone for Independent<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Independent<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(IndependentInner {
                sentry: Sentry::new(),
                value: Mutex::new(value),
            }),
        }
    }

    pub fn sentry(&self) -> &Sentry {
        &self.inner.sentry
    }

    /// Gives `f` access to the current value, recording the read in `scope`.
    pub fn with<R>(&self, scope: &Scope<'_>, f: impl FnOnce(&T) -> R) -> R {
        scope.record(&self.inner.sentry);
        let value = self.inner.value.lock();
        f(&value)
    }

    /// Changes the value in place and unconditionally invalidates dependents.
    pub fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut value = self.inner.value.lock();
            f(&mut value)
        };
        self.inner.sentry.invalidate();
        result
    }

    /// `true` while at least one computation depends on this value.
    pub fn has_dependents(&self) -> bool {
        self.inner.sentry.has_subscribers()
    }

    /// Like [`Independent::set`], for values without `PartialEq` or with a looser notion of equality.
    pub fn set_by(&self, value: T, same: impl FnOnce(&T, &T) -> bool) -> bool {
        {
            let mut current = self.inner.value.lock();
            if same(&*current, &value) {
                trace!("Ignoring write of unchanged value. sentry: {}", self.inner.sentry.id());
                return false;
            }
            *current = value;
        }
        // the value lock must be released first, dependents may read the new value while being invalidated.
        self.inner.sentry.invalidate();
        true
    }
}

impl<T: Clone + Send + 'static> Independent<T> {
    pub fn get(&self, scope: &Scope<'_>) -> T {
        self.with(scope, T::clone)
    }
}

impl<T: PartialEq + Send + 'static> Independent<T> {
    /// Stores `value` and invalidates dependents.
    ///
    /// Writing a value equal to the current one is a no-op, no dependents are invalidated.
    /// Returns `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        self.set_by(value, T::eq)
    }
}

impl<T: Default + Send + 'static> Default for Independent<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Debug> Debug for Independent<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Independent")
            .field("sentry", &self.inner.sentry.id())
            .field("value", &*self.inner.value.lock())
            .finish()
    }
}

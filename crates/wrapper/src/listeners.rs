use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracking::TrackingError;

use crate::collection::CollectionEdit;
use crate::instance::InstanceId;
use crate::value::ProxyValue;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for ListenerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "l{}", self.0)
    }
}

/// The externally visible value of a member changed.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChanged {
    pub instance: InstanceId,
    pub member: String,
    pub value: ProxyValue,
}

/// The items of a collection member changed.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionChanged {
    pub instance: InstanceId,
    pub member: String,
    pub edits: Vec<CollectionEdit>,
}

/// Recomputing a member failed, the last delivered value stays in place.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyFailed {
    pub instance: InstanceId,
    pub member: String,
    pub error: TrackingError,
}

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

pub(crate) struct Listeners<E> {
    callbacks: Mutex<Vec<(ListenerId, Callback<E>)>>,
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId::next();
        self.callbacks
            .lock()
            .push((id, Arc::new(callback)));
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut callbacks = self.callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|(candidate, _)| *candidate != id);
        callbacks.len() != before
    }

    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    /// Callbacks run without the lock held, so they may add or remove listeners.
    pub fn emit(&self, event: &E) {
        let callbacks: Vec<Callback<E>> = self
            .callbacks
            .lock()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }
}

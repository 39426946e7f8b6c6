use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::trace;

static NEXT_SENTRY_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_DEPENDENT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SentryId(u64);

impl SentryId {
    fn next() -> Self {
        Self(NEXT_SENTRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for SentryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Identifies a computation that can subscribe to sentries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependentId(u64);

impl DependentId {
    pub(crate) fn next() -> Self {
        Self(NEXT_DEPENDENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for DependentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// Something that must be told when a sentry it read has been invalidated.
///
/// Implementations must only mark themselves stale, recomputation is always deferred to the next read.
/// Anything downstream is queued on the [`Propagation`] rather than invalidated directly, so arbitrarily
/// long chains are invalidated without recursion.
pub trait Subscriber: Send + Sync {
    fn invalidate(&self, propagation: &mut Propagation);
}

pub type Notification = Arc<dyn Fn() + Send + Sync>;

/// Work gathered while invalidating, processed breadth first.
#[derive(Default)]
pub struct Propagation {
    sentries: VecDeque<Sentry>,
    notifications: Vec<Notification>,
}

impl Propagation {
    /// Queues `sentry`, its subscribers are invalidated in turn.
    pub fn invalidate(&mut self, sentry: &Sentry) {
        self.sentries.push_back(sentry.clone());
    }

    /// Queues `notification`, called once everything reachable has been marked stale.
    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub(crate) fn run(mut self) {
        let mut sentries = 0_usize;
        while let Some(sentry) = self.sentries.pop_front() {
            sentries += 1;
            for subscriber in sentry.take_subscribers() {
                subscriber.invalidate(&mut self);
            }
        }
        if sentries > 1 {
            trace!(
                "Propagated invalidation. sentries: {}, notifications: {}",
                sentries,
                self.notifications.len()
            );
        }

        for notification in self.notifications {
            notification();
        }
    }
}

/// A dependency cell.
///
/// Every piece of trackable state owns one sentry.  Computations that read the state while recording
/// subscribe to the sentry, and are invalidated when the state changes.
///
/// Cloning a `Sentry` creates a new handle to the **same** cell.
#[derive(Clone)]
pub struct Sentry {
    inner: Arc<SentryInner>,
}

struct SentryInner {
    id: SentryId,
    /// Bumped before subscribers are notified, so a reader can detect a write that raced its read.
    epoch: AtomicU64,
    subscribers: Mutex<Subscribers>,
}

/// Dead entries are left in place until the table doubles, or the sentry is invalidated.
struct Subscribers {
    entries: IndexMap<DependentId, Weak<dyn Subscriber>>,
    sweep_at: usize,
}

impl Subscribers {
    const MIN_SWEEP_AT: usize = 64;

    fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            sweep_at: Self::MIN_SWEEP_AT,
        }
    }

    fn sweep(&mut self) {
        self.entries
            .retain(|_, subscriber| subscriber.strong_count() > 0);
        self.sweep_at = (self.entries.len() * 2).max(Self::MIN_SWEEP_AT);
    }
}

impl Sentry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SentryInner {
                id: SentryId::next(),
                epoch: AtomicU64::new(0),
                subscribers: Mutex::new(Subscribers::new()),
            }),
        }
    }

    pub fn id(&self) -> SentryId {
        self.inner.id
    }

    pub fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::Acquire)
    }

    /// Returns `true` if the subscriber was added, `false` if it was already subscribed.
    pub fn subscribe(&self, id: DependentId, subscriber: Weak<dyn Subscriber>) -> bool {
        let mut subscribers = self.inner.subscribers.lock();
        if subscribers.entries.contains_key(&id) {
            return false;
        }
        if subscribers.entries.len() >= subscribers.sweep_at {
            subscribers.sweep();
        }
        subscribers
            .entries
            .insert(id, subscriber);
        true
    }

    pub fn unsubscribe(&self, id: DependentId) {
        self.inner
            .subscribers
            .lock()
            .entries
            .swap_remove(&id);
    }

    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .entries
            .values()
            .filter(|subscriber| subscriber.strong_count() > 0)
            .count()
    }

    /// Invalidates every current subscriber, and everything downstream of them, and clears the
    /// subscriber set.
    ///
    /// Subscribers re-subscribe when they are next recomputed.
    pub fn invalidate(&self) {
        let mut propagation = Propagation::default();
        propagation.invalidate(self);
        propagation.run();
    }

    /// Bumps the epoch and removes the live subscribers.
    fn take_subscribers(&self) -> Vec<Arc<dyn Subscriber>> {
        self.inner
            .epoch
            .fetch_add(1, Ordering::AcqRel);

        let entries = {
            let mut subscribers = self.inner.subscribers.lock();
            subscribers.sweep_at = Subscribers::MIN_SWEEP_AT;
            std::mem::take(&mut subscribers.entries)
        };
        trace!("Invalidating sentry. sentry: {}, subscribers: {}", self.inner.id, entries.len());

        // the lock is released before notifying, subscribers may read or subscribe to this sentry again.
        entries
            .into_values()
            .filter_map(|subscriber| subscriber.upgrade())
            .collect()
    }
}

impl Default for Sentry {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Sentry {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Sentry {}

impl std::fmt::Debug for Sentry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sentry")
            .field("id", &self.inner.id)
            .field("epoch", &self.epoch())
            .finish()
    }
}

//! Marshals invalidations, which may happen on any thread, to the thread that owns the UI.
//!
//! Invalidated members are recorded in an insertion-ordered pending set keyed by (instance, member), so
//! several writes before the next drain result in a single update that sees the latest value.  A bounded
//! channel with capacity 1 wakes the UI thread; a full channel means a wake-up is already pending.

use std::sync::Weak;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::instance::InstanceId;

/// Work deferred to the UI thread.
pub trait DeferredUpdate: Send + Sync {
    fn update_now(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpdateKey {
    pub instance: InstanceId,
    pub member: usize,
}

pub struct Dispatcher {
    pending: Mutex<IndexMap<UpdateKey, Weak<dyn DeferredUpdate>>>,
    wake_sender: Sender<()>,
    wake_receiver: Receiver<()>,
    max_passes: usize,
}

impl Dispatcher {
    pub fn new(max_passes: usize) -> Self {
        let (wake_sender, wake_receiver) = crossbeam_channel::bounded(1);
        Self {
            pending: Mutex::new(IndexMap::new()),
            wake_sender,
            wake_receiver,
            max_passes: max_passes.max(1),
        }
    }

    /// Records `update` for the next drain.  Scheduling a key that is already pending keeps its position.
    pub fn schedule(&self, key: UpdateKey, update: Weak<dyn DeferredUpdate>) {
        let inserted = {
            let mut pending = self.pending.lock();
            match pending.contains_key(&key) {
                true => false,
                false => {
                    pending.insert(key, update);
                    true
                }
            }
        };
        trace!(
            "Scheduled update. instance: {}, member: {}, coalesced: {}",
            key.instance, key.member, !inserted
        );
        self.wake();
    }

    fn wake(&self) {
        // a full channel already holds a wake-up, the receiver lives as long as the dispatcher
        let _ = self.wake_sender.try_send(());
    }

    /// Runs pending updates on the calling thread until none remain, or the pass limit is reached.
    ///
    /// Updates scheduled while draining run in a later pass of the same drain.  Returns the number of
    /// updates that ran.
    pub fn drain(&self) -> usize {
        while self.wake_receiver.try_recv().is_ok() {}

        let mut ran = 0;
        for pass in 0..self.max_passes {
            let batch = std::mem::take(&mut *self.pending.lock());
            if batch.is_empty() {
                return ran;
            }
            trace!("Draining updates. pass: {}, count: {}", pass, batch.len());
            for (_key, update) in batch {
                if let Some(update) = update.upgrade() {
                    update.update_now();
                    ran += 1;
                }
            }
        }

        let remaining = self.pending();
        if remaining > 0 {
            warn!(
                "Pass limit reached while draining, deferring remaining updates. passes: {}, remaining: {}",
                self.max_passes, remaining
            );
            self.wake();
        }
        ran
    }

    /// Blocks until an update is scheduled or `timeout` elapses.  Returns `true` if updates are pending.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.pending() > 0 {
            return true;
        }
        let _ = self.wake_receiver.recv_timeout(timeout);
        self.pending() > 0
    }

    /// A receiver that becomes ready whenever updates are scheduled, for use in a `select!` loop.
    pub fn wake_receiver(&self) -> Receiver<()> {
        self.wake_receiver.clone()
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    struct Counting {
        runs: AtomicUsize,
    }

    impl DeferredUpdate for Counting {
        fn update_now(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn key(member: usize) -> UpdateKey {
        UpdateKey {
            instance: InstanceId::next(),
            member,
        }
    }

    fn counting() -> Arc<Counting> {
        Arc::new(Counting {
            runs: AtomicUsize::new(0),
        })
    }

    #[test]
    fn repeated_schedules_are_coalesced() {
        // given
        let dispatcher = Dispatcher::new(4);
        let update = counting();
        let key = key(0);

        // when
        for _ in 0..3 {
            dispatcher.schedule(key, Arc::downgrade(&update) as Weak<dyn DeferredUpdate>);
        }
        let ran = dispatcher.drain();

        // then
        assert_eq!(ran, 1);
        assert_eq!(update.runs.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.pending(), 0);
    }

    #[test]
    fn dropped_updates_are_skipped() {
        // given
        let dispatcher = Dispatcher::new(4);
        let update = counting();
        dispatcher.schedule(key(0), Arc::downgrade(&update) as Weak<dyn DeferredUpdate>);

        // when
        drop(update);
        let ran = dispatcher.drain();

        // then
        assert_eq!(ran, 0);
    }

    #[test]
    fn schedule_from_another_thread_wakes_waiter() {
        // given
        let dispatcher = Arc::new(Dispatcher::new(4));
        let update = counting();

        // when
        let scheduler = {
            let dispatcher = dispatcher.clone();
            let weak = Arc::downgrade(&update) as Weak<dyn DeferredUpdate>;
            thread::spawn(move || dispatcher.schedule(key(1), weak))
        };
        scheduler.join().expect("scheduler panicked");
        let woken = dispatcher.wait_timeout(Duration::from_secs(5));

        // then
        assert!(woken);
        assert_eq!(dispatcher.drain(), 1);
        assert!(!dispatcher.wait_timeout(Duration::from_millis(10)));
    }

    struct Rescheduling {
        dispatcher: Arc<Dispatcher>,
        this: Weak<Rescheduling>,
        runs: AtomicUsize,
    }

    impl DeferredUpdate for Rescheduling {
        fn update_now(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.dispatcher
                .schedule(key(0), self.this.clone() as Weak<dyn DeferredUpdate>);
        }
    }

    #[test]
    fn pass_limit_bounds_a_drain() {
        // given
        let dispatcher = Arc::new(Dispatcher::new(3));
        let update = Arc::new_cyclic(|this| Rescheduling {
            dispatcher: dispatcher.clone(),
            this: this.clone(),
            runs: AtomicUsize::new(0),
        });
        dispatcher.schedule(key(0), Arc::downgrade(&update) as Weak<dyn DeferredUpdate>);

        // when
        let ran = dispatcher.drain();

        // then
        assert_eq!(ran, 3);
        assert_eq!(update.runs.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.pending(), 1);
        assert!(dispatcher.wait_timeout(Duration::from_millis(10)));
    }
}

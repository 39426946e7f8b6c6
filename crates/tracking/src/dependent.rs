#![forbid(unsafe_code)]

//! Lazily computed values that discover their own dependencies.
//!
//! # Design
//!
//! A [`Dependent<T>`] owns a computation, a cached result and an output [`Sentry`].  The computation
//! receives a recording [`Scope`]; every independent value or dependent it reads through that scope
//! becomes a precedent.  When any precedent is invalidated the dependent is marked invalid and
//! invalidates its own output sentry, so staleness propagates through the whole graph without
//! recomputing anything.  The next read recomputes.
//!
//! # Invariants
//!
//! 1. A read of a valid dependent returns the cache without running the computation.
//! 2. After a recomputation the precedent set is exactly the set of sentries read by that recomputation,
//!    swapped in only once the computation has finished.
//! 3. A write that races a recomputation is never lost: each read carries the epoch of its sentry, and
//!    if any epoch moved before the swap completed the dependent invalidates itself again.
//! 4. `version` increments by 1 per successful recomputation.
//!
//! # Failure modes
//!
//! - **Computation returns an error**: the last good value stays cached, the status becomes
//!   [`DependentStatus::Failed`] and reads return the error until a precedent changes.
//! - **Cycle**: re-entering a dependent that is already being computed fails with
//!   [`TrackingError::CyclicDependency`].
//! - **Too deep**: a chain of recomputations nested deeper than the scope allows fails with
//!   [`TrackingError::DepthExceeded`].  The depth belongs to the read, not to the dependent, so the
//!   failure is retried by the next read, which may come from a shallower scope.

use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::TrackingError;
use crate::scope::{RecordedRead, Recorder, Scope};
use crate::sentry::{DependentId, Notification, Propagation, Sentry, Subscriber};

type Computation<T> = Box<dyn Fn(&Scope<'_>) -> anyhow::Result<T> + Send + Sync>;

/// The result of reading a dependent.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation<T> {
    pub value: T,
    /// `true` if this read recomputed the value and the result differs from the previous cache.
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DependentStatus {
    /// Never computed, or invalidated since the last computation.
    Invalid,
    Valid,
    /// The last computation failed, the cache holds the last good value.
    Failed(TrackingError),
}

/// A lazily-evaluated, memoized value computed from other trackable state.
///
/// Cloning a `Dependent` creates a new handle to the **same** computation.
pub struct Dependent<T> {
    inner: Arc<DependentInner<T>>,
}

struct DependentInner<T> {
    id: DependentId,
    label: String,
    sentry: Sentry,
    compute: Computation<T>,
    valid: AtomicBool,
    state: Mutex<DependentState<T>>,
    listeners: Mutex<Vec<Notification>>,
}

struct DependentState<T> {
    cached: Option<T>,
    failure: Option<TrackingError>,
    precedents: Vec<Sentry>,
    version: u64,
}

impl<T> Clone for Dependent<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Dependent<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// Creates a dependent from an infallible computation.
    pub fn new(label: impl Into<String>, compute: impl Fn(&Scope<'_>) -> T + Send + Sync + 'static) -> Self {
        Self::try_new(label, move |scope| Ok(compute(scope)))
    }

    /// Creates a dependent from a computation that may fail.
    ///
    /// The computation is not run until the first read.
    pub fn try_new(
        label: impl Into<String>,
        compute: impl Fn(&Scope<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(DependentInner {
                id: DependentId::next(),
                label: label.into(),
                sentry: Sentry::new(),
                compute: Box::new(compute),
                valid: AtomicBool::new(false),
                state: Mutex::new(DependentState {
                    cached: None,
                    failure: None,
                    precedents: Vec::new(),
                    version: 0,
                }),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> DependentId {
        self.inner.id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// The sentry representing this computation's output.
    pub fn sentry(&self) -> &Sentry {
        &self.inner.sentry
    }

    pub fn get(&self, scope: &Scope<'_>) -> Result<T, TrackingError> {
        self.evaluate(scope)
            .map(|evaluation| evaluation.value)
    }

    /// Reads the value, recomputing it first if it is invalid.
    ///
    /// The read is recorded in `scope`, so a computation reading this dependent depends on it.
    pub fn evaluate(&self, scope: &Scope<'_>) -> Result<Evaluation<T>, TrackingError> {
        let inner = &self.inner;
        scope.record(&inner.sentry);

        if inner.valid.load(Ordering::Acquire) {
            let state = inner.state.lock();
            match (&state.failure, &state.cached) {
                (Some(failure), _) if failure.is_depth_exceeded() => {}
                (Some(failure), _) => return Err(failure.clone()),
                (None, Some(value)) => {
                    return Ok(Evaluation {
                        value: value.clone(),
                        changed: false,
                    });
                }
                (None, None) => {}
            }
        }

        let recorder = Recorder::new();
        let result = {
            let nested = scope.enter(inner.id, &inner.label, &recorder)?;
            trace!("Recomputing dependent. dependent: '{}', depth: {}", inner.label, nested.depth());
            (inner.compute)(&nested)
        };
        let reads = recorder.finish();

        let outcome = {
            let mut state = inner.state.lock();
            self.swap_precedents(&mut state, &reads);

            let outcome = match result {
                Ok(value) => {
                    let changed = state.cached.as_ref() != Some(&value);
                    state.cached = Some(value.clone());
                    state.failure = None;
                    state.version += 1;
                    Ok(Evaluation {
                        value,
                        changed,
                    })
                }
                Err(error) => {
                    let error = TrackingError::from_computation(&inner.label, error);
                    debug!("Computation failed. dependent: '{}', error: {}", inner.label, error);
                    state.failure = Some(error.clone());
                    Err(error)
                }
            };
            inner.valid.store(true, Ordering::Release);
            outcome
        };

        if reads.iter().any(RecordedRead::is_stale) {
            debug!("Precedent changed during recomputation. dependent: '{}'", inner.label);
            inner.mark_invalid();
        }

        outcome
    }

    fn swap_precedents(&self, state: &mut DependentState<T>, reads: &[RecordedRead]) {
        let inner = &self.inner;
        for previous in state.precedents.iter() {
            if !reads
                .iter()
                .any(|read| read.sentry == *previous)
            {
                previous.unsubscribe(inner.id);
            }
        }

        let subscriber: Weak<dyn Subscriber> = Arc::downgrade(&self.inner) as Weak<dyn Subscriber>;
        for read in reads {
            read.sentry
                .subscribe(inner.id, subscriber.clone());
        }

        state.precedents = reads
            .iter()
            .map(|read| read.sentry.clone())
            .collect();
    }

    /// Marks the value stale.  Nothing is recomputed until the next read.
    pub fn invalidate(&self) {
        self.inner.mark_invalid();
    }

    pub fn is_valid(&self) -> bool {
        self.inner.valid.load(Ordering::Acquire)
    }

    pub fn status(&self) -> DependentStatus {
        let state = self.inner.state.lock();
        match (&state.failure, self.is_valid()) {
            (Some(failure), true) => DependentStatus::Failed(failure.clone()),
            (_, true) => DependentStatus::Valid,
            (_, false) => DependentStatus::Invalid,
        }
    }

    /// The last successfully computed value, without recomputing or recording a read.
    pub fn cached(&self) -> Option<T> {
        self.inner.state.lock().cached.clone()
    }

    /// Number of successful recomputations so far.
    pub fn version(&self) -> u64 {
        self.inner.state.lock().version
    }

    /// Number of sentries read by the last computation.
    pub fn precedent_count(&self) -> usize {
        self.inner.state.lock().precedents.len()
    }

    /// Registers `listener` to be called, on the invalidating thread, each time this dependent goes
    /// from valid to invalid.
    ///
    /// Listeners run once the whole invalidation has propagated, never while it is in progress.
    pub fn on_invalidated(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.inner
            .listeners
            .lock()
            .push(Arc::new(listener));
    }

    /// Drops every subscription and marks the value invalid.
    pub fn detach(&self) {
        let precedents = std::mem::take(&mut self.inner.state.lock().precedents);
        for precedent in precedents {
            precedent.unsubscribe(self.inner.id);
        }
        self.invalidate();
    }
}

impl<T: Send> DependentInner<T> {
    fn mark_invalid(&self) {
        let mut propagation = Propagation::default();
        Subscriber::invalidate(self, &mut propagation);
        propagation.run();
    }
}

impl<T: Send> Subscriber for DependentInner<T> {
    fn invalidate(&self, propagation: &mut Propagation) {
        if !self.valid.swap(false, Ordering::AcqRel) {
            return;
        }
        trace!("Invalidated dependent. dependent: '{}'", self.label);

        propagation.invalidate(&self.sentry);
        for listener in self.listeners.lock().iter() {
            propagation.notify(listener.clone());
        }
    }
}

impl<T: Debug> Debug for Dependent<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Dependent")
            .field("label", &self.inner.label)
            .field("valid", &self.inner.valid.load(Ordering::Acquire))
            .field("cached", &state.cached)
            .field("failure", &state.failure)
            .field("version", &state.version)
            .finish()
    }
}

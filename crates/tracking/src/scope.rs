//! Dependency recording.
//!
//! A [`Scope`] is passed explicitly into every read of trackable state.  While a dependent is being
//! computed, the scope it hands to its computation is bound to a [`Recorder`] which collects the
//! sentries that were read.  Outside any computation an untracked scope is used and reads are not
//! recorded.

use std::cell::RefCell;

use indexmap::IndexMap;

use crate::config::TrackingConfig;
use crate::error::TrackingError;
use crate::sentry::{DependentId, Sentry, SentryId};

/// A sentry read during a recording session, with the epoch it had at the time of the read.
#[derive(Debug, Clone)]
pub struct RecordedRead {
    pub sentry: Sentry,
    pub epoch: u64,
}

impl RecordedRead {
    pub fn is_stale(&self) -> bool {
        self.sentry.epoch() != self.epoch
    }
}

/// Collects the read-set of one recomputation.
#[derive(Debug, Default)]
pub struct Recorder {
    reads: RefCell<IndexMap<SentryId, RecordedRead>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, sentry: &Sentry) {
        self.reads
            .borrow_mut()
            .entry(sentry.id())
            .or_insert_with(|| RecordedRead {
                // the epoch is taken before the caller reads the value
                epoch: sentry.epoch(),
                sentry: sentry.clone(),
            });
    }

    pub fn len(&self) -> usize {
        self.reads.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.borrow().is_empty()
    }

    /// Consumes the recorder, returning the reads in the order they were first made.
    pub fn finish(self) -> Vec<RecordedRead> {
        self.reads
            .into_inner()
            .into_values()
            .collect()
    }
}

/// The dynamic extent in which reads are attributed to a computation.
///
/// Scopes nest; each nested scope knows the chain of computations that are currently running on the
/// calling thread, which is what cycle detection walks.
pub struct Scope<'a> {
    recorder: Option<&'a Recorder>,
    parent: Option<&'a Scope<'a>>,
    computing: Option<DependentId>,
    depth: usize,
    max_depth: usize,
}

impl Scope<'static> {
    /// A scope that records nothing, for reads made outside any computation.
    pub fn untracked() -> Self {
        Self::with_max_depth(TrackingConfig::DEFAULT_MAX_DEPTH)
    }

    pub fn with_config(config: &TrackingConfig) -> Self {
        Self::with_max_depth(config.max_depth)
    }

    fn with_max_depth(max_depth: usize) -> Self {
        Self {
            recorder: None,
            parent: None,
            computing: None,
            depth: 0,
            max_depth,
        }
    }
}

impl<'a> Scope<'a> {
    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Records a read of `sentry`.  No-op in an untracked scope.
    pub fn record(&self, sentry: &Sentry) {
        if let Some(recorder) = self.recorder {
            recorder.record(sentry);
        }
    }

    /// Starts recording for the computation `id`.
    ///
    /// Fails with [`TrackingError::CyclicDependency`] if `id` is already being computed further up the
    /// chain, and with [`TrackingError::DepthExceeded`] if the chain would exceed the configured depth.
    pub fn enter<'b>(
        &'b self,
        id: DependentId,
        label: &str,
        recorder: &'b Recorder,
    ) -> Result<Scope<'b>, TrackingError> {
        let depth = self.depth + 1;
        if self.is_computing(id) {
            return Err(TrackingError::CyclicDependency {
                dependent: label.to_string(),
                depth,
            });
        }
        if depth > self.max_depth {
            return Err(TrackingError::DepthExceeded {
                dependent: label.to_string(),
                depth,
            });
        }

        Ok(Scope {
            recorder: Some(recorder),
            parent: Some(self),
            computing: Some(id),
            depth,
            max_depth: self.max_depth,
        })
    }

    fn is_computing(&self, id: DependentId) -> bool {
        let mut current = Some(self);
        while let Some(scope) = current {
            if scope.computing == Some(id) {
                return true;
            }
            current = scope.parent;
        }
        false
    }
}

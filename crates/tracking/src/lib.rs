//! Thread-safe dependency tracking.
//!
//! This crate provides the change-tracking graph that the view wrapper is built on:
//!
//! - [`Independent<T>`]: state that can be written directly, the root of every change
//! - [`IndependentList<T>`]: an independent sequence with structural edits
//! - [`Dependent<T>`]: a lazily recomputed value that discovers what it reads
//! - [`Sentry`]: the dependency cell behind every trackable value
//! - [`Scope`]: the explicit recording context passed into every read
//!
//! # Example
//!
//! ```rust
//! use tracking::{Dependent, Independent, Scope};
//!
//! let count = Independent::new(0);
//!
//! let is_empty = {
//!     let count = count.clone();
//!     Dependent::new("is_empty", move |scope| count.get(scope) == 0)
//! };
//!
//! let scope = Scope::untracked();
//! assert_eq!(is_empty.get(&scope).unwrap(), true);
//!
//! // the write only marks `is_empty` stale, it is recomputed by the next read
//! count.set(1);
//! assert!(!is_empty.is_valid());
//! assert_eq!(is_empty.get(&scope).unwrap(), false);
//! ```

pub mod config;
pub mod dependent;
pub mod error;
pub mod independent;
pub mod list;
pub mod scope;
pub mod sentry;

pub use config::TrackingConfig;
pub use dependent::{Dependent, DependentStatus, Evaluation};
pub use error::TrackingError;
pub use independent::Independent;
pub use list::{IndependentList, ListIdentity};
pub use scope::{RecordedRead, Recorder, Scope};
pub use sentry::{DependentId, Notification, Propagation, Sentry, SentryId, Subscriber};

//! Observable proxies for plain domain objects.
//!
//! Domain objects keep their state in [`tracking`] cells and describe their bindable members with a
//! [`TypeDescriptor`].  A [`ForView`] wraps them in [`ObjectInstance`] proxies that a UI can read, write
//! and subscribe to.  Proxies discover what each member depends on while reading it, so any write to
//! that state, from any thread, results in a change notification delivered when the UI thread drains
//! the [`Dispatcher`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, OnceLock};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use tracking::Independent;
//! use wrapper::{DomainObject, ForView, ProxyValue, TypeDescriptor};
//!
//! struct Basket {
//!     count: Independent<i64>,
//! }
//!
//! impl DomainObject for Basket {
//!     fn descriptor() -> Arc<TypeDescriptor> {
//!         static DESCRIPTOR: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
//!         DESCRIPTOR
//!             .get_or_init(|| {
//!                 TypeDescriptor::builder::<Basket>("Basket")
//!                     .independent("Count", |basket| &basket.count)
//!                     .computed("IsEmpty", |basket, scope| Ok(basket.count.get(scope) == 0))
//!                     .build()
//!             })
//!             .clone()
//!     }
//! }
//!
//! let basket = Arc::new(Basket { count: Independent::new(0) });
//! let view = ForView::new();
//! let proxy = view.wrap(&basket);
//!
//! assert_eq!(proxy.get_value("IsEmpty").unwrap(), ProxyValue::from(true));
//!
//! let notified = Arc::new(AtomicUsize::new(0));
//! {
//!     let notified = notified.clone();
//!     proxy
//!         .on_property_changed("IsEmpty", move |_| {
//!             notified.fetch_add(1, Ordering::SeqCst);
//!         })
//!         .unwrap();
//! }
//!
//! basket.count.set(1);
//! view.drain();
//!
//! assert_eq!(notified.load(Ordering::SeqCst), 1);
//! assert_eq!(proxy.get_value("IsEmpty").unwrap(), ProxyValue::from(false));
//! ```

mod atom;
pub mod collection;
pub mod config;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod instance;
pub mod listeners;
mod registry;
pub mod value;
pub mod view;

pub use collection::CollectionEdit;
pub use config::WrapperConfig;
pub use descriptor::{
    DomainObject, DomainRef, MemberAccess, MemberDescriptor, MemberKind, MemberSource, ObjectKey, TypeDescriptor,
    TypeDescriptorBuilder,
};
pub use dispatcher::{DeferredUpdate, Dispatcher, UpdateKey};
pub use error::WrapperError;
pub use instance::{InstanceId, ObjectInstance};
pub use listeners::{CollectionChanged, ListenerId, PropertyChanged, PropertyFailed};
pub use value::{BindValue, DomainSequence, DomainValue, Mismatch, Primitive, ProxyValue};
pub use view::ForView;

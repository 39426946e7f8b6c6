use std::sync::Arc;

use tracing::debug;
use tracking::Scope;

use crate::config::WrapperConfig;
use crate::descriptor::{DomainObject, DomainRef};
use crate::dispatcher::Dispatcher;
use crate::error::WrapperError;
use crate::instance::{ObjectInstance, ObjectInstanceInner};
use crate::registry::Registry;
use crate::value::{DomainSequence, DomainValue, ProxyValue};

/// State shared by every proxy created through one [`ForView`].
pub(crate) struct ViewContext {
    pub config: WrapperConfig,
    pub dispatcher: Arc<Dispatcher>,
    pub registry: Registry<ObjectInstanceInner>,
}

impl ViewContext {
    pub fn scope(&self) -> Scope<'static> {
        Scope::with_config(&self.config.tracking)
    }

    pub fn wrap(self: &Arc<Self>, object: &DomainRef) -> ObjectInstance {
        let inner = self
            .registry
            .get_or_insert_with(object.key(), || ObjectInstanceInner::new(object.clone(), self.clone()));
        ObjectInstance::from_inner(inner)
    }

    /// Domain to proxy: primitives pass through, objects are wrapped, collections item by item.
    pub fn translate_outgoing(self: &Arc<Self>, value: &DomainValue) -> ProxyValue {
        match value {
            DomainValue::Null => ProxyValue::Null,
            DomainValue::Primitive(primitive) => ProxyValue::Primitive(primitive.clone()),
            DomainValue::Object(object) => ProxyValue::Object(self.wrap(object)),
            DomainValue::Collection(sequence) => ProxyValue::Collection(
                sequence
                    .items
                    .iter()
                    .map(|item| self.translate_outgoing(item))
                    .collect(),
            ),
        }
    }

    /// Proxy to domain: proxies are unwrapped, proxies created by another view are rejected.
    pub fn translate_incoming(&self, member: &str, value: &ProxyValue) -> Result<DomainValue, WrapperError> {
        match value {
            ProxyValue::Null => Ok(DomainValue::Null),
            ProxyValue::Primitive(primitive) => Ok(DomainValue::Primitive(primitive.clone())),
            ProxyValue::Object(instance) => match instance.belongs_to(self) {
                true => Ok(DomainValue::Object(instance.wrapped().clone())),
                false => Err(WrapperError::mismatch(
                    member,
                    "object wrapped by this view",
                    format!("object wrapped by another view, {}", instance),
                )),
            },
            ProxyValue::Collection(items) => {
                let items = items
                    .iter()
                    .map(|item| self.translate_incoming(member, item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(DomainValue::Collection(DomainSequence::new(items)))
            }
        }
    }
}

/// The root of a view over a domain object graph.
///
/// Wraps domain objects in [`ObjectInstance`] proxies, one proxy per live domain object, and owns the
/// dispatcher through which change notifications reach the UI thread.
///
/// Cloning creates a new handle to the **same** view.
#[derive(Clone)]
pub struct ForView {
    context: Arc<ViewContext>,
}

impl ForView {
    pub fn new() -> Self {
        Self::with_config(WrapperConfig::default())
    }

    pub fn with_config(config: WrapperConfig) -> Self {
        debug!(
            "Creating view. max_depth: {}, max_drain_passes: {}, max_diff_cells: {}",
            config.tracking.max_depth, config.max_drain_passes, config.max_diff_cells
        );
        let dispatcher = Arc::new(Dispatcher::new(config.max_drain_passes));
        Self {
            context: Arc::new(ViewContext {
                config,
                dispatcher,
                registry: Registry::new(),
            }),
        }
    }

    pub fn config(&self) -> &WrapperConfig {
        &self.context.config
    }

    /// Returns the proxy of `object`, creating it if `object` has no live proxy.
    pub fn wrap<D: DomainObject>(&self, object: &Arc<D>) -> ObjectInstance {
        self.wrap_ref(&DomainRef::new(object.clone()))
    }

    pub fn wrap_ref(&self, object: &DomainRef) -> ObjectInstance {
        self.context.wrap(object)
    }

    /// Translates any domain value, `Null` translates to `Null`.
    pub fn wrap_value(&self, value: &DomainValue) -> ProxyValue {
        self.context.translate_outgoing(value)
    }

    /// The domain object behind `value`, if it is a proxy of a `D` created by this view.
    pub fn unwrap<D: DomainObject>(&self, value: &ProxyValue) -> Option<Arc<D>> {
        match value {
            ProxyValue::Object(instance) if instance.belongs_to(&self.context) => instance.wrapped_as::<D>(),
            _ => None,
        }
    }

    pub fn unwrap_value(&self, value: &ProxyValue) -> Result<DomainValue, WrapperError> {
        self.context.translate_incoming("value", value)
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.context.dispatcher
    }

    /// Delivers pending change notifications on the calling thread, see [`Dispatcher::drain`].
    pub fn drain(&self) -> usize {
        self.context.dispatcher.drain()
    }

    /// Number of registry entries, including dead ones not yet swept.
    pub fn registry_len(&self) -> usize {
        self.context.registry.len()
    }

    /// Sweeps registry entries of dropped proxies, returns how many were removed.
    pub fn purge(&self) -> usize {
        self.context.registry.purge()
    }
}

impl Default for ForView {
    fn default() -> Self {
        Self::new()
    }
}

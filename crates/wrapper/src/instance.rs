use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use tracing::trace;
use tracking::DependentStatus;

use crate::atom::PropertyAtom;
use crate::descriptor::{DomainObject, DomainRef, MemberDescriptor};
use crate::dispatcher::UpdateKey;
use crate::error::WrapperError;
use crate::listeners::{CollectionChanged, ListenerId, PropertyChanged, PropertyFailed};
use crate::value::ProxyValue;
use crate::view::ViewContext;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    pub(crate) fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for InstanceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The observable proxy of one domain object.
///
/// Obtained from [`crate::ForView::wrap`], which returns the same proxy for the same domain object for
/// as long as the proxy is alive.  Cloning creates a new handle to the **same** proxy, equality is
/// identity.
#[derive(Clone)]
pub struct ObjectInstance {
    inner: Arc<ObjectInstanceInner>,
}

pub(crate) struct ObjectInstanceInner {
    id: InstanceId,
    object: DomainRef,
    context: Arc<ViewContext>,
    atoms: IndexMap<String, Arc<PropertyAtom>>,
}

impl ObjectInstanceInner {
    pub(crate) fn new(object: DomainRef, context: Arc<ViewContext>) -> Arc<Self> {
        let id = InstanceId::next();
        let atoms = object
            .descriptor()
            .members()
            .enumerate()
            .map(|(index, member)| {
                let key = UpdateKey {
                    instance: id,
                    member: index,
                };
                let atom = PropertyAtom::new(key, member.clone(), object.clone(), context.clone());
                (member.name().to_string(), atom)
            })
            .collect();

        trace!("Created wrapper. instance: {}, type: '{}', key: {}", id, object.type_name(), object.key());
        Arc::new(Self {
            id,
            object,
            context,
            atoms,
        })
    }
}

impl Drop for ObjectInstanceInner {
    fn drop(&mut self) {
        trace!("Dropping wrapper. instance: {}, type: '{}'", self.id, self.object.type_name());
        self.context
            .registry
            .evict(self.object.key(), self as *const Self);
    }
}

impl ObjectInstance {
    pub(crate) fn from_inner(inner: Arc<ObjectInstanceInner>) -> Self {
        Self {
            inner,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    pub fn type_name(&self) -> &'static str {
        self.inner.object.type_name()
    }

    /// The wrapped domain object.
    pub fn wrapped(&self) -> &DomainRef {
        &self.inner.object
    }

    pub fn wrapped_as<D: DomainObject>(&self) -> Option<Arc<D>> {
        self.inner.object.downcast::<D>()
    }

    pub fn members(&self) -> impl Iterator<Item = &MemberDescriptor> {
        self.inner
            .atoms
            .values()
            .map(|atom| atom.member())
    }

    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.inner
            .atoms
            .get(name)
            .map(|atom| atom.member())
    }

    /// Reads a member, recomputing it if the domain state it depends on has changed.
    pub fn get_value(&self, name: &str) -> Result<ProxyValue, WrapperError> {
        self.atom(name)?.get_value()
    }

    /// Writes a member.  Proxies are unwrapped to their domain objects first.
    pub fn set_value(&self, name: &str, value: impl Into<ProxyValue>) -> Result<(), WrapperError> {
        self.atom(name)?
            .set_value(&value.into())
    }

    pub fn status(&self, name: &str) -> Result<DependentStatus, WrapperError> {
        Ok(self.atom(name)?.status())
    }

    pub fn on_property_changed(
        &self,
        name: &str,
        listener: impl Fn(&PropertyChanged) + Send + Sync + 'static,
    ) -> Result<ListenerId, WrapperError> {
        Ok(self.atom(name)?.on_changed(listener))
    }

    pub fn on_collection_changed(
        &self,
        name: &str,
        listener: impl Fn(&CollectionChanged) + Send + Sync + 'static,
    ) -> Result<ListenerId, WrapperError> {
        Ok(self
            .atom(name)?
            .on_collection_changed(listener))
    }

    pub fn on_property_failed(
        &self,
        name: &str,
        listener: impl Fn(&PropertyFailed) + Send + Sync + 'static,
    ) -> Result<ListenerId, WrapperError> {
        Ok(self.atom(name)?.on_failed(listener))
    }

    /// Returns `true` if a listener with this id was registered on any member.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner
            .atoms
            .values()
            .any(|atom| atom.remove_listener(id))
    }

    pub(crate) fn belongs_to(&self, context: &ViewContext) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.inner.context), context)
    }

    fn atom(&self, name: &str) -> Result<&Arc<PropertyAtom>, WrapperError> {
        self.inner
            .atoms
            .get(name)
            .ok_or_else(|| WrapperError::UnknownMember {
                type_name: self.type_name().to_string(),
                member: name.to_string(),
            })
    }
}

impl PartialEq for ObjectInstance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ObjectInstance {}

impl Display for ObjectInstance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.type_name(), self.inner.id)
    }
}

impl Debug for ObjectInstance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectInstance")
            .field("id", &self.inner.id)
            .field("object", &self.inner.object)
            .field("members", &self.inner.atoms.len())
            .finish()
    }
}

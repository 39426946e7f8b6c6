//! Explicit member tables describing what a domain type exposes for binding.
//!
//! A domain type opts in by implementing [`DomainObject`] and returning a [`TypeDescriptor`], usually
//! built once and cached:
//!
//! ```rust
//! use std::sync::{Arc, OnceLock};
//! use tracking::Independent;
//! use wrapper::{DomainObject, TypeDescriptor};
//!
//! struct Person {
//!     name: Independent<String>,
//! }
//!
//! impl DomainObject for Person {
//!     fn descriptor() -> Arc<TypeDescriptor> {
//!         static DESCRIPTOR: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
//!         DESCRIPTOR
//!             .get_or_init(|| {
//!                 TypeDescriptor::builder::<Person>("Person")
//!                     .independent("Name", |person| &person.name)
//!                     .build()
//!             })
//!             .clone()
//!     }
//! }
//! ```

use std::any::Any;
use std::fmt::{Debug, Display, Formatter};
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use anyhow::anyhow;
use indexmap::IndexMap;
use tracking::{Dependent, Independent, IndependentList, Scope};

use crate::value::{BindValue, DomainSequence, DomainValue, Mismatch};

pub type AnyObject = dyn Any + Send + Sync;

type Getter = Arc<dyn Fn(&AnyObject, &Scope<'_>) -> anyhow::Result<DomainValue> + Send + Sync>;
type Setter = Arc<dyn Fn(&AnyObject, DomainValue) -> Result<(), Mismatch> + Send + Sync>;
type NoSetter<D> = fn(&D, DomainValue) -> Result<(), Mismatch>;

/// A type whose instances can be wrapped.
pub trait DomainObject: Send + Sync + 'static {
    fn descriptor() -> Arc<TypeDescriptor>
    where
        Self: Sized;
}

/// Identity of a live domain object, the address of its allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey(usize);

impl ObjectKey {
    pub(crate) fn of<T: ?Sized>(object: &Arc<T>) -> Self {
        Self(Arc::as_ptr(object) as *const () as usize)
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A type-erased, shared reference to a domain object together with its descriptor.
#[derive(Clone)]
pub struct DomainRef {
    object: Arc<AnyObject>,
    descriptor: Arc<TypeDescriptor>,
}

impl DomainRef {
    pub fn new<D: DomainObject>(object: Arc<D>) -> Self {
        Self {
            descriptor: D::descriptor(),
            object,
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::of(&self.object)
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    pub fn type_name(&self) -> &'static str {
        self.descriptor.type_name
    }

    pub fn as_any(&self) -> &AnyObject {
        &*self.object
    }

    pub fn downcast<D: DomainObject>(&self) -> Option<Arc<D>> {
        self.object.clone().downcast::<D>().ok()
    }

    /// Does not keep the object alive, but keeps its address from being reused while held.
    pub(crate) fn downgrade(&self) -> Weak<AnyObject> {
        Arc::downgrade(&self.object)
    }

    pub(crate) fn is(&self, object: &Weak<AnyObject>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.object), object.as_ptr())
    }
}

impl PartialEq for DomainRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }
}

impl Debug for DomainRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.descriptor.type_name, self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Primitive,
    Object,
    Collection,
}

impl MemberKind {
    pub fn name(&self) -> &'static str {
        match self {
            MemberKind::Primitive => "primitive",
            MemberKind::Object => "object",
            MemberKind::Collection => "collection",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberAccess {
    ReadOnly,
    ReadWrite,
}

/// Where a member's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberSource {
    Independent,
    Dependent,
    /// Evaluated on every recomputation of the member.
    Computed,
    List,
    Custom,
}

#[derive(Clone)]
pub struct MemberDescriptor {
    name: String,
    kind: MemberKind,
    source: MemberSource,
    getter: Getter,
    setter: Option<Setter>,
}

impl MemberDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn source(&self) -> MemberSource {
        self.source
    }

    pub fn access(&self) -> MemberAccess {
        match self.setter {
            Some(_) => MemberAccess::ReadWrite,
            None => MemberAccess::ReadOnly,
        }
    }

    pub(crate) fn read(&self, object: &AnyObject, scope: &Scope<'_>) -> anyhow::Result<DomainValue> {
        (self.getter)(object, scope)
    }

    pub(crate) fn setter(&self) -> Option<&Setter> {
        self.setter.as_ref()
    }
}

impl Debug for MemberDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("access", &self.access())
            .field("source", &self.source)
            .finish()
    }
}

/// The bindable members of one domain type, in declaration order.
#[derive(Debug)]
pub struct TypeDescriptor {
    type_name: &'static str,
    members: IndexMap<String, MemberDescriptor>,
}

impl TypeDescriptor {
    pub fn builder<D: DomainObject>(type_name: &'static str) -> TypeDescriptorBuilder<D> {
        TypeDescriptorBuilder {
            type_name,
            members: IndexMap::new(),
            _marker: PhantomData,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn members(&self) -> impl Iterator<Item = &MemberDescriptor> {
        self.members.values()
    }

    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.get(name)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

pub struct TypeDescriptorBuilder<D> {
    type_name: &'static str,
    members: IndexMap<String, MemberDescriptor>,
    _marker: PhantomData<fn() -> D>,
}

impl<D: DomainObject> TypeDescriptorBuilder<D> {
    /// A read-write member backed by an [`Independent`] field.
    pub fn independent<T: BindValue>(self, name: &str, field: fn(&D) -> &Independent<T>) -> Self {
        let getter = move |object: &D, scope: &Scope<'_>| -> anyhow::Result<DomainValue> {
            Ok(field(object).get(scope).into_domain())
        };
        let setter = move |object: &D, value: DomainValue| -> Result<(), Mismatch> {
            let value = T::from_domain(value)?;
            field(object).set_by(value, T::same_value);
            Ok(())
        };
        self.add(name, T::kind(), MemberSource::Independent, getter, Some(setter))
    }

    /// A read-only member backed by a [`Dependent`] field.
    pub fn dependent<T: BindValue + PartialEq>(self, name: &str, field: fn(&D) -> &Dependent<T>) -> Self {
        let getter = move |object: &D, scope: &Scope<'_>| -> anyhow::Result<DomainValue> {
            Ok(field(object).get(scope)?.into_domain())
        };
        self.add(name, T::kind(), MemberSource::Dependent, getter, None::<NoSetter<D>>)
    }

    /// A read-only member computed from other trackable state each time it is recomputed.
    pub fn computed<T, F>(self, name: &str, compute: F) -> Self
    where
        T: BindValue,
        F: Fn(&D, &Scope<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let getter = move |object: &D, scope: &Scope<'_>| -> anyhow::Result<DomainValue> {
            Ok(compute(object, scope)?.into_domain())
        };
        self.add(name, T::kind(), MemberSource::Computed, getter, None::<NoSetter<D>>)
    }

    /// A collection member backed by an [`IndependentList`].  Writing the member replaces the list.
    pub fn list<T: BindValue>(self, name: &str, field: fn(&D) -> &IndependentList<T>) -> Self {
        let getter = move |object: &D, scope: &Scope<'_>| -> anyhow::Result<DomainValue> {
            let list = field(object);
            let items = list.with(scope, |items| {
                items
                    .iter()
                    .cloned()
                    .map(BindValue::into_domain)
                    .collect()
            });
            let identity = list.identity(scope);
            Ok(DomainValue::Collection(DomainSequence::with_backing(items, identity)))
        };
        let setter = move |object: &D, value: DomainValue| -> Result<(), Mismatch> {
            let items = Vec::<T>::from_domain(value)?;
            field(object).replace(items);
            Ok(())
        };
        self.add(name, MemberKind::Collection, MemberSource::List, getter, Some(setter))
    }

    /// A read-only member with a hand-written getter.
    pub fn property<F>(self, name: &str, kind: MemberKind, getter: F) -> Self
    where
        F: Fn(&D, &Scope<'_>) -> anyhow::Result<DomainValue> + Send + Sync + 'static,
    {
        self.add(name, kind, MemberSource::Custom, getter, None::<NoSetter<D>>)
    }

    /// A read-write member with a hand-written getter and setter.
    pub fn writable_property<F, S>(self, name: &str, kind: MemberKind, getter: F, setter: S) -> Self
    where
        F: Fn(&D, &Scope<'_>) -> anyhow::Result<DomainValue> + Send + Sync + 'static,
        S: Fn(&D, DomainValue) -> Result<(), Mismatch> + Send + Sync + 'static,
    {
        self.add(name, kind, MemberSource::Custom, getter, Some(setter))
    }

    fn add<F, S>(mut self, name: &str, kind: MemberKind, source: MemberSource, getter: F, setter: Option<S>) -> Self
    where
        F: Fn(&D, &Scope<'_>) -> anyhow::Result<DomainValue> + Send + Sync + 'static,
        S: Fn(&D, DomainValue) -> Result<(), Mismatch> + Send + Sync + 'static,
    {
        let type_name = self.type_name;
        let getter: Getter = Arc::new(move |object: &AnyObject, scope: &Scope<'_>| -> anyhow::Result<DomainValue> {
            let object = object
                .downcast_ref::<D>()
                .ok_or_else(|| anyhow!("Object is not a '{}'", type_name))?;
            getter(object, scope)
        });
        let setter = setter.map(|setter| {
            let setter: Setter = Arc::new(move |object: &AnyObject, value: DomainValue| -> Result<(), Mismatch> {
                let object = object
                    .downcast_ref::<D>()
                    .ok_or(Mismatch {
                        expected: type_name,
                        actual: "object",
                    })?;
                setter(object, value)
            });
            setter
        });

        self.members.insert(name.to_string(), MemberDescriptor {
            name: name.to_string(),
            kind,
            source,
            getter,
            setter,
        });
        self
    }

    pub fn build(self) -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor {
            type_name: self.type_name,
            members: self.members,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;

    struct Account {
        owner: Independent<String>,
        balance: Independent<i64>,
        history: IndependentList<i64>,
    }

    impl DomainObject for Account {
        fn descriptor() -> Arc<TypeDescriptor> {
            static DESCRIPTOR: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
            DESCRIPTOR
                .get_or_init(|| {
                    TypeDescriptor::builder::<Account>("Account")
                        .independent("Owner", |account| &account.owner)
                        .independent("Balance", |account| &account.balance)
                        .computed("IsOverdrawn", |account, scope| Ok(account.balance.get(scope) < 0))
                        .list("History", |account| &account.history)
                        .build()
                })
                .clone()
        }
    }

    fn account() -> Arc<Account> {
        Arc::new(Account {
            owner: Independent::new("ann".to_string()),
            balance: Independent::new(10),
            history: IndependentList::from_vec(vec![10]),
        })
    }

    #[test]
    fn members_keep_declaration_order() {
        // when
        let descriptor = Account::descriptor();

        // then
        let names: Vec<_> = descriptor
            .members()
            .map(MemberDescriptor::name)
            .collect();
        assert_eq!(names, vec!["Owner", "Balance", "IsOverdrawn", "History"]);
        assert_eq!(descriptor.member("IsOverdrawn").unwrap().access(), MemberAccess::ReadOnly);
        assert_eq!(descriptor.member("History").unwrap().kind(), MemberKind::Collection);
    }

    #[test]
    fn getters_and_setters_operate_on_erased_objects() {
        // given
        let object = DomainRef::new(account());
        let balance = object.descriptor().member("Balance").unwrap().clone();
        let is_overdrawn = object.descriptor().member("IsOverdrawn").unwrap().clone();
        let scope = Scope::untracked();

        // when
        let setter = balance.setter().unwrap();
        setter(object.as_any(), DomainValue::from(crate::value::Primitive::Int(-5))).unwrap();

        // then
        assert_eq!(is_overdrawn.read(object.as_any(), &scope).unwrap(), true.into_domain());
    }

    #[test]
    fn setter_rejects_wrong_kind() {
        // given
        let object = DomainRef::new(account());
        let owner = object.descriptor().member("Owner").unwrap().clone();

        // when
        let result = (owner.setter().unwrap())(object.as_any(), 5i64.into_domain());

        // then
        assert_eq!(result, Err(Mismatch {
            expected: "text",
            actual: "int",
        }));
    }

    #[test]
    fn references_compare_by_identity() {
        // given
        let first = account();
        let a = DomainRef::new(first.clone());
        let b = DomainRef::new(first);
        let c = DomainRef::new(account());

        // expect
        assert_eq!(a, b);
        assert_eq!(a.key(), b.key());
        assert_ne!(a, c);
        assert!(a.downcast::<Account>().is_some());
    }
}

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use tracking::ListIdentity;

use crate::descriptor::{DomainObject, DomainRef, MemberKind};
use crate::instance::ObjectInstance;

#[derive(Debug, Clone)]
pub enum Primitive {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Floats compare by bit pattern, so a value that stays `NaN` is unchanged.
impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Primitive::Bool(a), Primitive::Bool(b)) => a == b,
            (Primitive::Int(a), Primitive::Int(b)) => a == b,
            (Primitive::Float(a), Primitive::Float(b)) => a.to_bits() == b.to_bits(),
            (Primitive::Text(a), Primitive::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Primitive {
    pub fn type_name(&self) -> &'static str {
        match self {
            Primitive::Bool(_) => "bool",
            Primitive::Int(_) => "int",
            Primitive::Float(_) => "float",
            Primitive::Text(_) => "text",
        }
    }
}

impl Display for Primitive {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Primitive::Bool(value) => write!(f, "{}", value),
            Primitive::Int(value) => write!(f, "{}", value),
            Primitive::Float(value) => write!(f, "{}", value),
            Primitive::Text(value) => write!(f, "'{}'", value),
        }
    }
}

/// A domain sequence, as read from a collection member.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainSequence {
    pub items: Vec<DomainValue>,
    /// Identity of the backing sequence, when the member is backed by an independent list.
    pub backing: Option<ListIdentity>,
}

impl DomainSequence {
    pub fn new(items: Vec<DomainValue>) -> Self {
        Self {
            items,
            backing: None,
        }
    }

    pub fn with_backing(items: Vec<DomainValue>, backing: ListIdentity) -> Self {
        Self {
            items,
            backing: Some(backing),
        }
    }
}

/// A value on the domain side of the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainValue {
    Null,
    Primitive(Primitive),
    Object(DomainRef),
    Collection(DomainSequence),
}

impl DomainValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            DomainValue::Null => "null",
            DomainValue::Primitive(primitive) => primitive.type_name(),
            DomainValue::Object(object) => object.type_name(),
            DomainValue::Collection(_) => "collection",
        }
    }
}

impl From<Primitive> for DomainValue {
    fn from(value: Primitive) -> Self {
        DomainValue::Primitive(value)
    }
}

/// A value on the proxy side of the boundary, as seen by the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyValue {
    Null,
    Primitive(Primitive),
    Object(ObjectInstance),
    Collection(Vec<ProxyValue>),
}

impl ProxyValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ProxyValue::Null => "null",
            ProxyValue::Primitive(primitive) => primitive.type_name(),
            ProxyValue::Object(instance) => instance.type_name(),
            ProxyValue::Collection(_) => "collection",
        }
    }

    pub fn as_object(&self) -> Option<&ObjectInstance> {
        match self {
            ProxyValue::Object(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[ProxyValue]> {
        match self {
            ProxyValue::Collection(items) => Some(items),
            _ => None,
        }
    }
}

impl From<Primitive> for ProxyValue {
    fn from(value: Primitive) -> Self {
        ProxyValue::Primitive(value)
    }
}

impl From<bool> for ProxyValue {
    fn from(value: bool) -> Self {
        ProxyValue::Primitive(Primitive::Bool(value))
    }
}

impl From<i64> for ProxyValue {
    fn from(value: i64) -> Self {
        ProxyValue::Primitive(Primitive::Int(value))
    }
}

impl From<f64> for ProxyValue {
    fn from(value: f64) -> Self {
        ProxyValue::Primitive(Primitive::Float(value))
    }
}

impl From<&str> for ProxyValue {
    fn from(value: &str) -> Self {
        ProxyValue::Primitive(Primitive::Text(value.to_string()))
    }
}

impl From<ObjectInstance> for ProxyValue {
    fn from(value: ObjectInstance) -> Self {
        ProxyValue::Object(value)
    }
}

impl Display for ProxyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyValue::Null => f.write_str("null"),
            ProxyValue::Primitive(primitive) => write!(f, "{}", primitive),
            ProxyValue::Object(instance) => write!(f, "{}", instance),
            ProxyValue::Collection(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A domain value could not be converted to the expected Rust type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub expected: &'static str,
    pub actual: &'static str,
}

/// Conversion between a typed member value and [`DomainValue`].
pub trait BindValue: Clone + Send + Sync + 'static {
    fn kind() -> MemberKind;

    fn into_domain(self) -> DomainValue;

    fn from_domain(value: DomainValue) -> Result<Self, Mismatch>;

    /// Equality used to suppress writes of an unchanged value.  Object references compare by identity.
    fn same_value(&self, other: &Self) -> bool {
        self.clone().into_domain() == other.clone().into_domain()
    }
}

fn mismatch<T>(expected: &'static str, actual: &DomainValue) -> Result<T, Mismatch> {
    Err(Mismatch {
        expected,
        actual: actual.type_name(),
    })
}

impl BindValue for bool {
    fn kind() -> MemberKind {
        MemberKind::Primitive
    }

    fn into_domain(self) -> DomainValue {
        DomainValue::Primitive(Primitive::Bool(self))
    }

    fn from_domain(value: DomainValue) -> Result<Self, Mismatch> {
        match value {
            DomainValue::Primitive(Primitive::Bool(value)) => Ok(value),
            other => mismatch("bool", &other),
        }
    }
}

macro_rules! bind_integer {
    ($($ty:ty),*) => {
        $(
            impl BindValue for $ty {
                fn kind() -> MemberKind {
                    MemberKind::Primitive
                }

                fn into_domain(self) -> DomainValue {
                    DomainValue::Primitive(Primitive::Int(i64::from(self)))
                }

                fn from_domain(value: DomainValue) -> Result<Self, Mismatch> {
                    match value {
                        DomainValue::Primitive(Primitive::Int(value)) => <$ty>::try_from(value).map_err(|_| Mismatch {
                            expected: stringify!($ty),
                            actual: "int",
                        }),
                        other => mismatch(stringify!($ty), &other),
                    }
                }
            }
        )*
    };
}

// only types that convert to `i64` without loss
bind_integer!(i32, i64, u32);

impl BindValue for f64 {
    fn kind() -> MemberKind {
        MemberKind::Primitive
    }

    fn into_domain(self) -> DomainValue {
        DomainValue::Primitive(Primitive::Float(self))
    }

    fn from_domain(value: DomainValue) -> Result<Self, Mismatch> {
        match value {
            DomainValue::Primitive(Primitive::Float(value)) => Ok(value),
            // integers widen, the UI often hands back whole numbers
            DomainValue::Primitive(Primitive::Int(value)) => Ok(value as f64),
            other => mismatch("f64", &other),
        }
    }
}

impl BindValue for String {
    fn kind() -> MemberKind {
        MemberKind::Primitive
    }

    fn into_domain(self) -> DomainValue {
        DomainValue::Primitive(Primitive::Text(self))
    }

    fn from_domain(value: DomainValue) -> Result<Self, Mismatch> {
        match value {
            DomainValue::Primitive(Primitive::Text(value)) => Ok(value),
            other => mismatch("text", &other),
        }
    }
}

impl<D: DomainObject> BindValue for Arc<D> {
    fn kind() -> MemberKind {
        MemberKind::Object
    }

    fn into_domain(self) -> DomainValue {
        DomainValue::Object(DomainRef::new(self))
    }

    fn from_domain(value: DomainValue) -> Result<Self, Mismatch> {
        match value {
            DomainValue::Object(object) => match object.downcast::<D>() {
                Some(object) => Ok(object),
                None => Err(Mismatch {
                    expected: D::descriptor().type_name(),
                    actual: object.type_name(),
                }),
            },
            other => mismatch(D::descriptor().type_name(), &other),
        }
    }

    fn same_value(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<D: DomainObject> BindValue for Option<Arc<D>> {
    fn kind() -> MemberKind {
        MemberKind::Object
    }

    fn into_domain(self) -> DomainValue {
        match self {
            Some(object) => object.into_domain(),
            None => DomainValue::Null,
        }
    }

    fn from_domain(value: DomainValue) -> Result<Self, Mismatch> {
        match value {
            DomainValue::Null => Ok(None),
            other => Arc::<D>::from_domain(other).map(Some),
        }
    }

    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(this), Some(other)) => Arc::ptr_eq(this, other),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: BindValue> BindValue for Vec<T> {
    fn kind() -> MemberKind {
        MemberKind::Collection
    }

    fn into_domain(self) -> DomainValue {
        DomainValue::Collection(DomainSequence::new(
            self.into_iter()
                .map(BindValue::into_domain)
                .collect(),
        ))
    }

    fn from_domain(value: DomainValue) -> Result<Self, Mismatch> {
        match value {
            DomainValue::Collection(sequence) => sequence
                .items
                .into_iter()
                .map(T::from_domain)
                .collect(),
            other => mismatch("collection", &other),
        }
    }
}

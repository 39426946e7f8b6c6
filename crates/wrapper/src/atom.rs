use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};
use tracking::{Dependent, DependentStatus, ListIdentity, TrackingError};

use crate::collection::{CollectionEdit, diff_by};
use crate::descriptor::{AnyObject, DomainRef, MemberDescriptor, MemberKind};
use crate::dispatcher::{DeferredUpdate, UpdateKey};
use crate::error::WrapperError;
use crate::listeners::{CollectionChanged, ListenerId, Listeners, PropertyChanged, PropertyFailed};
use crate::value::{DomainValue, Primitive, ProxyValue};
use crate::view::ViewContext;

/// The binding of one member of one wrapped object.
///
/// The member is read through a [`Dependent`], so the atom learns which domain state the member depends
/// on.  When that state changes the atom schedules itself on the dispatcher and, once drained, delivers
/// the new value to its listeners if it differs from the value delivered last.
pub(crate) struct PropertyAtom {
    key: UpdateKey,
    member: MemberDescriptor,
    object: DomainRef,
    context: Arc<ViewContext>,
    value: Dependent<DomainValue>,
    state: Mutex<AtomState>,
    changed: Listeners<PropertyChanged>,
    collection_changed: Listeners<CollectionChanged>,
    failed: Listeners<PropertyFailed>,
}

#[derive(Default)]
struct AtomState {
    /// What listeners last saw, `None` until the first read.
    delivered: Option<Delivered>,
    backing: Option<ListIdentity>,
    failed: bool,
}

/// A delivered value, with objects held weakly.
///
/// Holding the proxies themselves would let two wrappers that reference each other keep one another,
/// and the objects they wrap, alive.  The weak handles keep the addresses from being reused, so an
/// address match still means the same object.
enum Delivered {
    Null,
    Primitive(Primitive),
    Object(Weak<AnyObject>),
    Collection(Vec<Delivered>),
}

impl Delivered {
    fn of(value: &ProxyValue) -> Self {
        match value {
            ProxyValue::Null => Delivered::Null,
            ProxyValue::Primitive(primitive) => Delivered::Primitive(primitive.clone()),
            ProxyValue::Object(instance) => Delivered::Object(instance.wrapped().downgrade()),
            ProxyValue::Collection(items) => Delivered::Collection(items.iter().map(Delivered::of).collect()),
        }
    }

    fn matches(&self, value: &ProxyValue) -> bool {
        match (self, value) {
            (Delivered::Null, ProxyValue::Null) => true,
            (Delivered::Primitive(delivered), ProxyValue::Primitive(primitive)) => delivered == primitive,
            (Delivered::Object(delivered), ProxyValue::Object(instance)) => instance.wrapped().is(delivered),
            (Delivered::Collection(delivered), ProxyValue::Collection(items)) => {
                delivered.len() == items.len()
                    && delivered
                        .iter()
                        .zip(items.iter())
                        .all(|(delivered, item)| delivered.matches(item))
            }
            _ => false,
        }
    }

    fn into_items(self) -> Vec<Delivered> {
        match self {
            Delivered::Collection(items) => items,
            Delivered::Null => Vec::new(),
            other => vec![other],
        }
    }
}

impl PropertyAtom {
    pub fn new(key: UpdateKey, member: MemberDescriptor, object: DomainRef, context: Arc<ViewContext>) -> Arc<Self> {
        let label = format!("{}.{}", object.type_name(), member.name());
        let value = {
            let member = member.clone();
            let object = object.clone();
            Dependent::try_new(label, move |scope| member.read(object.as_any(), scope))
        };

        let atom = Arc::new(Self {
            key,
            member,
            object,
            context,
            value,
            state: Mutex::new(AtomState::default()),
            changed: Listeners::new(),
            collection_changed: Listeners::new(),
            failed: Listeners::new(),
        });

        let update = Arc::downgrade(&atom) as Weak<dyn DeferredUpdate>;
        let dispatcher = atom.context.dispatcher.clone();
        atom.value
            .on_invalidated(move || dispatcher.schedule(key, update.clone()));

        atom
    }

    pub fn member(&self) -> &MemberDescriptor {
        &self.member
    }

    pub fn get_value(&self) -> Result<ProxyValue, WrapperError> {
        let value = self.value.get(&self.context.scope())?;
        let proxy = self.context.translate_outgoing(&value);

        let mut state = self.state.lock();
        if state.delivered.is_none() {
            state.delivered = Some(Delivered::of(&proxy));
            state.backing = backing_of(&value);
        }
        Ok(proxy)
    }

    pub fn set_value(&self, value: &ProxyValue) -> Result<(), WrapperError> {
        let name = self.member.name();
        let setter = self
            .member
            .setter()
            .ok_or_else(|| WrapperError::ReadOnlyMember {
                type_name: self.object.type_name().to_string(),
                member: name.to_string(),
            })?;

        let value = self.context.translate_incoming(name, value)?;
        let compatible = match (self.member.kind(), &value) {
            (_, DomainValue::Null) => true,
            (MemberKind::Primitive, DomainValue::Primitive(_)) => true,
            (MemberKind::Object, DomainValue::Object(_)) => true,
            (MemberKind::Collection, DomainValue::Collection(_)) => true,
            _ => false,
        };
        if !compatible {
            return Err(WrapperError::mismatch(name, self.member.kind().name(), value.type_name()));
        }

        trace!("Writing member. instance: {}, member: '{}'", self.key.instance, name);
        setter(self.object.as_any(), value)
            .map_err(|mismatch| WrapperError::mismatch(name, mismatch.expected, mismatch.actual))
    }

    pub fn status(&self) -> DependentStatus {
        self.value.status()
    }

    pub fn on_changed(&self, listener: impl Fn(&PropertyChanged) + Send + Sync + 'static) -> ListenerId {
        self.changed.add(listener)
    }

    pub fn on_collection_changed(&self, listener: impl Fn(&CollectionChanged) + Send + Sync + 'static) -> ListenerId {
        self.collection_changed.add(listener)
    }

    pub fn on_failed(&self, listener: impl Fn(&PropertyFailed) + Send + Sync + 'static) -> ListenerId {
        self.failed.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.changed.remove(id) || self.collection_changed.remove(id) || self.failed.remove(id)
    }

    fn deliver_value(&self, proxy: ProxyValue) {
        let unchanged = {
            let mut state = self.state.lock();
            let recovered = std::mem::take(&mut state.failed);
            let previous = state.delivered.replace(Delivered::of(&proxy));
            !recovered
                && previous
                    .as_ref()
                    .is_some_and(|previous| previous.matches(&proxy))
        };
        if unchanged {
            trace!("Suppressed unchanged value. instance: {}, member: '{}'", self.key.instance, self.member.name());
            return;
        }

        debug!(
            "Property changed. instance: {}, member: '{}', value: {}, listeners: {}",
            self.key.instance,
            self.member.name(),
            proxy,
            self.changed.len()
        );
        self.changed.emit(&PropertyChanged {
            instance: self.key.instance,
            member: self.member.name().to_string(),
            value: proxy,
        });
    }

    fn deliver_collection(&self, proxy: ProxyValue, backing: Option<ListIdentity>) {
        let items = into_items(proxy);
        let edits = {
            let mut state = self.state.lock();
            let recovered = std::mem::take(&mut state.failed);
            let previous = state
                .delivered
                .take()
                .map(Delivered::into_items)
                .unwrap_or_default();
            let replaced = matches!((state.backing, backing), (Some(before), Some(after)) if before != after);
            // after a failure listeners cannot trust their mirror, so they get the whole list
            let edits = match replaced || recovered {
                true => vec![CollectionEdit::Reset {
                    items: items.clone(),
                }],
                false => diff_by(&previous, &items, Delivered::matches, self.context.config.max_diff_cells),
            };
            state.delivered = Some(Delivered::Collection(items.iter().map(Delivered::of).collect()));
            state.backing = backing;
            edits
        };
        if edits.is_empty() {
            trace!("Suppressed unchanged collection. instance: {}, member: '{}'", self.key.instance, self.member.name());
            return;
        }

        debug!(
            "Collection changed. instance: {}, member: '{}', edits: {}",
            self.key.instance,
            self.member.name(),
            edits.len()
        );
        self.collection_changed.emit(&CollectionChanged {
            instance: self.key.instance,
            member: self.member.name().to_string(),
            edits,
        });
    }

    fn deliver_failure(&self, error: TrackingError) {
        self.state.lock().failed = true;
        debug!(
            "Property failed. instance: {}, member: '{}', error: {}",
            self.key.instance,
            self.member.name(),
            error
        );
        self.failed.emit(&PropertyFailed {
            instance: self.key.instance,
            member: self.member.name().to_string(),
            error,
        });
    }
}

impl DeferredUpdate for PropertyAtom {
    fn update_now(&self) {
        match self.value.get(&self.context.scope()) {
            Ok(value) => {
                let backing = backing_of(&value);
                let proxy = self.context.translate_outgoing(&value);
                match self.member.kind() {
                    MemberKind::Collection => self.deliver_collection(proxy, backing),
                    MemberKind::Primitive | MemberKind::Object => self.deliver_value(proxy),
                }
            }
            Err(error) => self.deliver_failure(error),
        }
    }
}

fn backing_of(value: &DomainValue) -> Option<ListIdentity> {
    match value {
        DomainValue::Collection(sequence) => sequence.backing,
        _ => None,
    }
}

fn into_items(value: ProxyValue) -> Vec<ProxyValue> {
    match value {
        ProxyValue::Collection(items) => items,
        ProxyValue::Null => Vec::new(),
        other => vec![other],
    }
}

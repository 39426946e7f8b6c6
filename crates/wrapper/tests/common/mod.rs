#![allow(dead_code)]

use std::sync::{Arc, OnceLock, Weak};

use anyhow::bail;
use parking_lot::Mutex;
use tracking::{Dependent, Independent, IndependentList};
use wrapper::{CollectionChanged, DomainObject, ObjectInstance, PropertyChanged, PropertyFailed, TypeDescriptor};

pub struct Counter {
    pub count: Independent<i64>,
}

impl Counter {
    pub fn new(count: i64) -> Arc<Self> {
        Arc::new(Self {
            count: Independent::new(count),
        })
    }
}

impl DomainObject for Counter {
    fn descriptor() -> Arc<TypeDescriptor> {
        static DESCRIPTOR: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
        DESCRIPTOR
            .get_or_init(|| {
                TypeDescriptor::builder::<Counter>("Counter")
                    .independent("Count", |counter| &counter.count)
                    .computed("IsEmpty", |counter, scope| Ok(counter.count.get(scope) == 0))
                    .computed("Inverse", |counter, scope| {
                        let count = counter.count.get(scope);
                        if count == 0 {
                            bail!("count is zero");
                        }
                        Ok(100 / count)
                    })
                    .build()
            })
            .clone()
    }
}

pub struct Todo {
    pub title: Independent<String>,
    pub done: Independent<bool>,
}

impl Todo {
    pub fn new(title: &str) -> Arc<Self> {
        Arc::new(Self {
            title: Independent::new(title.to_string()),
            done: Independent::new(false),
        })
    }
}

impl DomainObject for Todo {
    fn descriptor() -> Arc<TypeDescriptor> {
        static DESCRIPTOR: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
        DESCRIPTOR
            .get_or_init(|| {
                TypeDescriptor::builder::<Todo>("Todo")
                    .independent("Title", |todo| &todo.title)
                    .independent("Done", |todo| &todo.done)
                    .build()
            })
            .clone()
    }
}

pub struct TodoList {
    pub name: Independent<String>,
    pub items: IndependentList<Arc<Todo>>,
    pub tags: IndependentList<String>,
    pub selected: Independent<Option<Arc<Todo>>>,
    pub remaining: Dependent<i64>,
}

impl TodoList {
    pub fn new(titles: &[&str]) -> Arc<Self> {
        let items: IndependentList<Arc<Todo>> = titles
            .iter()
            .map(|title| Todo::new(title))
            .collect();
        let remaining = {
            let items = items.clone();
            Dependent::new("remaining", move |scope| {
                items
                    .get(scope)
                    .iter()
                    .filter(|todo| !todo.done.get(scope))
                    .count() as i64
            })
        };
        Arc::new(Self {
            name: Independent::new("todo".to_string()),
            items,
            tags: IndependentList::new(),
            selected: Independent::new(None),
            remaining,
        })
    }
}

impl DomainObject for TodoList {
    fn descriptor() -> Arc<TypeDescriptor> {
        static DESCRIPTOR: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
        DESCRIPTOR
            .get_or_init(|| {
                TypeDescriptor::builder::<TodoList>("TodoList")
                    .independent("Name", |list| &list.name)
                    .list("Items", |list| &list.items)
                    .list("Tags", |list| &list.tags)
                    .independent("Selected", |list| &list.selected)
                    .dependent("Remaining", |list| &list.remaining)
                    .build()
            })
            .clone()
    }
}

pub struct Folder {
    pub name: Independent<String>,
    pub pinned: Independent<Option<Arc<Note>>>,
}

impl Folder {
    /// A folder whose pinned note points back at it.
    pub fn with_pinned_note(title: &str) -> Arc<Self> {
        Arc::new_cyclic(|folder| Self {
            name: Independent::new("inbox".to_string()),
            pinned: Independent::new(Some(Arc::new(Note {
                title: Independent::new(title.to_string()),
                folder: folder.clone(),
            }))),
        })
    }
}

impl DomainObject for Folder {
    fn descriptor() -> Arc<TypeDescriptor> {
        static DESCRIPTOR: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
        DESCRIPTOR
            .get_or_init(|| {
                TypeDescriptor::builder::<Folder>("Folder")
                    .independent("Name", |folder| &folder.name)
                    .independent("Pinned", |folder| &folder.pinned)
                    .build()
            })
            .clone()
    }
}

pub struct Note {
    pub title: Independent<String>,
    pub folder: Weak<Folder>,
}

impl DomainObject for Note {
    fn descriptor() -> Arc<TypeDescriptor> {
        static DESCRIPTOR: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
        DESCRIPTOR
            .get_or_init(|| {
                TypeDescriptor::builder::<Note>("Note")
                    .independent("Title", |note| &note.title)
                    .computed("Folder", |note, _scope| Ok(note.folder.upgrade()))
                    .build()
            })
            .clone()
    }
}

/// `Echo` adds its own value to `Input`, so it can never be computed.
pub struct Echo {
    pub input: Independent<i64>,
    pub echo: Dependent<i64>,
}

impl Echo {
    pub fn new() -> Arc<Self> {
        let input = Independent::new(1);
        let this: Arc<OnceLock<Dependent<i64>>> = Arc::new(OnceLock::new());
        let echo = {
            let input = input.clone();
            let this = this.clone();
            Dependent::try_new("echo", move |scope| {
                let input = input.get(scope);
                match this.get() {
                    Some(echo) => Ok(input + echo.get(scope)?),
                    None => Ok(input),
                }
            })
        };
        let _ = this.set(echo.clone());
        Arc::new(Self {
            input,
            echo,
        })
    }
}

impl DomainObject for Echo {
    fn descriptor() -> Arc<TypeDescriptor> {
        static DESCRIPTOR: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
        DESCRIPTOR
            .get_or_init(|| {
                TypeDescriptor::builder::<Echo>("Echo")
                    .independent("Input", |echo| &echo.input)
                    .dependent("Echo", |echo| &echo.echo)
                    .build()
            })
            .clone()
    }
}

pub struct Gauge {
    pub reading: Independent<f64>,
}

impl Gauge {
    pub fn new(reading: f64) -> Arc<Self> {
        Arc::new(Self {
            reading: Independent::new(reading),
        })
    }
}

impl DomainObject for Gauge {
    fn descriptor() -> Arc<TypeDescriptor> {
        static DESCRIPTOR: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
        DESCRIPTOR
            .get_or_init(|| {
                TypeDescriptor::builder::<Gauge>("Gauge")
                    .independent("Reading", |gauge| &gauge.reading)
                    .computed("Level", |gauge, scope| Ok(gauge.reading.get(scope)))
                    .build()
            })
            .clone()
    }
}

/// Collects every event delivered to the listeners it registers.
#[derive(Clone, Default)]
pub struct Recorded {
    pub changed: Arc<Mutex<Vec<PropertyChanged>>>,
    pub collection_changed: Arc<Mutex<Vec<CollectionChanged>>>,
    pub failed: Arc<Mutex<Vec<PropertyFailed>>>,
}

impl Recorded {
    pub fn watch(&self, instance: &ObjectInstance, member: &str) {
        let changed = self.changed.clone();
        instance
            .on_property_changed(member, move |event| changed.lock().push(event.clone()))
            .unwrap();
        let collection_changed = self.collection_changed.clone();
        instance
            .on_collection_changed(member, move |event| {
                collection_changed
                    .lock()
                    .push(event.clone())
            })
            .unwrap();
        let failed = self.failed.clone();
        instance
            .on_property_failed(member, move |event| failed.lock().push(event.clone()))
            .unwrap();
    }

    pub fn take_changed(&self) -> Vec<PropertyChanged> {
        std::mem::take(&mut *self.changed.lock())
    }

    pub fn take_collection_changed(&self) -> Vec<CollectionChanged> {
        std::mem::take(&mut *self.collection_changed.lock())
    }

    pub fn take_failed(&self) -> Vec<PropertyFailed> {
        std::mem::take(&mut *self.failed.lock())
    }
}

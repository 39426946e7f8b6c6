//! The domain objects the demo binds to.

use std::sync::{Arc, OnceLock};

use tracking::{Dependent, Independent, IndependentList};
use wrapper::{DomainObject, TypeDescriptor};

pub(crate) struct Counter {
    pub(crate) count: Independent<i64>,
}

impl Counter {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            count: Independent::new(0),
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
                    .computed("Parity", |counter, scope| {
                        let parity = match counter.count.get(scope) % 2 {
                            0 => "even",
                            _ => "odd",
                        };
                        Ok(parity.to_string())
                    })
                    .build()
            })
            .clone()
    }
}

pub(crate) struct Task {
    pub(crate) title: Independent<String>,
    pub(crate) done: Independent<bool>,
}

impl Task {
    pub(crate) fn new(title: &str) -> Arc<Self> {
        Arc::new(Self {
            title: Independent::new(title.to_string()),
            done: Independent::new(false),
        })
    }
}

impl DomainObject for Task {
    fn descriptor() -> Arc<TypeDescriptor> {
        static DESCRIPTOR: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
        DESCRIPTOR
            .get_or_init(|| {
                TypeDescriptor::builder::<Task>("Task")
                    .independent("Title", |task| &task.title)
                    .independent("Done", |task| &task.done)
                    .build()
            })
            .clone()
    }
}

pub(crate) struct TaskList {
    pub(crate) items: IndependentList<Arc<Task>>,
    pub(crate) remaining: Dependent<i64>,
}

impl TaskList {
    pub(crate) fn new() -> Arc<Self> {
        let items: IndependentList<Arc<Task>> = IndependentList::new();
        let remaining = {
            let items = items.clone();
            Dependent::new("remaining", move |scope| {
                items
                    .get(scope)
                    .iter()
                    .filter(|task| !task.done.get(scope))
                    .count() as i64
            })
        };
        Arc::new(Self {
            items,
            remaining,
        })
    }
}

impl DomainObject for TaskList {
    fn descriptor() -> Arc<TypeDescriptor> {
        static DESCRIPTOR: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
        DESCRIPTOR
            .get_or_init(|| {
                TypeDescriptor::builder::<TaskList>("TaskList")
                    .list("Items", |list| &list.items)
                    .dependent("Remaining", |list| &list.remaining)
                    .build()
            })
            .clone()
    }
}

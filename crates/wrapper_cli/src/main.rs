use std::fs::read_to_string;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use parking_lot::Mutex;
use tracing::{debug, info, trace};
use tracking::Scope;
use wrapper::collection::apply;
use wrapper::{CollectionEdit, ForView, ProxyValue, WrapperConfig};

use crate::model::{Counter, Task, TaskList};
use crate::opts::{DemoCommand, Opts};

mod logging;
mod model;
mod opts;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    logging::configure_tracing(opts.trace.clone(), opts.verbose.clone())?;

    let config = match &opts.config {
        Some(path) => load_config(path)?,
        None => WrapperConfig::default(),
    };
    let view = ForView::with_config(config);

    match opts.command {
        DemoCommand::Counter {
            to,
        } => run_counter(&view, to),
        DemoCommand::Tasks {
            titles,
            completed,
            removed,
        } => run_tasks(&view, titles, completed, removed),
    }
}

fn load_config(path: &Path) -> anyhow::Result<WrapperConfig> {
    let content = read_to_string(path).with_context(|| format!("Unable to read config. path: {:?}", path))?;
    let config: WrapperConfig =
        serde_json::from_str(&content).with_context(|| format!("Unable to parse config. path: {:?}", path))?;
    info!("Loaded config. path: {:?}", path);
    Ok(config)
}

fn run_counter(view: &ForView, to: i64) -> anyhow::Result<()> {
    let counter = Counter::new();
    let proxy = view.wrap(&counter);

    for member in ["Count", "IsEmpty", "Parity"] {
        proxy.on_property_changed(member, |event| println!("changed. {}: {}", event.member, event.value))?;
        // reading establishes the baseline, later values are reported as changes
        proxy.get_value(member)?;
    }

    let writer = {
        let counter = counter.clone();
        thread::spawn(move || {
            for count in 1..=to {
                trace!("Writing count. count: {}", count);
                counter.count.set(count);
            }
        })
    };

    run_ui_loop(view, writer)?;

    println!(
        "final. Count: {}, IsEmpty: {}, Parity: {}",
        proxy.get_value("Count")?,
        proxy.get_value("IsEmpty")?,
        proxy.get_value("Parity")?
    );
    Ok(())
}

fn run_tasks(view: &ForView, titles: Vec<String>, completed: Vec<usize>, removed: Vec<usize>) -> anyhow::Result<()> {
    let list = TaskList::new();
    let proxy = view.wrap(&list);

    let mirror = Arc::new(Mutex::new(collection_items(&proxy.get_value("Items")?)?));
    {
        let mirror = mirror.clone();
        let view = view.clone();
        proxy.on_collection_changed("Items", move |event| {
            for edit in event.edits.iter() {
                println!("edit. {}", describe_edit(&view, edit));
            }
            apply(&mut mirror.lock(), &event.edits);
        })?;
    }
    proxy.on_property_changed("Remaining", |event| println!("changed. {}: {}", event.member, event.value))?;
    proxy.get_value("Remaining")?;

    let writer = {
        let list = list.clone();
        thread::spawn(move || {
            for title in titles.iter() {
                list.items.push(Task::new(title));
            }
            let tasks = list.items.get(&Scope::untracked());
            for index in completed {
                match tasks.get(index) {
                    Some(task) => {
                        task.done.set(true);
                    }
                    None => debug!("Ignoring completion, no such task. index: {}", index),
                }
            }
            for index in removed {
                if list.items.remove(index).is_none() {
                    debug!("Ignoring removal, no such task. index: {}", index);
                }
            }
        })
    };

    run_ui_loop(view, writer)?;

    let current = collection_items(&proxy.get_value("Items")?)?;
    let mirror = mirror.lock().clone();
    if mirror != current {
        bail!(
            "Mirrored items diverged. mirror: {}, current: {}",
            ProxyValue::Collection(mirror),
            ProxyValue::Collection(current)
        );
    }

    let titles = current
        .iter()
        .map(|item| title_of(view, item))
        .collect::<Vec<_>>();
    println!("final. Items: [{}], Remaining: {}", titles.join(", "), proxy.get_value("Remaining")?);
    Ok(())
}

/// Delivers notifications on this thread until the domain thread is done and nothing is pending.
fn run_ui_loop(view: &ForView, writer: JoinHandle<()>) -> anyhow::Result<()> {
    let mut passes = 0_usize;
    loop {
        let finished = writer.is_finished();
        if view
            .dispatcher()
            .wait_timeout(POLL_INTERVAL)
            || finished
        {
            let ran = view.drain();
            trace!("run_ui_loop. ran: {}", ran);
            passes += 1;
        }
        if finished && view.dispatcher().pending() == 0 {
            break;
        }
    }
    writer
        .join()
        .map_err(|_| anyhow!("Domain thread panicked"))?;
    debug!("Domain thread finished. drain_passes: {}", passes);
    Ok(())
}

fn collection_items(value: &ProxyValue) -> anyhow::Result<Vec<ProxyValue>> {
    value
        .as_collection()
        .map(|items| items.to_vec())
        .ok_or_else(|| anyhow!("Expected a collection. actual: {}", value.type_name()))
}

fn title_of(view: &ForView, item: &ProxyValue) -> String {
    match view.unwrap::<Task>(item) {
        Some(task) => task.title.get(&Scope::untracked()),
        None => item.to_string(),
    }
}

fn describe_edit(view: &ForView, edit: &CollectionEdit) -> String {
    match edit {
        CollectionEdit::Insert {
            index,
            value,
        } => format!("insert {} {}", index, title_of(view, value)),
        CollectionEdit::Remove {
            index,
        } => format!("remove {}", index),
        CollectionEdit::Replace {
            index,
            value,
        } => format!("replace {} {}", index, title_of(view, value)),
        CollectionEdit::Reset {
            items,
        } => {
            let titles = items
                .iter()
                .map(|item| title_of(view, item))
                .collect::<Vec<_>>();
            format!("reset [{}]", titles.join(", "))
        }
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use rstest::rstest;
use tracking::{Dependent, Independent, Scope, TrackingConfig, TrackingError};

fn counted<T, F>(label: &str, runs: &Arc<AtomicUsize>, compute: F) -> Dependent<T>
where
    T: Clone + PartialEq + Send + 'static,
    F: Fn(&Scope<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
{
    let runs = runs.clone();
    Dependent::try_new(label, move |scope| {
        runs.fetch_add(1, Ordering::SeqCst);
        compute(scope)
    })
}

#[test]
fn write_propagates_through_dependent_chain() {
    // given
    let a = Independent::new(1);
    let b_runs = Arc::new(AtomicUsize::new(0));
    let c_runs = Arc::new(AtomicUsize::new(0));
    let b = {
        let a = a.clone();
        counted("b", &b_runs, move |scope| Ok(a.get(scope) * 10))
    };
    let c = {
        let b = b.clone();
        counted("c", &c_runs, move |scope| Ok(b.get(scope)? + 1))
    };
    let scope = Scope::untracked();
    assert_eq!(c.get(&scope).unwrap(), 11);

    // when
    a.set(2);

    // then
    assert!(!b.is_valid());
    assert!(!c.is_valid());

    // and when
    let value = c.get(&scope).unwrap();
    c.get(&scope).unwrap();

    // then
    assert_eq!(value, 21);
    assert_eq!(b_runs.load(Ordering::SeqCst), 2);
    assert_eq!(c_runs.load(Ordering::SeqCst), 2);
}

#[rstest]
#[case(1)]
#[case(8)]
#[case(64)]
fn long_chains_recompute_each_link_once(#[case] length: usize) {
    // given
    let root = Independent::new(0usize);
    let runs = Arc::new(AtomicUsize::new(0));
    let mut tail = {
        let root = root.clone();
        counted("link 0", &runs, move |scope| Ok(root.get(scope)))
    };
    for index in 1..length {
        let previous = tail.clone();
        tail = counted(&format!("link {}", index), &runs, move |scope| Ok(previous.get(scope)? + 1));
    }
    let scope = Scope::untracked();
    assert_eq!(tail.get(&scope).unwrap(), length - 1);
    runs.store(0, Ordering::SeqCst);

    // when
    root.set(100);
    let value = tail.get(&scope).unwrap();

    // then
    assert_eq!(value, 100 + length - 1);
    assert_eq!(runs.load(Ordering::SeqCst), length);
}

#[test]
fn mutual_recursion_is_reported_as_a_cycle() {
    // given
    let other: Arc<parking_lot::Mutex<Option<Dependent<i32>>>> = Arc::new(parking_lot::Mutex::new(None));
    let ping = {
        let other = other.clone();
        Dependent::try_new("ping", move |scope| {
            let pong = other
                .lock()
                .clone()
                .expect("assigned");
            Ok(pong.get(scope)? + 1)
        })
    };
    let pong = {
        let ping = ping.clone();
        Dependent::try_new("pong", move |scope| Ok(ping.get(scope)? + 1))
    };
    *other.lock() = Some(pong.clone());

    // when
    let result = ping.get(&Scope::untracked());

    // then
    assert!(matches!(result, Err(TrackingError::CyclicDependency { .. })));
    assert!(pong.get(&Scope::untracked()).is_err());
}

#[test]
fn depth_limit_stops_runaway_recursion() {
    // given
    let config = TrackingConfig {
        max_depth: 4,
    };
    let root = Independent::new(0);
    let mut tail = {
        let root = root.clone();
        Dependent::new("link 0", move |scope| root.get(scope))
    };
    for index in 1..10 {
        let previous = tail.clone();
        tail = Dependent::try_new(format!("link {}", index), move |scope| Ok(previous.get(scope)? + 1));
    }

    // when
    let result = tail.get(&Scope::with_config(&config));

    // then
    assert!(matches!(result, Err(TrackingError::DepthExceeded { depth: 5, .. })));
}

/// Builds `length` links, each one more than the previous, reading every link as it is added.
fn chain(root: &Independent<i64>, length: usize) -> Vec<Dependent<i64>> {
    let scope = Scope::untracked();
    let mut links: Vec<Dependent<i64>> = Vec::with_capacity(length);
    for index in 0..length {
        let link = match links.last() {
            Some(previous) => {
                let previous = previous.clone();
                Dependent::try_new(format!("l{}", index), move |scope| Ok(previous.get(scope)? + 1))
            }
            None => {
                let root = root.clone();
                Dependent::new("l0", move |scope| root.get(scope))
            }
        };
        link.get(&scope).unwrap();
        links.push(link);
    }
    links
}

/// Drops from the tail, so releasing a long chain never recurses through the links.
fn release(mut links: Vec<Dependent<i64>>) {
    while let Some(link) = links.pop() {
        drop(link);
    }
}

#[test]
fn depth_overrun_is_retried_by_a_shallower_read() {
    // given
    let root = Independent::new(0_i64);
    let links = chain(&root, 300);
    root.set(1);

    // when
    let result = links[299].get(&Scope::untracked());

    // then
    assert_eq!(
        result,
        Err(TrackingError::DepthExceeded {
            dependent: "l43".to_string(),
            depth: 257,
        })
    );

    // and when
    let shallow = links[100].get(&Scope::untracked());

    // then
    assert_eq!(shallow, Ok(101));
    assert_eq!(links[299].get(&Scope::untracked()), Ok(300));

    release(links);
}

#[test]
fn long_chains_invalidate_without_recursion() {
    // given
    let root = Independent::new(0_i64);
    let links = chain(&root, 10_000);

    // when
    root.set(1);

    // then
    assert!(links.iter().all(|link| !link.is_valid()));

    // and when
    // front to back, every recomputation only reaches the link before it
    let scope = Scope::untracked();
    for link in links.iter() {
        link.get(&scope).unwrap();
    }

    // then
    assert_eq!(links[9_999].get(&scope), Ok(10_000));

    release(links);
}

#[test]
fn concurrent_writes_are_never_lost() {
    // given
    let value = Independent::new(0u64);
    let mirror = {
        let value = value.clone();
        Dependent::new("mirror", move |scope| value.get(scope))
    };

    // when
    let writer = {
        let value = value.clone();
        thread::spawn(move || {
            for next in 1..=2_000u64 {
                value.set(next);
            }
        })
    };
    let reader = {
        let mirror = mirror.clone();
        thread::spawn(move || {
            let scope = Scope::untracked();
            for _ in 0..2_000 {
                mirror.get(&scope).unwrap();
            }
        })
    };
    writer.join().expect("writer panicked");
    reader.join().expect("reader panicked");

    // then
    assert_eq!(mirror.get(&Scope::untracked()).unwrap(), 2_000);
}

#[test]
fn config_defaults_missing_fields() {
    // when
    let config: TrackingConfig = serde_json::from_str("{}").unwrap();

    // then
    assert_eq!(config, TrackingConfig::default());
    assert_eq!(config.max_depth, TrackingConfig::DEFAULT_MAX_DEPTH);
}

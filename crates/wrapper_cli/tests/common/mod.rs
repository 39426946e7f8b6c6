use std::path::PathBuf;

use predicates::prelude::*;
use tempfile::TempDir;

/// Echoes the captured output so failing runs can be diagnosed from the test log.
pub fn print(label: &'static str) -> impl Predicate<str> {
    predicate::function(move |content: &str| {
        println!("{}:\n{}", label, content);
        true
    })
}

pub fn build_temp_file(temp_dir: &TempDir, name: &str, extension: &str) -> PathBuf {
    let mut path = PathBuf::from(temp_dir.path());
    path.push(format!("{}.{}", name, extension));
    path
}

#![deny(missing_docs)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

#[derive(Parser, Debug)]
#[command(name = "wrapper_cli")]
#[command(bin_name = "wrapper_cli")]
#[command(version, about, long_about = None)]
pub(crate) struct Opts {
    #[command(subcommand)]
    pub(crate) command: DemoCommand,

    /// Trace log file
    #[arg(long, num_args = 0..=1, default_missing_value = "trace.log")]
    pub(crate) trace: Option<PathBuf>,

    /// Wrapper configuration, JSON
    #[arg(long, value_name = "CONFIG_FILE")]
    pub(crate) config: Option<PathBuf>,

    #[command(flatten)]
    pub(crate) verbose: Verbosity<InfoLevel>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum DemoCommand {
    /// Count up on a domain thread while the UI thread reports changes
    Counter {
        /// Final count, e.g. '5'
        #[arg(long, default_value_t = 5)]
        to: i64,
    },

    /// Edit a task list on a domain thread and mirror it on the UI thread
    Tasks {
        /// Task titles to add, in order
        #[arg(long = "add", value_name = "TITLE", num_args = 1..)]
        titles: Vec<String>,

        /// Indexes of tasks to mark as done, applied after adding
        #[arg(long = "complete", value_name = "INDEX", num_args = 1..)]
        completed: Vec<usize>,

        /// Indexes of tasks to remove, applied last, in order
        #[arg(long = "remove", value_name = "INDEX", num_args = 1..)]
        removed: Vec<usize>,
    },
}

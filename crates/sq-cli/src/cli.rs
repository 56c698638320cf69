//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sq_core::{SessionId, SleepQuality};

/// Sleep quality tracker.
///
/// Start a session when you go to bed, stop it when you wake up, then rate
/// how well you slept.
#[derive(Debug, Parser)]
#[command(name = "sq", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start tracking a sleep session.
    Start,

    /// Stop the session in progress.
    Stop {
        /// Rate the session right away (0-5 or a name such as `pretty_good`).
        #[arg(short, long)]
        quality: Option<SleepQuality>,
    },

    /// Rate a stopped session.
    Rate {
        /// The session ID (e.g., 3 or #3).
        id: SessionId,

        /// Quality from 0 (very bad) to 5 (excellent), or its name.
        quality: SleepQuality,
    },

    /// Delete every recorded session.
    Clear,

    /// Show current tracking status.
    Status,

    /// Show all sessions, newest first.
    History {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Follow the session list and print changes as they happen.
    Watch {
        /// Exit after this many updates.
        #[arg(long)]
        count: Option<usize>,
    },
}

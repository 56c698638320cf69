//! CLI subcommand implementations.

pub mod clear;
pub mod history;
pub mod rate;
pub mod start;
pub mod status;
pub mod stop;
pub mod util;
pub mod watch;

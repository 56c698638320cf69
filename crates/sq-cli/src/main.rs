use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sq_cli::commands::{clear, history, rate, start, status, stop, watch};
use sq_cli::{Cli, Commands, Config};
use sq_db::SqliteStore;
use sq_engine::{Engine, SystemClock};

/// Load config and open the store, ensuring the parent directory exists.
fn open_store(config_path: Option<&Path>) -> Result<(Arc<SqliteStore>, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok((Arc::new(store), config))
}

/// Open the store and start an engine over it, waiting for the resumed state.
async fn open_engine(config_path: Option<&Path>) -> Result<(Engine, Config)> {
    let (store, config) = open_store(config_path)?;
    let engine = Engine::spawn(store, Arc::new(SystemClock), config.engine());
    engine.ready().await.context("failed to load sessions")?;
    Ok((engine, config))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let mut out = io::stdout().lock();
    let config_path = cli.config.as_deref();

    match &cli.command {
        Some(Commands::Start) => {
            let (engine, _config) = open_engine(config_path).await?;
            start::run(&mut out, &engine, &Local).await?;
        }
        Some(Commands::Stop { quality }) => {
            let (engine, _config) = open_engine(config_path).await?;
            stop::run(&mut out, &engine, *quality).await?;
        }
        Some(Commands::Rate { id, quality }) => {
            let (engine, _config) = open_engine(config_path).await?;
            rate::run(&mut out, &engine, *id, *quality).await?;
        }
        Some(Commands::Clear) => {
            let (engine, _config) = open_engine(config_path).await?;
            clear::run(&mut out, &engine).await?;
        }
        Some(Commands::Status) => {
            let (engine, config) = open_engine(config_path).await?;
            status::run(&mut out, &engine, &config.database_path, &Local)?;
        }
        Some(Commands::History { json }) => {
            let (engine, config) = open_engine(config_path).await?;
            history::run(&mut out, &engine, &config.labels, &Local, *json)?;
        }
        Some(Commands::Watch { count }) => {
            let (store, config) = open_store(config_path)?;
            watch::run(
                &mut out,
                store.as_ref(),
                &config.labels,
                &Local,
                config.watch_interval(),
                *count,
            )
            .await?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(out)?;
        }
    }

    Ok(())
}

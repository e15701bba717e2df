use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use atlas_app::{
    cli::{self, Cli},
    log::{Repository, Ring},
    settings::{self, Settings},
};
use atlas_domain::Service;
use atlas_storage::Sqlite;
use clap::Parser;
use futures::executor::block_on;

/// Number of log entries shown after a failed command.
const RECENT_ENTRIES: usize = 10;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let ring = Arc::new(Ring::default());
    let verbose = cli.verbose;

    match run(cli, Arc::clone(&ring)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            if !verbose {
                print_recent_entries(&ring);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, ring: Arc<Ring>) -> anyhow::Result<()> {
    let stderr_level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    atlas_app::log::init(ring, stderr_level).context("failed to initialize logging")?;

    let config = cli.config.unwrap_or_else(settings::config_path);
    let mut settings = Settings::load(&config)
        .with_context(|| format!("failed to load {}", config.display()))?;
    if let Some(database) = cli.database {
        settings.database = database;
    }
    if let Some(owner) = cli.owner {
        settings.owner_id = owner;
    }
    if !cli.verbose {
        atlas_app::log::set_stderr_level(settings.log_level);
    }

    let database = Sqlite::open(&settings.database)
        .with_context(|| format!("failed to open {}", settings.database.display()))?;
    let service = Service::new(database);
    let output = block_on(cli::run(cli.command, &service, settings.owner_id))?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_recent_entries(ring: &Ring) {
    let Ok(entries) = ring.read_entries() else {
        return;
    };
    if entries.is_empty() {
        return;
    }
    eprintln!("recent log entries:");
    for entry in entries.iter().take(RECENT_ENTRIES).rev() {
        eprintln!("  {} {:<5} {}", entry.time, entry.level, entry.message);
    }
}

//! Command-line interface for the worker
//!
//! `serve` runs the HTTP task server; `fetch` decodes a height range once
//! and prints it without starting the server.

use std::io::{self, Write};

use clap::{Parser, Subcommand};
use tracing::info;

use crate::{
    configuration::{get_configuration, set_configuration, Config, State},
    error::Error,
    types::HeightRange,
};

/// Cosmos indexing worker
#[derive(Parser)]
#[command(name = "cosmos-worker")]
#[command(about = "Cosmos blockchain indexing worker", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the task server (default if no command specified)
    Serve,

    /// Fetch and decode heights [start, end), one JSON line per height
    Fetch {
        /// First height to fetch
        #[arg(long)]
        start: u64,

        /// Height after the last one to fetch
        #[arg(long)]
        end: u64,
    },
}

/// Initialize configuration and return Config
pub fn init_config() -> Result<Config, Error> {
    set_configuration()?;
    get_configuration()
}

/// Decode a height range and write it to stdout
pub async fn run_fetch(config: Config, start: u64, end: u64) -> Result<(), Error> {
    if start == 0 || end <= start {
        return Err(Error::TaskError(format!(
            "empty range [{}, {})",
            start, end
        )));
    }

    let state = State::new(config).await?;
    let mut stream = state.dispatcher.fetcher().fetch(HeightRange::new(start, end));

    info!("fetching heights [{}, {})", start, end);
    let mut stdout = io::stdout();
    let mut heights = 0;
    while let Some(result) = stream.next().await {
        let data = result?;
        serde_json::to_writer(&mut stdout, &data)?;
        stdout.write_all(b"\n")?;
        heights += 1;
    }
    stdout.flush()?;

    let stats = state.stats.snapshot();
    info!(
        "fetched {} heights, {} unknown and {} broken messages",
        heights, stats.unknown_messages, stats.broken_messages
    );

    Ok(())
}

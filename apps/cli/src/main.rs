//! VanBuilder CLI: batch-collect camper van builder listings.
//!
//! Reads a CSV of builder websites, extracts contact and location details,
//! geocodes them, keeps the image CSP allow-list in step, and persists the
//! records to a local directory database.

mod commands;
mod progress;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

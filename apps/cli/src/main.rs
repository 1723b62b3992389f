//! Horoscope CLI: batch horoscope generation for employee spreadsheets.
//!
//! Reads employee records from a directory of spreadsheets, asks a chat
//! completion service for a personal horoscope per employee and saves the
//! results as CSV checkpoints.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

mod artifacts;
mod auth;
mod cli;
mod config;
mod error;
mod mining;
mod output;
mod pipeline;
mod project;
mod providers;
mod records;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting repominer - Repository History Mining Pipeline");
    cli.execute().await?;

    Ok(())
}

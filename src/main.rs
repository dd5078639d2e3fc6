mod assembler;
mod auth;
mod cli;
mod config;
mod error;
mod hierarchy;
mod import;
mod model;
mod output;
mod persist;
mod tracker;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting alm-import");
    cli.execute().await?;

    Ok(())
}

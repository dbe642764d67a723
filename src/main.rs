use anyhow::Result;
use clap::Parser;

mod amount;
mod cli;
mod config;
mod ledger;
mod workflow;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run(cli::args::Cli::parse()).await
}

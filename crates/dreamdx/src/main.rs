//! DreamDX command-line interface.

mod cli;

use clap::Parser;
use cli::Cli;
use dreamdx::{DreamConfig, init_metrics, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = DreamConfig::load(cli.config.as_deref())?;

    let format = cli.log_format.unwrap_or(*config.logging().format());
    init_tracing(format, config.logging().filter())?;
    init_metrics("dreamdx", 60)?;

    cli::handle(cli, config).await
}

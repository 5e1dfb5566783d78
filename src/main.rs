use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use finmetrics::cli::Cli;
use finmetrics::dispatcher;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Logs go to stderr so that --json output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    dispatcher::dispatch(cli).await
}

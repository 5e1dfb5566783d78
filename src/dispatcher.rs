//! Command dispatcher that routes parsed clap `Commands` to their handlers.
//!
//! Handlers share the loaded [`Config`] and the global `--json` flag; each
//! opens the ledger it needs, so nothing touches hledger before a command
//! actually runs.

mod balances;
mod metrics;
mod stocks;
mod treas;
mod vests;

use anyhow::Result;
use std::path::Path;
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::ledger::Ledger;

/// Route a parsed command line to its handler
pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let json_output = cli.json;

    match cli.command {
        Commands::Metrics {
            input,
            url,
            sink,
            dry_run,
        } => {
            let ledger = open_ledger(&config, input.as_deref());
            metrics::dispatch_metrics(&config, &ledger, url, sink, dry_run, json_output).await
        }
        Commands::Balances {
            query,
            input,
            from,
            to,
        } => {
            let ledger = open_ledger(&config, input.as_deref());
            balances::dispatch_balances(&ledger, &query, from.as_deref(), to.as_deref(), json_output)
        }
        Commands::Stocks { input, output } => {
            let ledger = open_ledger(&config, input.as_deref());
            stocks::dispatch_stocks(&ledger, &output, json_output).await
        }
        Commands::Treas { input, output } => {
            let ledger = open_ledger(&config, input.as_deref());
            treas::dispatch_treas(&ledger, &output, json_output)
        }
        Commands::Vests {
            period,
            shares,
            unit,
            company,
            account,
        } => vests::dispatch_vests(&period, shares, &unit, &company, &account, json_output),
    }
}

fn open_ledger(config: &Config, input: Option<&Path>) -> Ledger {
    let path = config.ledger_path(input);
    debug!("Using ledger {:?} via {}", path, config.hledger_bin);
    Ledger::new(path, config.hledger_bin.clone())
}

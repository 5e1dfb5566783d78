use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::SinkKind;

pub mod formatters;

#[derive(Parser)]
#[command(name = "finmetrics")]
#[command(version, about = "Time-series metrics and price upkeep for hledger journals")]
#[command(
    long_about = "Turn an hledger journal into daily account and commodity time series for Prometheus or VictoriaMetrics, and keep the journal's market prices, treasury bills and vest forecasts up to date."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Config file (defaults to <config dir>/finmetrics/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Publish account and commodity series for the whole ledger
    Metrics {
        /// Ledger file to read (defaults to $LEDGER_FILE)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Metrics store URL
        #[arg(short, long)]
        url: Option<String>,

        /// Metrics store kind
        #[arg(long, value_enum)]
        sink: Option<SinkKind>,

        /// Build the series and show a summary without publishing
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Show the daily value of the accounts matching a query
    Balances {
        /// hledger account query, e.g. assets:bank
        query: String,

        /// Ledger file to read (defaults to $LEDGER_FILE)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// First date to show (YYYY-MM-DD), defaults to the ledger start
        #[arg(long)]
        from: Option<String>,

        /// Last date to show, exclusive (YYYY-MM-DD), defaults to the ledger end
        #[arg(long)]
        to: Option<String>,
    },

    /// Append missing stock closing prices to a journal
    Stocks {
        /// Ledger file to read (defaults to $LEDGER_FILE)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Journal file to append prices to
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Append issue and maturity prices for new treasury bills
    Treas {
        /// Ledger file to read (defaults to $LEDGER_FILE)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Journal file to append prices to
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print a sell-to-cover vesting forecast transaction
    Vests {
        /// hledger period expression, e.g. "every 3 months from 2024-02-15"
        #[arg(short, long)]
        period: String,

        /// Number of shares vesting
        #[arg(short, long)]
        shares: u64,

        /// Stock unit
        #[arg(short, long)]
        unit: String,

        /// Income company
        #[arg(short, long)]
        company: String,

        /// Investment account
        #[arg(short, long)]
        account: String,
    },
}

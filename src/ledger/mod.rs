// Ledger module - hledger invocation and output parsing

mod parse;

pub use parse::{parse_amount, parse_prices, parse_register_tsv, parse_stats, DEFAULT_COMMODITY};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info};

use crate::commodity::CommodityValue;
use crate::error::FinmetricsError;
use crate::register::Register;

/// A change in quantity of a commodity in an account at some date.
///
/// Ordering is by date, then account, commodity and quantity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub account: String,
    pub commodity: String,
    pub quantity: Decimal,
}

impl Transaction {
    /// Identity of the time series this transaction belongs to
    pub fn group_key(&self) -> (String, String) {
        (self.account.clone(), self.commodity.clone())
    }
}

/// Ledger statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Earliest date each (account, commodity) pair appears
pub fn first_appearances(transactions: &[Transaction]) -> HashMap<(String, String), NaiveDate> {
    let mut starts: HashMap<(String, String), NaiveDate> = HashMap::new();
    for t in transactions {
        starts
            .entry(t.group_key())
            .and_modify(|d| *d = (*d).min(t.date))
            .or_insert(t.date);
    }
    starts
}

/// Earliest date each commodity appears in any account
pub fn commodity_first_appearances(transactions: &[Transaction]) -> HashMap<String, NaiveDate> {
    let mut starts: HashMap<String, NaiveDate> = HashMap::new();
    for t in transactions {
        starts
            .entry(t.commodity.clone())
            .and_modify(|d| *d = (*d).min(t.date))
            .or_insert(t.date);
    }
    starts
}

/// Reads ledger data through the `hledger` command line tool.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: Option<PathBuf>,
    binary: String,
}

impl Ledger {
    /// Ledger reading from the file at `path`, or hledger's own default file
    /// (`$LEDGER_FILE`, `~/.hledger.journal`) when `None`.
    pub fn new(path: Option<PathBuf>, binary: impl Into<String>) -> Self {
        Self {
            path,
            binary: binary.into(),
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let mut command = Command::new(&self.binary);
        command.args(args);
        if let Some(path) = &self.path {
            command.arg("-f").arg(path);
        }

        debug!("Running {:?}", command);
        let output = command
            .output()
            .with_context(|| format!("Failed to run {}", self.binary))?;

        if !output.status.success() {
            return Err(FinmetricsError::Ledger(format!(
                "{} {} exited with {}: {}",
                self.binary,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))
            .into());
        }

        String::from_utf8(output.stdout)
            .with_context(|| format!("{} produced non UTF-8 output", self.binary))
    }

    /// All the accounts in the ledger
    pub fn accounts(&self) -> Result<Vec<String>> {
        Ok(self.run(&["accounts"])?.lines().map(str::to_string).collect())
    }

    /// All the commodities in the ledger
    pub fn commodities(&self) -> Result<Vec<String>> {
        Ok(self
            .run(&["commodities"])?
            .lines()
            .map(str::to_string)
            .collect())
    }

    /// All commodity prices, optionally including ones inferred from transactions
    pub fn prices(&self, infer: bool) -> Result<Vec<CommodityValue>> {
        let mut args = vec!["prices"];
        if infer {
            args.push("--infer-market-prices");
        }
        parse_prices(&self.run(&args)?)
    }

    /// Transactions, combined per (account, date, commodity)
    pub fn transactions(&self, forecast_only: bool) -> Result<Vec<Transaction>> {
        let mut args = vec!["register", "-O", "tsv"];
        if forecast_only {
            args.extend(["--forecast=2010..", "tag:generated"]);
        }

        let transactions = parse_register_tsv(&self.run(&args)?)?;
        info!("Loaded {} transactions from ledger", transactions.len());
        Ok(transactions)
    }

    /// Running balances for the accounts matching `query`
    pub fn register(&self, query: &str) -> Result<Register> {
        let tsv = self.run(&["register", query, "-O", "tsv"])?;
        Register::from_tsv(query, &tsv)
    }

    pub fn stats(&self) -> Result<Stats> {
        parse_stats(&self.run(&["stats"])?)
    }
}

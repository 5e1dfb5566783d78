use anyhow::Result;
use chrono::{Days, Local, NaiveDate};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crate::cli::formatters::{format_appended, format_json};
use crate::commodity::{CommodityType, CommodityValue};
use crate::journal::{append_lines, price_directive};
use crate::ledger::Ledger;
use crate::pricing::PriceCache;

/// Prices older than this are fetched at `HISTORY_STEP_DAYS` cadence
const RECENT_DAYS: u64 = 90;
const HISTORY_STEP_DAYS: u64 = 30;

/// (from, to, step_days) fetch windows covering `[start, today]`
fn fetch_windows(start: NaiveDate, today: NaiveDate) -> Vec<(NaiveDate, NaiveDate, u64)> {
    let end = today + Days::new(1);
    let recent = (today - Days::new(RECENT_DAYS)).max(start);

    let mut windows = Vec::new();
    if start < recent {
        windows.push((start, recent, HISTORY_STEP_DAYS));
    }
    if recent < end {
        windows.push((recent, end, 1));
    }
    windows
}

/// Fetched prices the ledger has no entry for, one per (name, date), by date
fn new_prices(
    mut fetched: Vec<CommodityValue>,
    existing: &HashSet<(String, NaiveDate)>,
) -> Vec<CommodityValue> {
    fetched.retain(|v| !existing.contains(&(v.name.clone(), v.date)));
    fetched.sort();
    fetched.dedup_by(|a, b| a.name == b.name && a.date == b.date);
    fetched
}

pub async fn dispatch_stocks(ledger: &Ledger, output: &Path, json_output: bool) -> Result<()> {
    let symbols: BTreeSet<String> = ledger
        .commodities()?
        .into_iter()
        .filter(|c| CommodityType::of(c) == CommodityType::Stock)
        .collect();
    tracing::info!("Found {} stock commodities", symbols.len());

    let mut fetched = Vec::new();
    if !symbols.is_empty() {
        let stats = ledger.stats()?;
        let mut cache = PriceCache::new()?;
        for (from, to, step) in fetch_windows(stats.start, Local::now().date_naive()) {
            fetched.extend(cache.closes(&symbols, from, to, step).await);
        }
    }

    let existing: HashSet<(String, NaiveDate)> = ledger
        .prices(false)?
        .into_iter()
        .map(|v| (v.name, v.date))
        .collect();
    let lines: Vec<String> = new_prices(fetched, &existing)
        .iter()
        .map(price_directive)
        .collect();

    if json_output {
        println!("{}", format_json(&lines));
    } else {
        print!("{}", format_appended(&lines, output));
    }
    append_lines(output, &lines)
}

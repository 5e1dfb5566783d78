// Pricing module - market data for stock commodities

pub mod yahoo;

use anyhow::Result;
use chrono::NaiveDate;
use reqwest::Client;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::commodity::{intrinsic_values, CommodityType, CommodityValue};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    symbol: String,
    from: NaiveDate,
    to: NaiveDate,
}

/// Memo of fetched daily closes, owned by one ledger run.
///
/// The cache is created for a run and passed by `&mut` to whatever needs
/// prices; [`PriceCache::clear`] drops everything fetched so far.
pub struct PriceCache {
    client: Client,
    entries: HashMap<CacheKey, Vec<CommodityValue>>,
}

impl PriceCache {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(yahoo::build_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            entries: HashMap::new(),
        }
    }

    /// Seed the cache with known closes for a range
    pub fn insert(
        &mut self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
        values: Vec<CommodityValue>,
    ) {
        self.entries.insert(
            CacheKey {
                symbol: symbol.to_string(),
                from,
                to,
            },
            values,
        );
    }

    /// Daily closes of `symbol` from `from` (inclusive) to `to` (exclusive)
    pub async fn daily_closes(
        &mut self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CommodityValue>> {
        let key = CacheKey {
            symbol: symbol.to_string(),
            from,
            to,
        };
        if let Some(values) = self.entries.get(&key) {
            debug!("Using cached closes for {} ({} values)", symbol, values.len());
            return Ok(values.clone());
        }

        let values = yahoo::fetch_daily_closes(&self.client, symbol, from, to).await?;
        self.entries.insert(key, values.clone());
        Ok(values)
    }

    /// Closes of every symbol, keeping at most one per `step_days` window.
    ///
    /// A symbol that cannot be fetched is skipped with a warning so the rest
    /// of the run can still complete.
    pub async fn closes(
        &mut self,
        symbols: &BTreeSet<String>,
        from: NaiveDate,
        to: NaiveDate,
        step_days: u64,
    ) -> Vec<CommodityValue> {
        let mut values = Vec::new();
        for symbol in symbols {
            match self.daily_closes(symbol, from, to).await {
                Ok(closes) => values.extend(thin(closes, from, step_days)),
                Err(e) => warn!("Skipping prices for {}: {:#}", symbol, e),
            }
        }
        values
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        info!("Price cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// First value in each `step_days` window counted from `from`
fn thin(mut values: Vec<CommodityValue>, from: NaiveDate, step_days: u64) -> Vec<CommodityValue> {
    let step = step_days.max(1) as i64;
    if step == 1 {
        return values;
    }

    values.sort();
    let mut last_window = None;
    values.retain(|v| {
        let window = (v.date - from).num_days().div_euclid(step);
        if last_window == Some(window) {
            false
        } else {
            last_window = Some(window);
            true
        }
    });
    values
}

/// Daily values of `commodities` from `start` (inclusive) to `end` (exclusive).
///
/// Intrinsics and treasury bills are generated locally; stocks come from the
/// market data provider through `cache`. Other commodities get no values here.
pub async fn market_values(
    cache: &mut PriceCache,
    commodities: &BTreeSet<String>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<CommodityValue>> {
    let mut values = intrinsic_values(commodities, start, end)?;

    let stocks: BTreeSet<String> = commodities
        .iter()
        .filter(|c| CommodityType::of(c) == CommodityType::Stock)
        .cloned()
        .collect();
    if !stocks.is_empty() {
        values.extend(cache.closes(&stocks, start, end, 1).await);
    }

    info!(
        "Resolved {} market values for {} commodities",
        values.len(),
        commodities.len()
    );
    Ok(values)
}

//! Ledger to metrics composition
//!
//! Turns raw ledger transactions and commodity prices into aligned daily
//! series: per-account running totals, their market value, and the unit value
//! of every commodity held.

use anyhow::Result;
use chrono::{Days, NaiveDate};
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::commodity::{CommodityType, CommodityValue, PriceTable};
use crate::ledger::{commodity_first_appearances, first_appearances, Ledger, Transaction};
use crate::metrics::{labels, Series};
use crate::pricing::{market_values, PriceCache};
use crate::register::{CommodityValuer, Register};
use crate::series::{cumulative_sum, date_range, fill};

pub const ACCOUNT_TOTAL: &str = "finances_account_total";
pub const ACCOUNT_VALUE: &str = "finances_account_value";
pub const ACCOUNT_BALANCE: &str = "finances_account_balance";
pub const COMMODITY_VALUE: &str = "finances_commodity_value";

/// Pattern matching every series this crate publishes
pub const SERIES_PATTERN: &str = "finances.*";

/// Running total of one (account, commodity) pair at a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSample {
    pub transaction: Transaction,
    pub total: Decimal,
}

/// Daily running totals of every (account, commodity) pair.
///
/// Each pair gets a zero-quantity transaction on every day of
/// `[start, end)` it has none, then quantities are accumulated in date order.
/// Days before the pair's first real transaction are dropped.
pub fn account_samples(
    transactions: &[Transaction],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<AccountSample> {
    let starts = first_appearances(transactions);

    let mut filled = fill(
        transactions.iter().cloned(),
        date_range(start, end, 1),
        |t| t.date,
        Transaction::group_key,
        |date, group: &(String, String), _: &Transaction| Transaction {
            date,
            account: group.0.clone(),
            commodity: group.1.clone(),
            quantity: Decimal::ZERO,
        },
    );
    filled.sort();
    debug!("Filled {} transactions to {}", transactions.len(), filled.len());

    cumulative_sum(filled, Transaction::group_key, |t| t.quantity, Decimal::ZERO)
        .filter(|(t, _)| {
            starts
                .get(&t.group_key())
                .is_some_and(|first| t.date >= *first)
        })
        .map(|(transaction, total)| AccountSample { transaction, total })
        .collect()
}

/// Moves each commodity's latest value before `start` onto `start` and drops
/// its older ones. A value already dated `start` wins over the moved one.
fn anchor_at_start(values: Vec<CommodityValue>, start: NaiveDate) -> Vec<CommodityValue> {
    let (earlier, mut kept): (Vec<_>, Vec<_>) = values.into_iter().partition(|v| v.date < start);
    let on_start: BTreeSet<String> = kept
        .iter()
        .filter(|v| v.date == start)
        .map(|v| v.name.clone())
        .collect();

    let mut latest: HashMap<String, CommodityValue> = HashMap::new();
    for value in earlier {
        match latest.get(&value.name) {
            Some(seen) if seen.date > value.date => {}
            _ => {
                latest.insert(value.name.clone(), value);
            }
        }
    }

    kept.extend(
        latest
            .into_values()
            .filter(|v| !on_start.contains(&v.name))
            .map(|v| CommodityValue { date: start, ..v }),
    );
    kept
}

/// Daily unit values of every commodity over `[start, end)`.
///
/// Gaps carry the nearest known value forward, starting from the latest
/// value at or before `start`. A commodity listed in `starts` is only tracked
/// from that date on.
pub fn commodity_table(
    values: Vec<CommodityValue>,
    start: NaiveDate,
    end: NaiveDate,
    starts: &HashMap<String, NaiveDate>,
) -> PriceTable {
    let filled = fill(
        anchor_at_start(values, start),
        date_range(start, end, 1),
        |v| v.date,
        |v| v.name.clone(),
        |date, name: &String, nearest: &CommodityValue| CommodityValue {
            date,
            name: name.clone(),
            value: nearest.value,
        },
    );

    let table: PriceTable = filled
        .into_iter()
        .filter(|v| starts.get(&v.name).map_or(true, |first| v.date >= *first))
        .collect();
    debug!("Filled commodity table to {} values", table.len());
    table
}

/// Metric series for account totals, account values and commodity values.
///
/// An account sample whose commodity has no price that day is left out of
/// the value series.
pub fn build_series(samples: &[AccountSample], prices: &PriceTable) -> Vec<Series> {
    let groups = samples
        .iter()
        .into_group_map_by(|s| s.transaction.group_key());

    let mut series = Vec::with_capacity(groups.len() * 2 + prices.names().len());
    for ((account, commodity), group) in groups.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
        let pair = labels([("name", account.as_str()), ("commodity", commodity.as_str())]);
        let mut total = Series::new(ACCOUNT_TOTAL, pair.clone());
        let mut value = Series::new(ACCOUNT_VALUE, pair);

        for sample in group {
            let date = sample.transaction.date;
            total.samples.insert(date, sample.total);

            match prices.get(&commodity, date) {
                Some(price) => {
                    value.samples.insert(date, sample.total * price);
                }
                None => warn!("No price for {} on {}, skipping {} value", commodity, date, account),
            }
        }

        series.push(total);
        series.push(value);
    }

    for name in prices.names() {
        let Some(history) = prices.history(name) else {
            continue;
        };
        let kind = CommodityType::of(name);
        let mut s = Series::new(
            COMMODITY_VALUE,
            labels([("name", name), ("type", kind.as_str())]),
        );
        s.samples.extend(history.iter().map(|(d, v)| (*d, *v)));
        series.push(s);
    }

    series
}

/// Value of an account over `dates`, following the account's lifecycle.
pub fn balance_series<V: CommodityValuer + ?Sized>(
    mut register: Register,
    dates: &[NaiveDate],
    valuer: &V,
) -> Series {
    register.fill(dates, valuer);

    let mut series = Series::new(ACCOUNT_BALANCE, labels([("name", register.account())]));
    series
        .samples
        .extend(register.rows().iter().map(|r| (r.date, r.value(valuer))));
    series
}

/// Every metric series for the ledger, pricing stocks through `cache`.
///
/// Commodities without generated or market values are priced from the
/// ledger's own (inferred) prices.
pub async fn ledger_series(ledger: &Ledger, cache: &mut PriceCache) -> Result<Vec<Series>> {
    let accounts = ledger.accounts()?;
    info!("Found {} accounts", accounts.len());

    let transactions = ledger.transactions(false)?;
    let (Some(first), Some(last)) = (
        transactions.iter().map(|t| t.date).min(),
        transactions.iter().map(|t| t.date).max(),
    ) else {
        warn!("Ledger has no transactions");
        return Ok(Vec::new());
    };
    let start = first;
    let end = last + Days::new(1);
    info!(
        "Found {} transactions from {} to {}",
        transactions.len(),
        start,
        end
    );

    let commodities: BTreeSet<String> = transactions.iter().map(|t| t.commodity.clone()).collect();
    info!("Found {} distinct commodities", commodities.len());

    let mut values = market_values(cache, &commodities, start, end).await?;
    let priced: BTreeSet<&str> = values.iter().map(|v| v.name.as_str()).collect();
    let missing: BTreeSet<String> = commodities
        .iter()
        .filter(|c| !priced.contains(c.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        debug!("Inferring ledger prices for {:?}", missing);
        values.extend(
            ledger
                .prices(true)?
                .into_iter()
                .filter(|v| missing.contains(&v.name)),
        );
    }
    info!("Found {} commodity values", values.len());

    let samples = account_samples(&transactions, start, end);
    let prices = commodity_table(values, start, end, &commodity_first_appearances(&transactions));
    info!(
        "Filled to {} account samples and {} commodity values",
        samples.len(),
        prices.len()
    );

    Ok(build_series(&samples, &prices))
}

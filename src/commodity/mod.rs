//! Commodity classification and unit values
//!
//! Commodities in the ledger fall into a few families: intrinsic currencies
//! and bonds worth one unit, treasury bills worth one unit over their
//! lifetime, exchange-listed stocks priced by a market data provider, and
//! everything else (priced from the ledger itself).

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::FinmetricsError;
use crate::register::CommodityValuer;
use crate::series::date_range;

static TBILL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*\((.*) - (.*)\).*$").expect("valid tbill pattern"));

/// Value of one unit of a commodity at a date.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CommodityValue {
    pub date: NaiveDate,
    pub name: String,
    pub value: Decimal,
}

/// General classification of a commodity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CommodityType {
    Intrinsic, // USD and bonds
    TBill,     // Treasury bills, e.g. "TBill (2024-01-02 - 2024-07-02)"
    Stock,     // Upper-case ticker symbols
    Other,
}

impl CommodityType {
    pub fn of(commodity: &str) -> Self {
        if commodity == "USD" || commodity.contains("Bond") {
            CommodityType::Intrinsic
        } else if commodity.contains("TBill") {
            CommodityType::TBill
        } else if !commodity.is_empty() && commodity.chars().all(|c| c.is_ascii_uppercase()) {
            CommodityType::Stock
        } else {
            CommodityType::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommodityType::Intrinsic => "intrinsic",
            CommodityType::TBill => "tbill",
            CommodityType::Stock => "stock",
            CommodityType::Other => "other",
        }
    }
}

impl fmt::Display for CommodityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue and maturity dates embedded in a treasury bill's name
pub fn tbill_lifetime(name: &str) -> Option<(NaiveDate, NaiveDate)> {
    let captures = TBILL_PATTERN.captures(name)?;
    let start = NaiveDate::parse_from_str(captures.get(1)?.as_str().trim(), "%Y-%m-%d").ok()?;
    let end = NaiveDate::parse_from_str(captures.get(2)?.as_str().trim(), "%Y-%m-%d").ok()?;
    Some((start, end))
}

/// Values that need no market data, from `start` (inclusive) to `end` (exclusive).
///
/// Intrinsics are worth one every day. Treasury bills are worth one every day
/// of their lifetime that falls inside the range. A bill whose name carries
/// no lifetime is an error.
pub fn intrinsic_values<'a>(
    commodities: impl IntoIterator<Item = &'a String>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<CommodityValue>, FinmetricsError> {
    let mut values = Vec::new();

    for name in commodities {
        let (from, to) = match CommodityType::of(name) {
            CommodityType::Intrinsic => (start, end),
            CommodityType::TBill => {
                let (issued, matures) = tbill_lifetime(name).ok_or_else(|| {
                    FinmetricsError::Parse(format!("treasury does not match pattern: {}", name))
                })?;
                (start.max(issued), end.min(matures))
            }
            _ => continue,
        };

        values.extend(date_range(from, to, 1).map(|date| CommodityValue {
            date,
            name: name.clone(),
            value: Decimal::ONE,
        }));
    }

    Ok(values)
}

/// Unit prices per commodity and date.
///
/// Lookups through [`CommodityValuer`] fall back to the latest earlier price,
/// then to one for intrinsics and treasury bills, then to zero.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    prices: HashMap<String, BTreeMap<NaiveDate, Decimal>>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: CommodityValue) {
        self.prices
            .entry(value.name)
            .or_default()
            .insert(value.date, value.value);
    }

    /// Exact price of `name` on `date`
    pub fn get(&self, name: &str, date: NaiveDate) -> Option<Decimal> {
        self.prices.get(name)?.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Commodity names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.prices.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Prices of one commodity, ordered by date
    pub fn history(&self, name: &str) -> Option<&BTreeMap<NaiveDate, Decimal>> {
        self.prices.get(name)
    }
}

impl FromIterator<CommodityValue> for PriceTable {
    fn from_iter<I: IntoIterator<Item = CommodityValue>>(iter: I) -> Self {
        let mut table = PriceTable::new();
        for value in iter {
            table.insert(value);
        }
        table
    }
}

impl CommodityValuer for PriceTable {
    fn value(&self, commodity: &str, date: NaiveDate) -> Decimal {
        let known = self
            .prices
            .get(commodity)
            .and_then(|history| history.range(..=date).next_back())
            .map(|(_, price)| *price);

        match known {
            Some(price) => price,
            None => match CommodityType::of(commodity) {
                CommodityType::Intrinsic | CommodityType::TBill => Decimal::ONE,
                _ => Decimal::ZERO,
            },
        }
    }
}

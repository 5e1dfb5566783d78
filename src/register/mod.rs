//! Per-account balance registers
//!
//! A [`Register`] is the sorted sequence of balance snapshots hledger prints
//! for one account query. [`Register::fill`] aligns it onto a target date
//! sequence using an account-lifecycle policy: gaps between known entries
//! carry a balance, dates before the first entry are not invented, and a
//! balance that reaches zero is treated as a closed account.

mod fill;

pub use fill::FillState;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::FinmetricsError;
use crate::ledger::parse_amount;

/// Market value of one unit of a commodity at a date.
pub trait CommodityValuer {
    fn value(&self, commodity: &str, date: NaiveDate) -> Decimal;
}

/// A commodity amount, e.g. `12.5 AAPL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub amount: Decimal,
    pub commodity: String,
}

impl FromStr for Balance {
    type Err = FinmetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (amount, commodity) = parse_amount(s)?;
        Ok(Balance { amount, commodity })
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.commodity)
    }
}

/// Balances of an account at the end of a date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRow {
    pub date: NaiveDate,
    pub balances: Vec<Balance>,
}

impl RegisterRow {
    pub fn new(date: NaiveDate, balances: Vec<Balance>) -> Self {
        Self { date, balances }
    }

    /// Sum of every balance valued at this row's date
    pub fn value<V: CommodityValuer + ?Sized>(&self, valuer: &V) -> Decimal {
        self.balances
            .iter()
            .map(|b| b.amount * valuer.value(&b.commodity, self.date))
            .sum()
    }

    /// Copy of this row stamped with another date
    pub fn restamp(&self, date: NaiveDate) -> Self {
        Self {
            date,
            balances: self.balances.clone(),
        }
    }
}

/// Balance snapshots for a particular account, sorted by date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    account: String,
    rows: Vec<RegisterRow>,
}

impl Register {
    /// Build a register from snapshots in any order.
    ///
    /// When several snapshots share a date only the last one is kept, since
    /// it holds the end-of-day balance.
    pub fn new(account: impl Into<String>, mut rows: Vec<RegisterRow>) -> Self {
        rows.sort_by_key(|r| r.date);

        let mut collapsed: Vec<RegisterRow> = Vec::with_capacity(rows.len());
        for row in rows {
            match collapsed.last_mut() {
                Some(last) if last.date == row.date => *last = row,
                _ => collapsed.push(row),
            }
        }

        Self {
            account: account.into(),
            rows: collapsed,
        }
    }

    /// Parse `hledger register -O tsv` output.
    ///
    /// Columns are `txnidx, date, code, description, account, amount, total`;
    /// the running total column becomes the row balances.
    pub fn from_tsv(account: impl Into<String>, tsv: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(tsv.as_bytes());

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.context("Failed to read register row")?;
            let line = idx + 2;

            let date = record
                .get(1)
                .ok_or_else(|| FinmetricsError::Parse(format!("line {}: missing date", line)))?;
            let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|e| {
                FinmetricsError::Parse(format!("line {}: invalid date '{}': {}", line, date, e))
            })?;

            let total = record
                .get(6)
                .ok_or_else(|| FinmetricsError::Parse(format!("line {}: missing total", line)))?;
            let balances = total
                .split(", ")
                .map(str::parse::<Balance>)
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Invalid register total on line {}", line))?;

            rows.push(RegisterRow::new(date, balances));
        }

        let register = Self::new(account, rows);
        debug!(
            "Parsed {} register rows for {}",
            register.rows.len(),
            register.account
        );
        Ok(register)
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn rows(&self) -> &[RegisterRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Replace the rows with a version aligned onto `dates` (sorted ascending).
    ///
    /// - dates before the first snapshot produce nothing
    /// - a date between snapshots is filled with a copy of the *next*
    ///   snapshot, unless that snapshot is valued at zero
    /// - real snapshots between target dates are copied through
    /// - dates after the last snapshot carry it forward, unless it is valued
    ///   at zero, in which case filling stops
    ///
    /// Empty rows or empty `dates` leave the register untouched.
    pub fn fill<V: CommodityValuer + ?Sized>(&mut self, dates: &[NaiveDate], valuer: &V) {
        if self.rows.is_empty() || dates.is_empty() {
            return;
        }

        let filled = fill::RegisterFiller::new(&self.rows, dates, valuer).run();
        debug!(
            "Filled register {} from {} to {} rows over {} dates",
            self.account,
            self.rows.len(),
            filled.len(),
            dates.len()
        );
        self.rows = filled;
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} rows)", self.account, self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    /// Fixed unit prices; anything unknown is worth one
    struct Prices(HashMap<&'static str, Decimal>);

    impl CommodityValuer for Prices {
        fn value(&self, commodity: &str, _date: NaiveDate) -> Decimal {
            self.0.get(commodity).copied().unwrap_or(Decimal::ONE)
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn usd(amount: Decimal) -> Balance {
        Balance {
            amount,
            commodity: "USD".to_string(),
        }
    }

    fn row(day: u32, amount: Decimal) -> RegisterRow {
        RegisterRow::new(d(day), vec![usd(amount)])
    }

    fn values(register: &Register) -> Vec<(NaiveDate, Decimal)> {
        let prices = Prices(HashMap::new());
        register
            .rows()
            .iter()
            .map(|r| (r.date, r.value(&prices)))
            .collect()
    }

    fn days(from: u32, to: u32) -> Vec<NaiveDate> {
        (from..=to).map(d).collect()
    }

    #[test]
    fn test_balance_parsing() {
        let b: Balance = "12.5 AAPL".parse().unwrap();
        assert_eq!(b.amount, dec!(12.5));
        assert_eq!(b.commodity, "AAPL");

        let b: Balance = "-3".parse().unwrap();
        assert_eq!(b, usd(dec!(-3)));

        assert!("abc USD".parse::<Balance>().is_err());
    }

    #[test]
    fn test_row_value_uses_valuer() {
        let prices = Prices(HashMap::from([("AAPL", dec!(100))]));
        let r = RegisterRow::new(
            d(1),
            vec![
                usd(dec!(5)),
                Balance {
                    amount: dec!(2),
                    commodity: "AAPL".to_string(),
                },
            ],
        );
        assert_eq!(r.value(&prices), dec!(205));
    }

    #[test]
    fn test_new_sorts_and_keeps_last_row_per_date() {
        let register = Register::new(
            "assets:bank",
            vec![row(3, dec!(30)), row(1, dec!(10)), row(3, dec!(35))],
        );
        assert_eq!(values(&register), vec![(d(1), dec!(10)), (d(3), dec!(35))]);
    }

    #[test]
    fn test_from_tsv() {
        let tsv = "txnidx\tdate\tcode\tdescription\taccount\tamount\ttotal\n\
                   1\t2024-01-01\t\tOpening\tassets:bank\t100 USD\t100 USD\n\
                   2\t2024-01-03\t\tBuy\tassets:bank\t2 AAPL\t100 USD, 2 AAPL\n";
        let register = Register::from_tsv("assets:bank", tsv).unwrap();

        assert_eq!(register.account(), "assets:bank");
        assert_eq!(register.rows().len(), 2);
        assert_eq!(register.rows()[1].balances.len(), 2);
        assert_eq!(register.rows()[1].balances[1].commodity, "AAPL");
    }

    #[test]
    fn test_from_tsv_rejects_bad_date() {
        let tsv = "txnidx\tdate\tcode\tdescription\taccount\tamount\ttotal\n\
                   1\t01/02/2024\t\tx\tassets:bank\t1\t1\n";
        assert!(Register::from_tsv("assets:bank", tsv).is_err());
    }

    #[test]
    fn test_fill_carries_last_non_zero_balance_forward() {
        let mut register = Register::new("a", vec![row(1, dec!(10))]);
        register.fill(&days(1, 4), &Prices(HashMap::new()));

        assert_eq!(
            values(&register),
            vec![
                (d(1), dec!(10)),
                (d(2), dec!(10)),
                (d(3), dec!(10)),
                (d(4), dec!(10)),
            ]
        );
    }

    #[test]
    fn test_fill_does_not_invent_leading_rows() {
        let mut register = Register::new("a", vec![row(3, dec!(10)), row(4, dec!(12))]);
        register.fill(&days(1, 4), &Prices(HashMap::new()));

        assert_eq!(values(&register), vec![(d(3), dec!(10)), (d(4), dec!(12))]);
    }

    #[test]
    fn test_fill_between_rows_copies_next_row() {
        let mut register = Register::new("a", vec![row(1, dec!(5)), row(4, dec!(8))]);
        register.fill(&days(1, 4), &Prices(HashMap::new()));

        assert_eq!(
            values(&register),
            vec![
                (d(1), dec!(5)),
                (d(2), dec!(8)),
                (d(3), dec!(8)),
                (d(4), dec!(8)),
            ]
        );
    }

    #[test]
    fn test_fill_stops_after_zero_balance() {
        let mut register = Register::new("a", vec![row(1, dec!(5)), row(3, dec!(0))]);
        register.fill(&days(1, 5), &Prices(HashMap::new()));

        assert_eq!(values(&register), vec![(d(1), dec!(5)), (d(3), dec!(0))]);
    }

    #[test]
    fn test_fill_passes_through_rows_between_sparse_dates() {
        let mut register = Register::new(
            "a",
            vec![row(1, dec!(1)), row(2, dec!(2)), row(3, dec!(3)), row(6, dec!(6))],
        );
        register.fill(&[d(1), d(6)], &Prices(HashMap::new()));

        assert_eq!(
            values(&register),
            vec![
                (d(1), dec!(1)),
                (d(2), dec!(2)),
                (d(3), dec!(3)),
                (d(6), dec!(6)),
            ]
        );
    }

    #[test]
    fn test_fill_values_with_market_prices() {
        // 2 AAPL is worth zero once the price drops to zero
        let prices = Prices(HashMap::from([("AAPL", dec!(0))]));
        let mut register = Register::new(
            "a",
            vec![RegisterRow::new(
                d(1),
                vec![Balance {
                    amount: dec!(2),
                    commodity: "AAPL".to_string(),
                }],
            )],
        );
        register.fill(&days(1, 3), &prices);

        assert_eq!(register.rows().len(), 1);
    }

    #[test]
    fn test_fill_empty_inputs_are_noops() {
        let mut empty = Register::new("a", Vec::new());
        empty.fill(&days(1, 3), &Prices(HashMap::new()));
        assert!(empty.is_empty());

        let mut register = Register::new("a", vec![row(2, dec!(1))]);
        let before = register.clone();
        register.fill(&[], &Prices(HashMap::new()));
        assert_eq!(register, before);
    }
}

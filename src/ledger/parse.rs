use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use super::{Stats, Transaction};
use crate::commodity::CommodityValue;
use crate::error::FinmetricsError;

/// Commodity hledger prints amounts in when none is given
pub const DEFAULT_COMMODITY: &str = "USD";

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid date pattern"));

/// Split an hledger amount into quantity and commodity.
///
/// `"12.5 AAPL"` is 12.5 units of `AAPL`; a bare number is in [`DEFAULT_COMMODITY`].
/// Quotes around the commodity and thousands separators are dropped.
pub fn parse_amount(text: &str) -> Result<(Decimal, String), FinmetricsError> {
    let text = text.trim();
    let (quantity, commodity) = match text.split_once(' ') {
        Some((quantity, commodity)) => (quantity, commodity.replace('"', "")),
        None => (text, DEFAULT_COMMODITY.to_string()),
    };

    let quantity = Decimal::from_str(&quantity.replace(',', ""))
        .map_err(|e| FinmetricsError::Parse(format!("invalid amount '{}': {}", text, e)))?;

    Ok((quantity, commodity))
}

fn parse_date(text: &str) -> Result<NaiveDate, FinmetricsError> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|e| FinmetricsError::Parse(format!("invalid date '{}': {}", text, e)))
}

/// Parse `hledger register -O tsv` output into transactions.
///
/// Postings sharing an (account, date, commodity) are summed into a single
/// transaction, kept at the position of the first one.
pub fn parse_register_tsv(tsv: &str) -> Result<Vec<Transaction>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(tsv.as_bytes());

    let mut index_of: HashMap<(String, NaiveDate, String), usize> = HashMap::new();
    let mut transactions: Vec<Transaction> = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let record = record.context("Failed to read register row")?;
        let line = idx + 2;

        let (date, account, amount) = match (record.get(1), record.get(4), record.get(5)) {
            (Some(date), Some(account), Some(amount)) => (date, account, amount),
            _ => {
                return Err(FinmetricsError::Parse(format!(
                    "line {}: expected at least 6 columns, found {}",
                    line,
                    record.len()
                ))
                .into())
            }
        };

        let date = parse_date(date).with_context(|| format!("Invalid date on line {}", line))?;
        let (quantity, commodity) =
            parse_amount(amount).with_context(|| format!("Invalid amount on line {}", line))?;

        let key = (account.to_string(), date, commodity);
        match index_of.get(&key) {
            Some(&existing) => transactions[existing].quantity += quantity,
            None => {
                index_of.insert(key.clone(), transactions.len());
                let (account, date, commodity) = key;
                transactions.push(Transaction {
                    date,
                    account,
                    commodity,
                    quantity,
                });
            }
        }
    }

    debug!("Parsed {} combined transactions", transactions.len());
    Ok(transactions)
}

/// Parse `hledger prices` output (`P date commodity price [unit]`).
///
/// Only the last price of a (commodity, date) is kept.
pub fn parse_prices(text: &str) -> Result<Vec<CommodityValue>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut index_of: HashMap<(String, NaiveDate), usize> = HashMap::new();
    let mut values: Vec<CommodityValue> = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let record = record.context("Failed to read price directive")?;
        let line = idx + 1;

        let (date, name, price) = match (record.get(1), record.get(2), record.get(3)) {
            (Some(date), Some(name), Some(price)) => (date, name, price),
            _ => {
                return Err(FinmetricsError::Parse(format!(
                    "line {}: expected 'P date commodity price'",
                    line
                ))
                .into())
            }
        };

        let date = parse_date(date).with_context(|| format!("Invalid date on line {}", line))?;
        let value = Decimal::from_str(&price.replace(',', "")).map_err(|e| {
            FinmetricsError::Parse(format!("line {}: invalid price '{}': {}", line, price, e))
        })?;

        let value = CommodityValue {
            date,
            name: name.to_string(),
            value,
        };
        match index_of.get(&(value.name.clone(), date)) {
            Some(&existing) => values[existing] = value,
            None => {
                index_of.insert((value.name.clone(), date), values.len());
                values.push(value);
            }
        }
    }

    Ok(values)
}

/// Parse the transaction span out of `hledger stats` output.
pub fn parse_stats(text: &str) -> Result<Stats> {
    let span = text
        .lines()
        .find(|line| line.trim_start().starts_with("Txns span"))
        .ok_or_else(|| FinmetricsError::Parse("no 'Txns span' line in stats".to_string()))?;

    let dates = ISO_DATE
        .find_iter(span)
        .map(|m| parse_date(m.as_str()))
        .collect::<Result<Vec<_>, _>>()?;

    match dates.as_slice() {
        [start, end, ..] => Ok(Stats {
            start: *start,
            end: *end,
        }),
        _ => Err(FinmetricsError::Parse(format!("no date span in '{}'", span.trim())).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const REGISTER: &str = "\"txnidx\"\t\"date\"\t\"code\"\t\"description\"\t\"account\"\t\"amount\"\t\"total\"
\"1\"\t\"2024-01-01\"\t\"\"\t\"Paycheck\"\t\"assets:bank\"\t\"1,000.00\"\t\"1,000.00\"
\"1\"\t\"2024-01-01\"\t\"\"\t\"Paycheck\"\t\"income:salary\"\t\"-1,000.00\"\t\"0\"
\"2\"\t\"2024-01-01\"\t\"\"\t\"Fee\"\t\"assets:bank\"\t\"-5\"\t\"995.00\"
\"3\"\t\"2024-01-02\"\t\"\"\t\"Buy\"\t\"assets:brokerage\"\t\"3 \"\"VTI\"\"\"\t\"3 VTI\"
";

    #[test]
    fn test_parse_amount() {
        assert_eq!(
            parse_amount("12.5 AAPL").unwrap(),
            (dec!(12.5), "AAPL".to_string())
        );
        assert_eq!(parse_amount("-3").unwrap(), (dec!(-3), "USD".to_string()));
        assert_eq!(
            parse_amount("1,234.5 \"TBill (2024-01-01 - 2024-06-01)\"").unwrap(),
            (dec!(1234.5), "TBill (2024-01-01 - 2024-06-01)".to_string())
        );
        assert!(parse_amount("x USD").is_err());
    }

    #[test]
    fn test_parse_register_combines_same_day_postings() {
        let transactions = parse_register_tsv(REGISTER).unwrap();

        assert_eq!(transactions.len(), 3);
        assert_eq!(transactions[0].account, "assets:bank");
        assert_eq!(transactions[0].quantity, dec!(995));
        assert_eq!(transactions[1].account, "income:salary");
        assert_eq!(transactions[2].commodity, "VTI");
        assert_eq!(transactions[2].quantity, dec!(3));
    }

    #[test]
    fn test_parse_register_rejects_short_rows() {
        let tsv = "txnidx\tdate\n1\t2024-01-01\n";
        assert!(parse_register_tsv(tsv).is_err());
    }

    #[test]
    fn test_parse_register_header_only() {
        let tsv = "txnidx\tdate\tcode\tdescription\taccount\tamount\ttotal\n";
        assert!(parse_register_tsv(tsv).unwrap().is_empty());
    }

    #[test]
    fn test_parse_prices_keeps_last_per_day() {
        let text = "P 2024-01-02 AAPL 185.64\n\
                    P 2024-01-02 AAPL 186.00\n\
                    P 2024-01-03 \"TBill (2024-01-01 - 2024-06-01)\" 1\n\
                    P 2024-01-03 BRK 1,234.50 USD\n";
        let values = parse_prices(text).unwrap();

        assert_eq!(values.len(), 3);
        assert_eq!(values[0].value, dec!(186.00));
        assert_eq!(values[1].name, "TBill (2024-01-01 - 2024-06-01)");
        assert_eq!(values[2].value, dec!(1234.50));
    }

    #[test]
    fn test_parse_stats() {
        let text = "Main file                : /home/me/main.journal\n\
                    Txns span                : 2020-01-01 to 2024-05-02 (1583 days)\n\
                    Last txn                 : 2024-05-01 (1 days ago)\n";
        let stats = parse_stats(text).unwrap();

        assert_eq!(stats.start, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(stats.end, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert!(parse_stats("Accounts : 3\n").is_err());
    }
}

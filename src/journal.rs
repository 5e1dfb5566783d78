//! Journal text generation
//!
//! Builds hledger directives (market prices, forecast transactions) and
//! appends them to journal files.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::commodity::{tbill_lifetime, CommodityType, CommodityValue};
use crate::error::FinmetricsError;

/// Name prefix of treasury bill commodities
pub const TREASURY_PREFIX: &str = "TBill";

static QUOTED_COMMODITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#".*"(.*)".*"#).expect("valid quoted commodity pattern"));

/// Share of a vest withheld per tax, in the order they are booked
const WITHHOLDINGS: [(&str, Decimal); 5] = [
    ("expenses:taxes:oasdi", Decimal::from_parts(62, 0, 0, false, 3)),
    ("expenses:taxes:medicare", Decimal::from_parts(145, 0, 0, false, 4)),
    ("expenses:taxes:federal", Decimal::from_parts(22, 0, 0, false, 2)),
    ("expenses:taxes:state", Decimal::from_parts(1023, 0, 0, false, 4)),
    ("expenses:taxes:vdi", Decimal::from_parts(103, 0, 0, false, 4)),
];

/// Commodity symbol as written in a journal; anything but a plain ticker is quoted.
pub fn commodity_symbol(name: &str) -> String {
    if CommodityType::of(name) == CommodityType::Stock || name == "USD" {
        name.to_string()
    } else {
        format!("\"{}\"", name)
    }
}

/// `P 2024-01-02 VTI 230.5`
pub fn price_directive(value: &CommodityValue) -> String {
    format!(
        "P {} {} {}",
        value.date.format("%Y-%m-%d"),
        commodity_symbol(&value.name),
        value.value.normalize()
    )
}

/// Price directives valuing a treasury bill at 0 on issue and 1 at maturity.
pub fn treasury_directives(name: &str) -> Result<[String; 2], FinmetricsError> {
    let (start, end) = tbill_lifetime(name).ok_or_else(|| {
        FinmetricsError::Parse(format!("treasury does not match pattern: {}", name))
    })?;

    Ok([
        format!("P {} \"{}\" 0", start.format("%Y-%m-%d"), name),
        format!("P {} \"{}\" 1", end.format("%Y-%m-%d"), name),
    ])
}

/// Quoted commodity names appearing in journal text
pub fn existing_quoted_commodities(text: &str) -> BTreeSet<String> {
    text.lines()
        .filter(|l| !l.is_empty())
        .filter_map(|l| QUOTED_COMMODITY.captures(l))
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Forecast transaction for a sell-to-cover vest of `shares` units.
///
/// Every withholding is rounded to whole shares (half to even); whatever is
/// left lands in the investment account.
pub fn vest_forecast(period: &str, shares: u64, unit: &str, company: &str, account: &str) -> String {
    let shares = Decimal::from(shares);

    let mut lines = vec![
        format!("~ {}  Vest", period),
        format!("  {:<38}-{} {}", format!("income:{}", company), shares, unit),
    ];
    for (tax_account, rate) in WITHHOLDINGS {
        let withheld = (shares * rate).round();
        lines.push(format!("  {:<38}{} {}", tax_account, withheld, unit));
    }
    lines.push(format!("  assets:investment:{}", account));

    lines.join("\n")
}

/// Append `lines` to the journal at `path`, set apart by blank lines.
///
/// Nothing is written when `lines` is empty.
pub fn append_lines(path: &Path, lines: &[String]) -> Result<()> {
    if lines.is_empty() {
        info!("Nothing to append to {}", path.display());
        return Ok(());
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    writeln!(file)?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }

    info!("Appended {} lines to {}", lines.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::fs;

    #[test]
    fn test_price_directive() {
        let value = CommodityValue {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            name: "VTI".to_string(),
            value: dec!(230.5000),
        };
        assert_eq!(price_directive(&value), "P 2024-01-02 VTI 230.5");

        let fund = CommodityValue {
            name: "Vanguard 2050".to_string(),
            ..value
        };
        assert_eq!(price_directive(&fund), "P 2024-01-02 \"Vanguard 2050\" 230.5");
    }

    #[test]
    fn test_treasury_directives() {
        let lines = treasury_directives("TBill 26w (2024-01-02 - 2024-07-02)").unwrap();
        assert_eq!(
            lines,
            [
                "P 2024-01-02 \"TBill 26w (2024-01-02 - 2024-07-02)\" 0".to_string(),
                "P 2024-07-02 \"TBill 26w (2024-01-02 - 2024-07-02)\" 1".to_string(),
            ]
        );

        assert!(treasury_directives("TBill 26w").is_err());
    }

    #[test]
    fn test_existing_quoted_commodities() {
        let text = "P 2024-01-02 \"TBill A (2024-01-02 - 2024-07-02)\" 0\n\
                    \n\
                    P 2024-01-02 VTI 230\n";
        let names = existing_quoted_commodities(text);
        assert_eq!(names.len(), 1);
        assert!(names.contains("TBill A (2024-01-02 - 2024-07-02)"));
    }

    #[test]
    fn test_vest_forecast() {
        let text = vest_forecast("every 3 months from 2024-02-15", 100, "ACME", "acme", "broker");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "~ every 3 months from 2024-02-15  Vest");
        assert!(lines[1].starts_with("  income:acme "));
        assert!(lines[1].ends_with("-100 ACME"));
        // 100 * .062 = 6.2, 100 * .0145 = 1.45, 100 * .22 = 22
        assert!(lines[2].ends_with(" 6 ACME"));
        assert!(lines[3].ends_with(" 1 ACME"));
        assert!(lines[4].ends_with(" 22 ACME"));
        assert!(lines[5].ends_with(" 10 ACME"));
        assert!(lines[6].ends_with(" 1 ACME"));
        assert_eq!(lines[7], "  assets:investment:broker");
    }

    #[test]
    fn test_append_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("prices.journal");
        fs::write(&path, "P 2024-01-01 VTI 229\n").unwrap();

        append_lines(&path, &["P 2024-01-02 VTI 230".to_string()]).unwrap();
        append_lines(&path, &[]).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "P 2024-01-01 VTI 229\n\nP 2024-01-02 VTI 230\n"
        );
    }
}

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::cli::formatters::{format_balance_table, format_json};
use crate::commodity::PriceTable;
use crate::ledger::Ledger;
use crate::reconcile::balance_series;
use crate::series::date_range;

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", text))
}

pub fn dispatch_balances(
    ledger: &Ledger,
    query: &str,
    from: Option<&str>,
    to: Option<&str>,
    json_output: bool,
) -> Result<()> {
    let from = from.map(parse_date).transpose()?;
    let to = to.map(parse_date).transpose()?;
    let (from, to) = match (from, to) {
        (Some(from), Some(to)) => (from, to),
        _ => {
            let stats = ledger.stats()?;
            (from.unwrap_or(stats.start), to.unwrap_or(stats.end))
        }
    };
    tracing::info!("Filling {} from {} to {}", query, from, to);

    let register = ledger.register(query)?;
    let prices: PriceTable = ledger.prices(true)?.into_iter().collect();
    let dates: Vec<NaiveDate> = date_range(from, to, 1).collect();

    let series = balance_series(register, &dates, &prices);
    if json_output {
        println!("{}", format_json(&series));
    } else {
        print!("{}", format_balance_table(&series));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_date("02/29/2024").is_err());
    }
}

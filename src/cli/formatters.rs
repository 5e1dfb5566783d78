//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of data calculation from presentation.

use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use crate::metrics::Series;
use crate::utils::{format_amount, format_number};

/// Serialize anything for `--json` output
pub fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

fn colored_amount(value: Decimal) -> String {
    if value >= Decimal::ZERO {
        format_amount(value).green().to_string()
    } else {
        format_amount(value).red().to_string()
    }
}

/// One row per series with its extent and latest value
pub fn format_series_table(series: &[Series]) -> String {
    #[derive(Tabled)]
    struct SeriesRow {
        #[tabled(rename = "Metric")]
        name: String,
        #[tabled(rename = "Name")]
        label: String,
        #[tabled(rename = "Commodity/Type")]
        kind: String,
        #[tabled(rename = "Samples")]
        samples: usize,
        #[tabled(rename = "From")]
        from: String,
        #[tabled(rename = "To")]
        to: String,
        #[tabled(rename = "Latest")]
        latest: String,
    }

    let rows: Vec<SeriesRow> = series
        .iter()
        .map(|s| {
            let first = s.samples.keys().next();
            let last = s.samples.iter().next_back();
            SeriesRow {
                name: s.name.clone(),
                label: s.label("name").unwrap_or_default().to_string(),
                kind: s
                    .label("commodity")
                    .or_else(|| s.label("type"))
                    .unwrap_or_default()
                    .to_string(),
                samples: s.samples.len(),
                from: first.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
                to: last
                    .map(|(d, _)| d.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                latest: last
                    .map(|(_, v)| format_number(*v))
                    .unwrap_or_else(|| "-".to_string()),
            }
        })
        .collect();

    let total: usize = series.iter().map(|s| s.samples.len()).sum();

    let mut output = format!("\n{} Metric series\n\n", "📈".cyan().bold());
    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(3..), Alignment::right());
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\n{:<20} {}\n{:<20} {}\n",
        "Series:".bold(),
        series.len(),
        "Samples:".bold(),
        total
    ));
    output
}

/// Daily value table of a balance series
pub fn format_balance_table(series: &Series) -> String {
    #[derive(Tabled)]
    struct BalanceRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Value")]
        value: String,
    }

    let account = series.label("name").unwrap_or_default();
    if series.samples.is_empty() {
        return format!(
            "{} No balances found for {}\n",
            "ℹ".blue().bold(),
            account.bold()
        );
    }

    let rows: Vec<BalanceRow> = series
        .samples
        .iter()
        .map(|(date, value)| BalanceRow {
            date: date.to_string(),
            value: colored_amount(*value),
        })
        .collect();

    let mut output = format!("\n{} {}\n\n", "💰".cyan().bold(), account);
    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());
    output.push_str(&table.to_string());
    output.push('\n');
    output
}

/// Journal lines about to be appended
pub fn format_appended(lines: &[String], path: &std::path::Path) -> String {
    if lines.is_empty() {
        return format!(
            "{} Nothing new to write to {}\n",
            "ℹ".blue().bold(),
            path.display()
        );
    }

    let mut output = format!(
        "{} Writing {} lines to {}\n",
        "✓".green().bold(),
        lines.len(),
        path.display()
    );
    for line in lines {
        output.push_str(&format!("  {}\n", line.bright_black()));
    }
    output
}

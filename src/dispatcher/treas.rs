use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::cli::formatters::{format_appended, format_json};
use crate::error::FinmetricsError;
use crate::journal::{append_lines, existing_quoted_commodities, treasury_directives, TREASURY_PREFIX};
use crate::ledger::Ledger;

/// Price lines for every treasury bill not already in `existing`
fn new_treasury_lines(
    commodities: &BTreeSet<String>,
    existing: &BTreeSet<String>,
) -> Result<Vec<String>, FinmetricsError> {
    let mut lines = Vec::new();
    for name in commodities.difference(existing) {
        lines.extend(treasury_directives(name)?);
    }
    Ok(lines)
}

pub fn dispatch_treas(ledger: &Ledger, output: &Path, json_output: bool) -> Result<()> {
    let commodities: BTreeSet<String> = ledger
        .commodities()?
        .into_iter()
        .filter(|c| c.starts_with(TREASURY_PREFIX))
        .collect();

    let existing = if output.exists() {
        let text = fs::read_to_string(output)
            .with_context(|| format!("Failed to read {}", output.display()))?;
        existing_quoted_commodities(&text)
    } else {
        BTreeSet::new()
    };

    let lines = new_treasury_lines(&commodities, &existing)?;
    if json_output {
        println!("{}", format_json(&lines));
    } else {
        print!("{}", format_appended(&lines, output));
    }
    append_lines(output, &lines)
}

use anyhow::Result;
use serde_json::json;

use crate::cli::formatters::format_json;
use crate::journal::vest_forecast;

pub fn dispatch_vests(
    period: &str,
    shares: u64,
    unit: &str,
    company: &str,
    account: &str,
    json_output: bool,
) -> Result<()> {
    let forecast = vest_forecast(period, shares, unit, company, account);

    if json_output {
        println!("{}", format_json(&json!({ "forecast": forecast })));
    } else {
        println!("{}", forecast);
    }
    Ok(())
}

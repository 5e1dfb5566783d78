use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use crate::commodity::CommodityValue;
use crate::error::FinmetricsError;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance chart response
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    result: Option<Vec<ChartResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

/// HTTP client configured for the chart API
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent("Mozilla/5.0 (compatible; finmetrics/0.1)")
        .build()
        .context("Failed to build HTTP client")
}

/// Fetch daily closing prices of `symbol` from `from` (inclusive) to `to` (exclusive).
///
/// Days without a close (holidays, halted trading) are skipped.
pub async fn fetch_daily_closes(
    client: &Client,
    symbol: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<CommodityValue>> {
    info!("Fetching daily closes for {} from {} to {}", symbol, from, to);

    let period1 = from
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("Invalid from date"))?
        .and_utc()
        .timestamp();
    let period2 = to
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("Invalid to date"))?
        .and_utc()
        .timestamp();

    let url = format!(
        "{}/{}?period1={}&period2={}&interval=1d",
        CHART_URL, symbol, period1, period2
    );

    let response = client
        .get(&url)
        .send()
        .await
        .context("Failed to send request to Yahoo Finance")?;

    if !response.status().is_success() {
        return Err(FinmetricsError::Pricing(format!(
            "Yahoo Finance returned error status {} for {}",
            response.status(),
            symbol
        ))
        .into());
    }

    let data: YahooChartResponse = response
        .json()
        .await
        .context("Failed to parse Yahoo Finance response")?;

    let closes = closes_from_chart(symbol, data)?;
    let closes: Vec<CommodityValue> = closes
        .into_iter()
        .filter(|c| c.date >= from && c.date < to)
        .collect();

    debug!("Fetched {} closes for {}", closes.len(), symbol);
    Ok(closes)
}

fn closes_from_chart(symbol: &str, data: YahooChartResponse) -> Result<Vec<CommodityValue>> {
    if let Some(error) = data.chart.error {
        return Err(FinmetricsError::Pricing(format!(
            "Yahoo Finance API error for {}: {} - {}",
            symbol, error.code, error.description
        ))
        .into());
    }

    let result = data
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| FinmetricsError::Pricing(format!("No data returned for {}", symbol)))?;

    // A range with no trading days has no timestamps at all
    let timestamps = result.timestamp.unwrap_or_default();
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .and_then(|q| q.close)
        .unwrap_or_default();

    let mut values = Vec::with_capacity(timestamps.len());
    for (i, &timestamp) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| anyhow!("Invalid timestamp {}", timestamp))?
            .date_naive();

        let Some(close) = closes.get(i).copied().flatten() else {
            continue;
        };
        let Some(value) = Decimal::from_f64_retain(close) else {
            continue;
        };

        values.push(CommodityValue {
            date,
            name: symbol.to_string(),
            value: value.round_dp(4).normalize(),
        });
    }

    Ok(values)
}

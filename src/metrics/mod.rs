//! Metrics sinks
//!
//! Aligned series are delivered to a time-series store as named, labeled
//! samples keyed by date. Sinks buffer everything pushed to them and only
//! talk to the store on [`MetricsSink::delete`] and [`MetricsSink::flush`].

pub mod prometheus;
pub mod victoria;

pub use prometheus::PrometheusSink;
pub use victoria::VictoriaMetricsSink;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use reqwest::{Client, RequestBuilder, Url};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::error::FinmetricsError;

/// Ordered label pairs of a series
pub type Labels = Vec<(String, String)>;

/// A named, labeled time series with one sample per date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub labels: Labels,
    pub samples: BTreeMap<NaiveDate, Decimal>,
}

impl Series {
    pub fn new(name: impl Into<String>, labels: Labels) -> Self {
        Self {
            name: name.into(),
            labels,
            samples: BTreeMap::new(),
        }
    }

    /// `name{k="v",...}`
    pub fn selector(&self) -> String {
        let labels = self
            .labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}{{{}}}", self.name, labels)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Build [`Labels`] from string pairs
pub fn labels<const N: usize>(pairs: [(&str, &str); N]) -> Labels {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn escape_label(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Seconds since the epoch at UTC midnight of `date`
pub fn epoch_seconds(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Destination for aligned series.
#[allow(async_fn_in_trait)]
pub trait MetricsSink {
    /// Remove stored series whose name matches the regex `pattern`
    async fn delete(&mut self, pattern: &str) -> Result<()>;

    /// Buffer a series for the next flush
    fn push(&mut self, series: &Series);

    /// Deliver everything buffered
    async fn flush(&mut self) -> Result<()>;
}

/// Replace every series matching `pattern` in the store with `series`
pub async fn publish<S: MetricsSink>(sink: &mut S, pattern: &str, series: &[Series]) -> Result<()> {
    sink.delete(pattern).await?;
    for s in series {
        sink.push(s);
    }
    sink.flush().await?;

    info!("Published {} series", series.len());
    Ok(())
}

/// POST to an admin endpoint of the store with a `match[]` name selector
async fn post_name_match(client: &Client, base_url: &str, path: &str, pattern: &str) -> Result<()> {
    let endpoint = format!("{}{}", base_url.trim_end_matches('/'), path);
    let selector = format!("{{__name__=~\"{}\"}}", pattern);
    let url = Url::parse_with_params(&endpoint, &[("match[]", selector.as_str())])
        .with_context(|| format!("Invalid metrics url {}", endpoint))?;

    send_checked(client.post(url), &endpoint).await
}

/// Send a request to the store, failing on transport errors and non-2xx replies
async fn send_checked(request: RequestBuilder, endpoint: &str) -> Result<()> {
    let response = request
        .send()
        .await
        .map_err(|e| FinmetricsError::Metrics(format!("failed to reach {}: {}", endpoint, e)))?;
    response
        .error_for_status()
        .map_err(|e| FinmetricsError::Metrics(format!("{} rejected the request: {}", endpoint, e)))?;
    Ok(())
}

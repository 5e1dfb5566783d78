use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use super::{epoch_seconds, post_name_match, send_checked, MetricsSink, Series};

const IMPORT_TIMEOUT: Duration = Duration::from_secs(300);

/// JSON import lines for a series, one per `bucket_days` window.
///
/// Windows are counted from the earliest sample so that no single line
/// spans more than `bucket_days` days. Timestamps are milliseconds.
pub fn import_lines(series: &Series, bucket_days: i64) -> Vec<String> {
    let Some(offset) = series.samples.keys().next().copied() else {
        return Vec::new();
    };
    let bucket_days = bucket_days.max(1);

    let mut buckets: BTreeMap<i64, Vec<(NaiveDate, Decimal)>> = BTreeMap::new();
    for (date, value) in &series.samples {
        let bucket = (*date - offset).num_days() / bucket_days;
        buckets.entry(bucket).or_default().push((*date, *value));
    }

    let mut metric = Map::new();
    metric.insert("__name__".to_string(), Value::from(series.name.as_str()));
    for (k, v) in &series.labels {
        metric.insert(k.clone(), Value::from(v.as_str()));
    }

    buckets
        .values()
        .map(|samples| {
            let values: Vec<f64> = samples
                .iter()
                .map(|(_, v)| v.round_dp(2).to_f64().unwrap_or_default())
                .collect();
            let timestamps: Vec<i64> = samples
                .iter()
                .map(|(d, _)| epoch_seconds(*d) * 1000)
                .collect();

            json!({
                "metric": metric,
                "values": values,
                "timestamps": timestamps,
            })
            .to_string()
        })
        .collect()
}

/// Pushes series to VictoriaMetrics through its JSON line import API.
pub struct VictoriaMetricsSink {
    url: String,
    client: Client,
    bucket_days: i64,
    batch_size: usize,
    batch_pause: Duration,
    buffer: Vec<String>,
    samples: usize,
}

impl VictoriaMetricsSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            bucket_days: 30,
            batch_size: 5000,
            batch_pause: Duration::from_secs(10),
            buffer: Vec::new(),
            samples: 0,
        }
    }

    pub fn with_bucket_days(mut self, days: i64) -> Self {
        self.bucket_days = days.max(1);
        self
    }

    pub fn with_batching(mut self, batch_size: usize, pause: Duration) -> Self {
        self.batch_size = batch_size.max(1);
        self.batch_pause = pause;
        self
    }

    pub fn buffered(&self) -> &[String] {
        &self.buffer
    }
}

impl MetricsSink for VictoriaMetricsSink {
    async fn delete(&mut self, pattern: &str) -> Result<()> {
        post_name_match(&self.client, &self.url, "/api/v1/admin/tsdb/delete_series", pattern)
            .await?;
        info!("Deleted metrics matching {} at {}", pattern, self.url);
        Ok(())
    }

    fn push(&mut self, series: &Series) {
        let lines = import_lines(series, self.bucket_days);
        debug!(
            "Buffered {} samples for {} across {} buckets",
            series.samples.len(),
            series.selector(),
            lines.len()
        );
        self.samples += series.samples.len();
        self.buffer.extend(lines);
    }

    async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            info!("Nothing to flush to {}", self.url);
            return Ok(());
        }

        info!(
            "Flushing {} values over {} lines in {}-line batches to {}",
            self.samples,
            self.buffer.len(),
            self.batch_size,
            self.url
        );

        let endpoint = format!("{}/api/v1/import", self.url);
        let batches: Vec<&[String]> = self.buffer.chunks(self.batch_size).collect();
        for (idx, lines) in batches.iter().enumerate() {
            if idx > 0 && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }

            let request = self
                .client
                .post(&endpoint)
                .body(lines.join("\n"))
                .timeout(IMPORT_TIMEOUT);
            send_checked(request, &endpoint)
                .await
                .with_context(|| format!("Import batch {} of {} failed", idx + 1, batches.len()))?;

            debug!("Flushed batch {}/{}", idx + 1, batches.len());
        }

        let reset = format!("{}/internal/resetRollupResultCache", self.url);
        send_checked(self.client.post(&reset), &reset).await?;

        info!("Flushed {} lines to {}", self.buffer.len(), self.url);
        self.buffer.clear();
        self.samples = 0;
        Ok(())
    }
}

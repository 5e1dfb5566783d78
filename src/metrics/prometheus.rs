use anyhow::{Context, Result};
use reqwest::Client;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use super::{epoch_seconds, post_name_match, send_checked, MetricsSink, Series};

/// OpenMetrics text lines for a series, oldest sample first.
///
/// Values are rounded to two decimals; timestamps are seconds.
pub fn exposition_lines(series: &Series) -> Vec<String> {
    let selector = series.selector();
    series
        .samples
        .iter()
        .map(|(date, value)| {
            format!(
                "{} {} {}",
                selector,
                value.round_dp(2),
                epoch_seconds(*date)
            )
        })
        .collect()
}

/// Writes an OpenMetrics exposition file for backfilling into Prometheus.
///
/// Deleting goes through the TSDB admin API of the server at `url`.
pub struct PrometheusSink {
    url: String,
    output: PathBuf,
    client: Client,
    buffer: Vec<String>,
}

impl PrometheusSink {
    pub fn new(url: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output: output.into(),
            client: Client::new(),
            buffer: Vec::new(),
        }
    }

    pub fn buffered(&self) -> &[String] {
        &self.buffer
    }
}

impl MetricsSink for PrometheusSink {
    async fn delete(&mut self, pattern: &str) -> Result<()> {
        post_name_match(&self.client, &self.url, "/api/v1/admin/tsdb/delete_series", pattern)
            .await?;

        let endpoint = format!(
            "{}/api/v1/admin/tsdb/clean_tombstones",
            self.url.trim_end_matches('/')
        );
        send_checked(self.client.post(&endpoint), &endpoint).await?;

        info!("Deleted metrics matching {} at {}", pattern, self.url);
        Ok(())
    }

    fn push(&mut self, series: &Series) {
        let lines = exposition_lines(series);
        debug!("Buffered {} samples for {}", lines.len(), series.selector());
        self.buffer.extend(lines);
    }

    async fn flush(&mut self) -> Result<()> {
        let mut text = self.buffer.join("\n");
        text.push_str("\n# EOF\n");

        fs::write(&self.output, text)
            .with_context(|| format!("Failed to write {}", self.output.display()))?;

        info!(
            "Wrote {} samples to {}",
            self.buffer.len(),
            self.output.display()
        );
        self.buffer.clear();
        Ok(())
    }
}

use anyhow::Result;
use colored::Colorize;
use tracing::info;

use crate::cli::formatters::{format_json, format_series_table};
use crate::config::{Config, SinkKind};
use crate::error::FinmetricsError;
use crate::ledger::Ledger;
use crate::metrics::{publish, PrometheusSink, VictoriaMetricsSink};
use crate::pricing::PriceCache;
use crate::reconcile::{ledger_series, SERIES_PATTERN};

pub async fn dispatch_metrics(
    config: &Config,
    ledger: &Ledger,
    url: Option<String>,
    sink: Option<SinkKind>,
    dry_run: bool,
    json_output: bool,
) -> Result<()> {
    let url = url.or_else(|| config.metrics_url.clone());
    if url.is_none() && !dry_run {
        return Err(FinmetricsError::Config(
            "no metrics URL; pass --url or set metrics_url".to_string(),
        )
        .into());
    }

    let mut cache = PriceCache::new()?;
    let series = ledger_series(ledger, &mut cache).await?;
    cache.clear();

    let Some(url) = url.filter(|_| !dry_run) else {
        if json_output {
            println!("{}", format_json(&series));
        } else {
            print!("{}", format_series_table(&series));
        }
        return Ok(());
    };

    let kind = sink.unwrap_or(config.sink);
    info!("Publishing {} series to {:?} at {}", series.len(), kind, url);

    match kind {
        SinkKind::Prometheus => {
            let mut sink = PrometheusSink::new(url, config.exposition_file.clone());
            publish(&mut sink, SERIES_PATTERN, &series).await?;
        }
        SinkKind::Victoria => {
            let mut sink = VictoriaMetricsSink::new(url)
                .with_bucket_days(config.bucket_days)
                .with_batching(config.batch_size, config.batch_pause());
            publish(&mut sink, SERIES_PATTERN, &series).await?;
        }
    }

    if json_output {
        println!(r#"{{"published": {}}}"#, series.len());
    } else {
        println!("{} Published {} series", "✓".green().bold(), series.len());
    }
    Ok(())
}

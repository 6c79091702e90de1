use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use llm_monitor::config::{self, MonitorConfig};
use llm_monitor::sink::{MemorySink, MetricsFailureHook, RecordedEvent, RecordedMetric, RecorderSink};
use llm_monitor::MonitoringAdapter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const DISABLED_NOTICE: &str = "Monitoring is disabled: set NEW_RELIC_LICENSE_KEY and NEW_RELIC_APP_NAME";

/// A recorded gateway callback
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayFixture {
    #[serde(default)]
    pub kwargs: Value,
    #[serde(default)]
    pub response: Value,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

/// Everything the adapter handed to the sink
#[derive(Debug, Serialize)]
pub struct ReplayOutput {
    pub enabled: bool,
    pub events: Vec<RecordedEvent>,
    pub metrics: Vec<RecordedMetric>,
}

/// Execute the replay command
pub async fn execute(config_path: &Path, input: &Path, failure: bool, prometheus: bool) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let fixture = load_fixture(input)?;

    info!(input = %input.display(), failure, "Replaying recorded request");

    if prometheus {
        let handle = llm_monitor::metrics::init_metrics()?;
        let adapter = MonitoringAdapter::new(&cfg, Arc::new(RecorderSink::default()), Arc::new(MetricsFailureHook));
        warn_if_disabled(&adapter);

        run(&adapter, &fixture, failure).await;
        println!("{}", handle.render());
        return Ok(());
    }

    let output = capture(&cfg, &fixture, failure).await;
    if !output.enabled {
        println!("{}", DISABLED_NOTICE.yellow());
    }
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

pub fn load_fixture(path: &Path) -> Result<ReplayFixture> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;
    let fixture = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid fixture JSON in {}", path.display()))?;
    Ok(fixture)
}

/// Replay against an in-memory sink and return what was recorded
pub async fn capture(cfg: &MonitorConfig, fixture: &ReplayFixture, failure: bool) -> ReplayOutput {
    let sink = Arc::new(MemorySink::new());
    let adapter = MonitoringAdapter::new(cfg, sink.clone(), Arc::new(MetricsFailureHook));

    run(&adapter, fixture, failure).await;

    ReplayOutput {
        enabled: adapter.is_enabled(),
        events: sink.events(),
        metrics: sink.metrics(),
    }
}

async fn run(adapter: &MonitoringAdapter, fixture: &ReplayFixture, failure: bool) {
    if failure {
        adapter
            .async_log_failure_event(&fixture.kwargs, &fixture.response, fixture.start_time, fixture.end_time)
            .await;
    } else {
        adapter
            .async_log_success_event(&fixture.kwargs, &fixture.response, fixture.start_time, fixture.end_time)
            .await;
    }
}

fn warn_if_disabled(adapter: &MonitoringAdapter) {
    if !adapter.is_enabled() {
        println!("{}", DISABLED_NOTICE.yellow());
    }
}

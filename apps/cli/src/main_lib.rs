use chrono::{NaiveDate, Utc};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StoreBackend, TickerSource};
use pricevault_core::prices::{
    InstrumentOutcome, InstrumentSummary, MarketDataClient, SyncOrchestrator, SyncReport,
    TimeSeriesStore,
};
use pricevault_core::TrackedInstruments;
use pricevault_market_data::{MarketDataProvider, YahooProvider};
use pricevault_storage_json::JsonFileStore;
use pricevault_storage_sqlite::SqliteStore;

pub fn init_tracing() {
    let log_format = std::env::var("PV_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Opens the configured backend. The choice is made here once; nothing
/// downstream knows which one it got.
pub fn build_store(config: &Config) -> anyhow::Result<Box<dyn TimeSeriesStore>> {
    let store: Box<dyn TimeSeriesStore> = match config.backend {
        StoreBackend::Json => Box::new(JsonFileStore::open(&config.store_path)),
        StoreBackend::Sqlite => {
            let path = config.store_path.to_str().ok_or_else(|| {
                anyhow::anyhow!("Non UTF-8 store path: {}", config.store_path.display())
            })?;
            Box::new(SqliteStore::open(path)?)
        }
    };
    tracing::info!(
        "Using {} store at {}",
        store.backend_name(),
        config.store_path.display()
    );
    Ok(store)
}

pub fn load_instruments(config: &Config) -> anyhow::Result<TrackedInstruments> {
    let tracked = match &config.tickers {
        TickerSource::List(list) => TrackedInstruments::from_list(list),
        TickerSource::File(path) => TrackedInstruments::load(path)?,
    };
    if tracked.is_empty() {
        tracing::warn!("No tracked instruments configured");
    }
    Ok(tracked)
}

/// Everything a finished run reports back.
pub struct RunOutcome {
    pub report: SyncReport,
    pub summaries: Vec<InstrumentSummary>,
}

/// Runs one sync pass against Yahoo Finance.
pub async fn run(config: &Config) -> anyhow::Result<RunOutcome> {
    let provider = Arc::new(YahooProvider::new(config.price_field)?);
    run_with_provider(config, provider, Utc::now().date_naive()).await
}

/// Runs one sync pass against `provider`, with `today` as the end of every
/// fetch range.
///
/// A failed persist is retried once before the run is reported as failed.
pub async fn run_with_provider(
    config: &Config,
    provider: Arc<dyn MarketDataProvider>,
    today: NaiveDate,
) -> anyhow::Result<RunOutcome> {
    let instruments = load_instruments(config)?;
    let store = build_store(config)?;
    let client = MarketDataClient::new(provider, &config.sync);
    let mut orchestrator = SyncOrchestrator::new(store, client, instruments, &config.sync);

    let report = match orchestrator.run_as_of(today).await {
        Ok(report) => report,
        Err(err) => {
            tracing::warn!("Retrying persist after failure: {}", err.source);
            orchestrator.persist().map_err(|retry| {
                anyhow::anyhow!(
                    "{}; store could not be persisted: {}",
                    err.report.summary(),
                    retry
                )
            })?;
            SyncReport {
                persisted: true,
                ..err.report
            }
        }
    };

    let summaries = collect_summaries(orchestrator.store());
    Ok(RunOutcome { report, summaries })
}

/// Store summary for display. The store is already persisted when this
/// runs, so an unreadable instrument is skipped with a warning instead of
/// failing the run.
pub fn collect_summaries(store: &dyn TimeSeriesStore) -> Vec<InstrumentSummary> {
    match store.summarize() {
        Ok(summaries) => summaries,
        Err(err) => {
            tracing::warn!("Store summary failed, summarizing per instrument: {}", err);
            let instruments = match store.instruments() {
                Ok(instruments) => instruments,
                Err(err) => {
                    tracing::warn!("Cannot list stored instruments: {}", err);
                    return Vec::new();
                }
            };
            instruments
                .into_iter()
                .filter_map(|instrument| match store.get_existing(&instrument) {
                    Ok(points) => Some(InstrumentSummary {
                        rows: points.len(),
                        first: points.first().map(|p| p.date),
                        last: points.last().map(|p| p.date),
                        instrument,
                    }),
                    Err(err) => {
                        tracing::warn!("Skipping {} in summary: {}", instrument.as_str(), err);
                        None
                    }
                })
                .collect()
        }
    }
}

/// Human-readable per-instrument report.
pub fn render_report(report: &SyncReport) -> String {
    let mut out = String::new();
    if let Some(warning) = &report.store_warning {
        let _ = writeln!(out, "warning: {}", warning);
    }
    for entry in &report.instruments {
        let tag = match entry.outcome {
            InstrumentOutcome::Updated { .. } => "updated",
            InstrumentOutcome::NoNewData { .. } => "no-new-data",
            InstrumentOutcome::Failed { .. } => "failed",
        };
        let _ = writeln!(out, "{:<12} {:<12} {}", entry.instrument.as_str(), tag, entry.outcome);
    }
    out.push_str(&report.summary());
    out
}

/// Row count and date span per stored instrument.
pub fn render_summaries(summaries: &[InstrumentSummary]) -> String {
    let mut out = String::from("instrument       rows  first       last");
    for s in summaries {
        let day = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
        let _ = write!(
            out,
            "\n{:<12} {:>8}  {:<10}  {}",
            s.instrument.as_str(),
            s.rows,
            day(s.first),
            day(s.last)
        );
    }
    out
}

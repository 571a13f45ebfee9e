use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

use pricevault_cli::config::Config;
use pricevault_cli::{render_report, run_with_provider};
use pricevault_core::prices::{InstrumentId, PricePoint, RunStatus, TimeSeriesStore};
use pricevault_market_data::{MarketDataError, MarketDataProvider, RateLimit, RawPriceRow};
use pricevault_storage_json::JsonFileStore;
use pricevault_storage_sqlite::SqliteStore;

/// Serves a fixed daily series per symbol; unknown symbols are not found.
struct FixedProvider {
    series: HashMap<String, Vec<(NaiveDate, f64)>>,
}

impl FixedProvider {
    fn new(entries: Vec<(&str, Vec<(NaiveDate, f64)>)>) -> Arc<Self> {
        Arc::new(Self {
            series: entries
                .into_iter()
                .map(|(symbol, points)| (symbol.to_string(), points))
                .collect(),
        })
    }
}

#[async_trait]
impl MarketDataProvider for FixedProvider {
    fn id(&self) -> &'static str {
        "FIXED"
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            min_delay: std::time::Duration::ZERO,
        }
    }

    async fn get_daily_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPriceRow>, MarketDataError> {
        let series = self
            .series
            .get(symbol)
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;
        Ok(series
            .iter()
            .filter(|(d, _)| *d >= start && *d <= end)
            .map(|(d, p)| RawPriceRow::text(d.format("%Y-%m-%d").to_string(), *p))
            .collect())
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn config(backend: &str, store_path: &Path, tickers: &str) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("PV_STORE_BACKEND", backend.to_string()),
        ("PV_STORE_PATH", store_path.to_string_lossy().to_string()),
        ("PV_TICKERS", tickers.to_string()),
        ("PV_RETRY_BACKOFF_MS", "1".to_string()),
    ]);
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

#[tokio::test]
async fn json_backend_end_to_end() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("etf-data.json");
    let config = config("json", &path, "SPY,MISSING,VTI");
    let provider = FixedProvider::new(vec![
        ("SPY", vec![(day(2024, 1, 2), 470.0), (day(2024, 1, 3), 468.5)]),
        ("VTI", vec![(day(2024, 1, 2), 235.5)]),
    ]);

    let outcome = run_with_provider(&config, provider.clone(), day(2024, 1, 3))
        .await
        .unwrap();

    assert_eq!(outcome.report.status(), RunStatus::Updated);
    assert_eq!(outcome.report.updated_count(), 2);
    assert_eq!(outcome.report.failed_count(), 1);
    assert!(render_report(&outcome.report).contains("MISSING      failed"));
    assert_eq!(outcome.summaries.len(), 2);

    let store = JsonFileStore::open(&path);
    assert_eq!(
        store.get_existing(&InstrumentId::new("SPY")).unwrap(),
        vec![
            PricePoint::new(day(2024, 1, 2), 470.0),
            PricePoint::new(day(2024, 1, 3), 468.5),
        ]
    );

    let again = run_with_provider(&config, provider, day(2024, 1, 3))
        .await
        .unwrap();
    assert_eq!(again.report.status(), RunStatus::NothingUpdated);
}

#[tokio::test]
async fn sqlite_backend_end_to_end() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("etf-data.db");
    let config = config("sqlite", &path, "SPY");
    let provider = FixedProvider::new(vec![(
        "SPY",
        vec![(day(2024, 1, 2), 470.0), (day(2024, 1, 3), 468.5)],
    )]);

    let outcome = run_with_provider(&config, provider, day(2024, 1, 3))
        .await
        .unwrap();

    assert!(outcome.report.persisted);
    assert_eq!(outcome.summaries[0].rows, 2);

    let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
    assert_eq!(store.get_existing(&InstrumentId::new("SPY")).unwrap().len(), 2);
}

#[tokio::test]
async fn unwritable_store_fails_the_run() {
    let tmp = tempdir().unwrap();
    let blocker = tmp.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();
    let config = config("json", &blocker.join("etf-data.json"), "SPY");
    let provider = FixedProvider::new(vec![("SPY", vec![(day(2024, 1, 2), 470.0)])]);

    let result = run_with_provider(&config, provider, day(2024, 1, 2)).await;

    let message = result.err().unwrap().to_string();
    assert!(message.contains("could not be persisted"));
}

#[tokio::test]
async fn corrupt_untracked_instrument_does_not_fail_the_run() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("etf-data.json");
    std::fs::write(
        &path,
        r#"{"BAD": {"garbage": 1.0}, "SPY": {"2024-01-02": 469.0}}"#,
    )
    .unwrap();
    let config = config("json", &path, "SPY");
    let provider = FixedProvider::new(vec![("SPY", vec![(day(2024, 1, 2), 470.0)])]);

    let outcome = run_with_provider(&config, provider, day(2024, 1, 2))
        .await
        .unwrap();

    assert!(outcome.report.persisted);
    assert_eq!(outcome.report.updated_count(), 1);
    assert_eq!(outcome.summaries.len(), 1);
    assert_eq!(outcome.summaries[0].instrument, InstrumentId::new("SPY"));

    let store = JsonFileStore::open(&path);
    assert_eq!(
        store.get_existing(&InstrumentId::new("SPY")).unwrap(),
        vec![PricePoint::new(day(2024, 1, 2), 470.0)]
    );
}

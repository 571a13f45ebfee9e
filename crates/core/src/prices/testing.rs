//! Test doubles for the store and the market data source.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pricevault_market_data::{MarketDataError, MarketDataProvider, RateLimit, RawPriceRow};

use super::model::{ensure_finite, format_day, InstrumentId, PricePoint};
use super::store::TimeSeriesStore;
use crate::errors::{DatabaseError, Result, ValidationError};

// =========================================================================
// Mock TimeSeriesStore
// =========================================================================

#[derive(Default)]
pub struct MockPriceStore {
    data: BTreeMap<InstrumentId, BTreeMap<NaiveDate, f64>>,
    corrupt: HashSet<InstrumentId>,
    fail_on_persist: bool,
    load_warning: Option<String>,
    pub persist_calls: usize,
    pub persisted: BTreeMap<InstrumentId, BTreeMap<NaiveDate, f64>>,
}

impl MockPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, instrument: &InstrumentId, points: &[(NaiveDate, f64)]) {
        let series = self.data.entry(instrument.clone()).or_default();
        for (date, price) in points {
            series.insert(*date, *price);
        }
    }

    /// Make `get_existing` report a corrupt stored date for `instrument`.
    pub fn corrupt(&mut self, instrument: &InstrumentId) {
        self.corrupt.insert(instrument.clone());
    }

    pub fn set_fail_on_persist(&mut self, fail: bool) {
        self.fail_on_persist = fail;
    }

    pub fn set_load_warning(&mut self, warning: &str) {
        self.load_warning = Some(warning.to_string());
    }

    pub fn snapshot(&self) -> BTreeMap<InstrumentId, BTreeMap<NaiveDate, f64>> {
        self.data.clone()
    }
}

impl TimeSeriesStore for MockPriceStore {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    fn get_existing(&self, instrument: &InstrumentId) -> Result<Vec<PricePoint>> {
        if self.corrupt.contains(instrument) {
            return Err(ValidationError::CorruptStoredDate {
                instrument: instrument.to_string(),
                value: "2024-13-45".to_string(),
            }
            .into());
        }
        Ok(self
            .data
            .get(instrument)
            .map(|series| {
                series
                    .iter()
                    .map(|(d, p)| PricePoint::new(*d, *p))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn upsert(
        &mut self,
        instrument: &InstrumentId,
        date: NaiveDate,
        price: f64,
    ) -> Result<Option<f64>> {
        ensure_finite(instrument, date, price)?;
        Ok(self
            .data
            .entry(instrument.clone())
            .or_default()
            .insert(date, price))
    }

    fn persist(&mut self) -> Result<()> {
        self.persist_calls += 1;
        if self.fail_on_persist {
            return Err(DatabaseError::WriteFailed("Intentional persist failure".into()).into());
        }
        self.persisted = self.data.clone();
        Ok(())
    }

    fn instruments(&self) -> Result<Vec<InstrumentId>> {
        Ok(self.data.keys().cloned().collect())
    }

    fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }
}

// =========================================================================
// Mock MarketDataProvider
// =========================================================================

#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Return these rows verbatim, whatever range is asked for.
    Rows(Vec<RawPriceRow>),
    /// Return the points of this series that fall inside the requested range.
    Series(Vec<(NaiveDate, f64)>),
    RateLimited,
    NotFound,
    ProviderError(String),
    /// Never answer within any reasonable timeout.
    Hang,
}

#[derive(Clone, Default)]
pub struct MockProvider {
    responses: Arc<Mutex<HashMap<String, Vec<MockResponse>>>>,
    calls: Arc<Mutex<Vec<(String, NaiveDate, NaiveDate)>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue responses for `symbol`; the last one repeats forever.
    pub fn respond(&self, symbol: &str, responses: Vec<MockResponse>) {
        self.responses
            .lock()
            .unwrap()
            .insert(symbol.to_string(), responses);
    }

    pub fn calls(&self) -> Vec<(String, NaiveDate, NaiveDate)> {
        self.calls.lock().unwrap().clone()
    }

    fn next_response(&self, symbol: &str) -> Option<MockResponse> {
        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(symbol)?;
        if queue.len() > 1 {
            Some(queue.remove(0))
        } else {
            queue.first().cloned()
        }
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    fn id(&self) -> &'static str {
        "MOCK"
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            min_delay: Duration::ZERO,
        }
    }

    async fn get_daily_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<Vec<RawPriceRow>, MarketDataError> {
        self.calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), start, end));

        match self.next_response(symbol) {
            None => Err(MarketDataError::SymbolNotFound(symbol.to_string())),
            Some(MockResponse::Rows(rows)) => Ok(rows),
            Some(MockResponse::Series(series)) => Ok(series
                .into_iter()
                .filter(|(d, _)| *d >= start && *d <= end)
                .map(|(d, p)| RawPriceRow::text(format_day(d), p))
                .collect()),
            Some(MockResponse::RateLimited) => Err(MarketDataError::RateLimited {
                provider: "MOCK".to_string(),
            }),
            Some(MockResponse::NotFound) => {
                Err(MarketDataError::SymbolNotFound(symbol.to_string()))
            }
            Some(MockResponse::ProviderError(message)) => Err(MarketDataError::ProviderError {
                provider: "MOCK".to_string(),
                message,
            }),
            Some(MockResponse::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![])
            }
        }
    }
}

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use pricevault_core::SyncSettings;
use pricevault_market_data::PriceField;

/// Which `TimeSeriesStore` implementation backs the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Json,
    Sqlite,
}

impl StoreBackend {
    fn default_path(self) -> &'static str {
        match self {
            StoreBackend::Json => "etf-data.json",
            StoreBackend::Sqlite => "etf-data.db",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(StoreBackend::Json),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(anyhow!("unknown store backend '{}' (json|sqlite)", other)),
        }
    }
}

/// Where the tracked instruments come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickerSource {
    File(PathBuf),
    List(String),
}

pub struct Config {
    pub backend: StoreBackend,
    pub store_path: PathBuf,
    pub tickers: TickerSource,
    pub price_field: PriceField,
    pub sync: SyncSettings,
}

impl Config {
    /// Reads `PV_*` variables, after loading `.env` if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match var("PV_STORE_BACKEND") {
            Some(v) => v.parse().context("Invalid PV_STORE_BACKEND")?,
            None => StoreBackend::Json,
        };
        let store_path = var("PV_STORE_PATH")
            .unwrap_or_else(|| backend.default_path().to_string())
            .into();

        let tickers = match var("PV_TICKERS") {
            Some(list) => TickerSource::List(list),
            None => TickerSource::File(
                var("PV_TICKERS_FILE")
                    .unwrap_or_else(|| "etf-tickers.json".into())
                    .into(),
            ),
        };

        let price_field = match var("PV_PRICE_FIELD") {
            Some(v) => v
                .parse::<PriceField>()
                .map_err(|e| anyhow!("Invalid PV_PRICE_FIELD: {}", e))?,
            None => PriceField::default(),
        };

        let defaults = SyncSettings::default();
        let sync = SyncSettings {
            default_start_date: match var("PV_DEFAULT_START_DATE") {
                Some(v) => NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")
                    .context("Invalid PV_DEFAULT_START_DATE")?,
                None => defaults.default_start_date,
            },
            fetch_timeout: parse_millis(var("PV_FETCH_TIMEOUT_MS"), "PV_FETCH_TIMEOUT_MS")?
                .unwrap_or(defaults.fetch_timeout),
            max_retries: match var("PV_MAX_RETRIES") {
                Some(v) => v.trim().parse().context("Invalid PV_MAX_RETRIES")?,
                None => defaults.max_retries,
            },
            retry_backoff: parse_millis(var("PV_RETRY_BACKOFF_MS"), "PV_RETRY_BACKOFF_MS")?
                .unwrap_or(defaults.retry_backoff),
            reject_negative_prices: defaults.reject_negative_prices,
        };
        sync.validate()?;

        Ok(Self {
            backend,
            store_path,
            tickers,
            price_field,
            sync,
        })
    }
}

fn parse_millis(value: Option<String>, key: &str) -> anyhow::Result<Option<Duration>> {
    value
        .map(|v| {
            v.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .with_context(|| format!("Invalid {}", key))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.backend, StoreBackend::Json);
        assert_eq!(config.store_path, PathBuf::from("etf-data.json"));
        assert_eq!(
            config.tickers,
            TickerSource::File(PathBuf::from("etf-tickers.json"))
        );
        assert_eq!(config.price_field, PriceField::AdjustedClose);
        assert_eq!(config.sync, SyncSettings::default());
    }

    #[test]
    fn test_sqlite_backend_picks_its_own_default_path() {
        let config = config(&[("PV_STORE_BACKEND", "SQLite")]).unwrap();
        assert_eq!(config.backend, StoreBackend::Sqlite);
        assert_eq!(config.store_path, PathBuf::from("etf-data.db"));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PV_TICKERS", "SPY,QQQ"),
            ("PV_TICKERS_FILE", "ignored.json"),
            ("PV_DEFAULT_START_DATE", "2000-01-03"),
            ("PV_FETCH_TIMEOUT_MS", "1500"),
            ("PV_MAX_RETRIES", "0"),
            ("PV_PRICE_FIELD", "close"),
        ])
        .unwrap();
        assert_eq!(config.tickers, TickerSource::List("SPY,QQQ".into()));
        assert_eq!(
            config.sync.default_start_date,
            NaiveDate::from_ymd_opt(2000, 1, 3).unwrap()
        );
        assert_eq!(config.sync.fetch_timeout, Duration::from_millis(1500));
        assert_eq!(config.sync.max_retries, 0);
        assert_eq!(config.price_field, PriceField::Close);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(config(&[("PV_STORE_BACKEND", "duckdb")]).is_err());
        assert!(config(&[("PV_FETCH_TIMEOUT_MS", "soon")]).is_err());
        assert!(config(&[("PV_FETCH_TIMEOUT_MS", "0")]).is_err());
        assert!(config(&[("PV_DEFAULT_START_DATE", "01/01/1900")]).is_err());
        assert!(config(&[("PV_PRICE_FIELD", "vwap")]).is_err());
        assert!(config(&[("PV_RETRY_BACKOFF_MS", "18446744073709551615")]).is_err());
    }
}

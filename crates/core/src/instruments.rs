//! The list of tracked instruments.
//!
//! Loaded once per run, either from a JSON document of the form
//! `{"tickers": ["SPY", "IWDA.AS"]}` or from a comma separated list.

use log::warn;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::errors::{Error, Result};
use crate::prices::model::InstrumentId;

#[derive(Debug, Deserialize)]
struct TickersDocument {
    tickers: Option<Vec<String>>,
}

/// Ordered, duplicate-free set of instruments to sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedInstruments {
    instruments: Vec<InstrumentId>,
}

impl TrackedInstruments {
    /// Builds the list, keeping first occurrences and dropping blank
    /// symbols. Symbols are trimmed but otherwise kept as written.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut instruments = Vec::new();

        for symbol in symbols {
            let symbol = symbol.as_ref().trim();
            if symbol.is_empty() {
                warn!("Ignoring blank ticker symbol");
                continue;
            }
            if !seen.insert(symbol.to_string()) {
                warn!("Ignoring duplicate ticker symbol '{}'", symbol);
                continue;
            }
            instruments.push(InstrumentId::new(symbol));
        }

        Self { instruments }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let doc: TickersDocument = serde_json::from_str(content)
            .map_err(|e| Error::ConfigIO(format!("Invalid tickers document: {}", e)))?;
        let tickers = doc
            .tickers
            .ok_or_else(|| Error::MissingConfigKey("tickers".to_string()))?;
        Ok(Self::new(tickers))
    }

    /// Reads a `{"tickers": [...]}` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigIO(format!("Cannot read tickers file {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Parses a comma separated list such as `"SPY, QQQ,IWDA.AS"`.
    pub fn from_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstrumentId> {
        self.instruments.iter()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

impl<'a> IntoIterator for &'a TrackedInstruments {
    type Item = &'a InstrumentId;
    type IntoIter = std::slice::Iter<'a, InstrumentId>;

    fn into_iter(self) -> Self::IntoIter {
        self.instruments.iter()
    }
}

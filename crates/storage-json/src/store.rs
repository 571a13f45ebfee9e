use chrono::{NaiveDate, Utc};
use log::{debug, warn};
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use pricevault_core::errors::{DatabaseError, Result, ValidationError};
use pricevault_core::prices::{
    ensure_finite, format_day, parse_day, InstrumentId, PricePoint, TimeSeriesStore,
};

/// Instrument → day key → price. Day keys stay raw text until read so that a
/// corrupt key surfaces as an error for its instrument only.
type Document = BTreeMap<String, BTreeMap<String, f64>>;

/// Time-series store backed by a single JSON document.
pub struct JsonFileStore {
    path: PathBuf,
    data: Document,
    load_warning: Option<String>,
}

impl JsonFileStore {
    /// Opens the document at `path`.
    ///
    /// A missing file yields an empty store. An unreadable or corrupt file
    /// is moved aside to `<name>.corrupt-<timestamp>` and the store starts
    /// empty, with the reason available from `load_warning`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let (data, load_warning) = match Self::load(&path) {
            Ok(data) => (data, None),
            Err(reason) => {
                let warning = match quarantine(&path) {
                    Ok(moved) => format!(
                        "{}: {}; moved to {}",
                        path.display(),
                        reason,
                        moved.display()
                    ),
                    Err(e) => format!(
                        "{}: {}; could not be moved aside: {}",
                        path.display(),
                        reason,
                        e
                    ),
                };
                warn!("Starting with an empty document store: {}", warning);
                (Document::new(), Some(warning))
            }
        };

        debug!(
            "Opened document store {} with {} instruments",
            path.display(),
            data.len()
        );

        Self {
            path,
            data,
            load_warning,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> std::result::Result<Document, String> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(format!("unreadable ({})", e)),
        };
        if content.trim().is_empty() {
            return Ok(Document::new());
        }
        serde_json::from_str(&content).map_err(|e| format!("corrupt ({})", e))
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        serde::Serialize::serialize(&self.data, &mut serializer)
            .map_err(|e| DatabaseError::WriteFailed(format!("serialization failed: {}", e)))?;
        Ok(buf)
    }
}

/// Renames a corrupt file out of the way so that the next persist cannot
/// overwrite the only copy of the old data.
fn quarantine(path: &Path) -> std::io::Result<PathBuf> {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S")));
    let target = PathBuf::from(name);
    fs::rename(path, &target)?;
    Ok(target)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

impl TimeSeriesStore for JsonFileStore {
    fn backend_name(&self) -> &'static str {
        "json"
    }

    fn get_existing(&self, instrument: &InstrumentId) -> Result<Vec<PricePoint>> {
        let Some(series) = self.data.get(instrument.as_str()) else {
            return Ok(Vec::new());
        };

        let mut points = series
            .iter()
            .map(|(key, price)| {
                parse_day(key)
                    .map(|date| PricePoint::new(date, *price))
                    .ok_or_else(|| ValidationError::CorruptStoredDate {
                        instrument: instrument.to_string(),
                        value: key.clone(),
                    })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        points.sort_by_key(|p| p.date);
        Ok(points)
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
            .entry(instrument.as_str().to_string())
            .or_default()
            .insert(format_day(date), price))
    }

    fn persist(&mut self) -> Result<()> {
        let bytes = self.serialize()?;
        let write_failed = |e: std::io::Error| {
            DatabaseError::WriteFailed(format!("{}: {}", self.path.display(), e))
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }

        let tmp = temp_path(&self.path);
        let written = fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(&bytes)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|_| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            return Err(write_failed(e).into());
        }

        debug!(
            "Persisted {} instruments to {}",
            self.data.len(),
            self.path.display()
        );
        Ok(())
    }

    fn instruments(&self) -> Result<Vec<InstrumentId>> {
        Ok(self
            .data
            .iter()
            .filter(|(_, series)| !series.is_empty())
            .map(|(id, _)| InstrumentId::new(id.clone()))
            .collect())
    }

    fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }
}

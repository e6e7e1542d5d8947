mod contacts;
mod parser;
mod payload;
mod timestamp;

use crate::metrics::{RawRecord, REFERENCE_TIMEZONE};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

pub use contacts::{ContactDirectory, PartnerContact};
pub use payload::RecordPayload;
pub use timestamp::{parse_timestamp, resolve_occurred_at};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read appointment export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid appointment CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Reads closer-app CSV exports into [`RawRecord`]s.
#[derive(Debug, Clone, Copy)]
pub struct AppointmentImporter {
    timezone: Tz,
}

impl Default for AppointmentImporter {
    fn default() -> Self {
        Self::new(REFERENCE_TIMEZONE)
    }
}

impl AppointmentImporter {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Vec<RawRecord>, ImportError> {
        let file = std::fs::File::open(path)?;
        self.from_reader(file)
    }

    pub fn from_reader<R: Read>(&self, reader: R) -> Result<Vec<RawRecord>, ImportError> {
        Ok(parser::parse_records(reader, self.timezone)?)
    }

    pub fn from_payloads(&self, payloads: Vec<RecordPayload>) -> Vec<RawRecord> {
        payloads
            .into_iter()
            .map(|payload| payload.into_record(self.timezone))
            .collect()
    }
}

/// Anything that can hand the aggregator a finite batch of appointment records.
pub trait RecordSource: Send + Sync {
    fn fetch(&self) -> Result<Vec<RawRecord>, ImportError>;
}

/// Re-reads a CSV export on every fetch so the file can be replaced underneath a running service.
#[derive(Debug, Clone)]
pub struct CsvRecordSource {
    path: PathBuf,
    importer: AppointmentImporter,
}

impl CsvRecordSource {
    pub fn new(path: impl Into<PathBuf>, timezone: Tz) -> Self {
        Self {
            path: path.into(),
            importer: AppointmentImporter::new(timezone),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for CsvRecordSource {
    fn fetch(&self) -> Result<Vec<RawRecord>, ImportError> {
        let records = self.importer.from_path(&self.path)?;
        info!(path = %self.path.display(), records = records.len(), "loaded appointment export");
        Ok(records)
    }
}

/// Fixed in-memory batch, used when records arrive with the request or in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRecordSource {
    records: Vec<RawRecord>,
}

impl StaticRecordSource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }
}

impl RecordSource for StaticRecordSource {
    fn fetch(&self) -> Result<Vec<RawRecord>, ImportError> {
        Ok(self.records.clone())
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

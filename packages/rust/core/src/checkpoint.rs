//! Accumulated results and their CSV snapshots.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use horoscope_shared::{HoroscopeError, Record, Result};
use tracing::debug;

use crate::normalize::{NormalizedField, normalize_record};

/// Column holding the basename of the file a record came from.
pub const SOURCE_FILE_COLUMN: &str = "source_file";

/// Column holding the generated text.
pub const HOROSCOPE_COLUMN: &str = "horoscope";

/// A source record with its generated horoscope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    pub fields: Vec<NormalizedField>,
    pub source_file: String,
    pub horoscope: String,
}

impl EnrichedRecord {
    /// Normalize `record` and attach provenance and output.
    ///
    /// Source columns named like the reserved output columns are dropped.
    pub fn new(record: &Record, source_file: impl Into<String>, horoscope: impl Into<String>) -> Self {
        let fields = normalize_record(record)
            .into_iter()
            .filter(|f| f.name != SOURCE_FILE_COLUMN && f.name != HOROSCOPE_COLUMN)
            .collect();
        Self {
            fields,
            source_file: source_file.into(),
            horoscope: horoscope.into(),
        }
    }

    /// Value of a column, including the reserved ones.
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            SOURCE_FILE_COLUMN => Some(&self.source_file),
            HOROSCOPE_COLUMN => Some(&self.horoscope),
            _ => self
                .fields
                .iter()
                .find(|f| f.name == name)
                .and_then(|f| f.value.as_deref()),
        }
    }
}

/// Ordered, append-only collection of successful results.
#[derive(Debug, Default)]
pub struct ResultAccumulator {
    records: Vec<EnrichedRecord>,
}

impl ResultAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: EnrichedRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnrichedRecord> {
        self.records.iter()
    }

    /// Union of field names in first-seen order, then the reserved columns.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for field in self.records.iter().flat_map(|r| &r.fields) {
            if !columns.contains(&field.name) {
                columns.push(field.name.clone());
            }
        }
        columns.push(SOURCE_FILE_COLUMN.to_string());
        columns.push(HOROSCOPE_COLUMN.to_string());
        columns
    }
}

/// Checkpoint file for a run started at `started_at`.
pub fn checkpoint_path(output_dir: &Path, started_at: DateTime<Local>) -> PathBuf {
    output_dir.join(format!(
        "horoscopes_{}.csv",
        started_at.format("%Y%m%d_%H%M%S")
    ))
}

/// Write every accumulated result to `path`, replacing any previous snapshot.
///
/// The CSV is written to a hidden temp file in the same directory and renamed
/// into place.
pub fn write_checkpoint(results: &ResultAccumulator, path: &Path) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| HoroscopeError::checkpoint(path, "path has no file name"))?;
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    let columns = results.columns();
    let write = || -> std::result::Result<(), csv::Error> {
        let mut writer = csv::Writer::from_path(&tmp_path)?;
        writer.write_record(&columns)?;
        for record in results.iter() {
            writer.write_record(
                columns
                    .iter()
                    .map(|column| record.get(column).unwrap_or_default()),
            )?;
        }
        writer.flush()?;
        Ok(())
    };

    if let Err(e) = write() {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(HoroscopeError::checkpoint(path, e.to_string()));
    }

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        HoroscopeError::checkpoint(path, format!("rename failed: {e}"))
    })?;

    debug!(path = %path.display(), records = results.len(), "checkpoint written");
    Ok(())
}

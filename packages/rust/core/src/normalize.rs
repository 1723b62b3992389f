//! Cell value normalization.
//!
//! Every value that leaves the reader passes through [`normalize`] before it
//! reaches a prompt, a log line or a checkpoint. The result is either a
//! trimmed, non-empty string or `None`.

use horoscope_shared::{CellValue, Record};

/// Output format for dates and date-times.
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Largest magnitude at which whole floats are printed as integers.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// A field name paired with its normalized value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedField {
    pub name: String,
    pub value: Option<String>,
}

/// Normalize a raw cell. Idempotent on its own string output.
pub fn normalize(value: &CellValue) -> Option<String> {
    let text = match value {
        CellValue::Empty => return None,
        CellValue::Date(date) => return Some(date.format(DATE_FORMAT).to_string()),
        CellValue::DateTime(dt) => return Some(dt.format(DATE_FORMAT).to_string()),
        CellValue::String(s) => s.trim().to_string(),
        CellValue::Int(i) => i.to_string(),
        CellValue::Float(f) => format_float(*f),
        CellValue::Bool(b) => b.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Normalize every column of a record, keeping column order.
pub fn normalize_record(record: &Record) -> Vec<NormalizedField> {
    record
        .iter()
        .map(|(name, value)| NormalizedField {
            name: name.to_string(),
            value: normalize(value),
        })
        .collect()
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

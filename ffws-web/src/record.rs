use chrono::{DateTime, Local};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

use crate::error::ExtractError;

/// Outcome of one extraction call: all records or an error, never a mix.
pub type ExtractionResult = Result<Extraction, ExtractError>;

/// Name of the timestamp column appended to every record.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Moment an extraction call read the table. Taken once per call and shared
/// by every record it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CaptureTime(DateTime<Local>);

impl CaptureTime {
    pub fn now() -> Self {
        Self(Local::now())
    }

    pub fn at(instant: DateTime<Local>) -> Self {
        Self(instant)
    }

    pub fn instant(&self) -> DateTime<Local> {
        self.0
    }
}

impl fmt::Display for CaptureTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M"))
    }
}

impl Serialize for CaptureTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One table row, keyed by the dataset's field names in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: Vec<(&'static str, String)>,
    captured_at: CaptureTime,
}

impl Record {
    /// Map `cells` positionally onto `fields`; cell `i` becomes field `i`.
    /// Missing trailing cells become empty strings, surplus cells are dropped.
    pub fn from_cells(
        fields: &'static [&'static str],
        mut cells: Vec<String>,
        captured_at: CaptureTime,
    ) -> Self {
        cells.resize(fields.len(), String::new());
        Self {
            values: fields.iter().copied().zip(cells).collect(),
            captured_at,
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value.as_str())
    }

    /// Field/value pairs in column order, without the timestamp.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.values.iter().map(|(name, value)| (*name, value.as_str()))
    }

    pub fn captured_at(&self) -> CaptureTime {
        self.captured_at
    }

    /// Values in column order followed by the formatted timestamp.
    pub fn to_row(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|(_, value)| value.clone())
            .chain(std::iter::once(self.captured_at.to_string()))
            .collect()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(TIMESTAMP_FIELD, &self.captured_at)?;
        map.end()
    }
}

/// A successfully parsed table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub dataset: &'static str,
    /// Header cell text in document order, as rendered by the source.
    pub headers: Vec<String>,
    pub records: Vec<Record>,
    pub fields: &'static [&'static str],
    pub captured_at: CaptureTime,
}

impl Extraction {
    /// Record field names followed by `timestamp`, i.e. the export columns.
    pub fn columns(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .copied()
            .chain(std::iter::once(TIMESTAMP_FIELD))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

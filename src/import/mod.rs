//! Workout history readers
//!
//! Every record is parsed on its own. A malformed row or timestamp is skipped
//! and reported in the [`ImportSummary`]; it never fails the whole file.

use crate::error::{ImportError, Result};
use crate::models::WorkoutRecord;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

pub mod csv;
pub mod json;

/// Trait for importing workout records from different file formats
pub trait ImportFormat {
    /// Check if this importer can handle the given file
    fn can_import(&self, file_path: &Path) -> bool;

    /// Read all records; naive timestamps are taken as local time in `timezone`
    fn import_file(&self, file_path: &Path, timezone: &FixedOffset) -> Result<ImportOutcome>;

    fn format_name(&self) -> &'static str;
}

/// A record that could not be imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// 1-based row (CSV, excluding header) or array position (JSON)
    pub position: usize,
    pub reason: String,
}

/// Per-file import statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total: usize,
    pub imported: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl ImportSummary {
    pub fn record_ok(&mut self) {
        self.total += 1;
        self.imported += 1;
    }

    pub fn record_skip(&mut self, position: usize, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(position, reason = %reason, "Skipping workout record");
        self.total += 1;
        self.skipped.push(SkippedRecord { position, reason });
    }

}

/// Records read from one or more files plus what was skipped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    pub workouts: Vec<WorkoutRecord>,
    pub summary: ImportSummary,
}

/// Chooses an importer by file extension
pub struct ImportManager {
    importers: Vec<Box<dyn ImportFormat + Send + Sync>>,
}

impl Default for ImportManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportManager {
    pub fn new() -> Self {
        let importers: Vec<Box<dyn ImportFormat + Send + Sync>> = vec![
            Box::new(csv::CsvImporter::new()),
            Box::new(json::JsonImporter::new()),
        ];

        Self { importers }
    }

    /// Import a single file, auto-detecting the format
    pub fn import_file(&self, file_path: &Path, timezone: &FixedOffset) -> Result<ImportOutcome> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound {
                path: file_path.to_path_buf(),
            }
            .into());
        }

        let importer = self
            .importers
            .iter()
            .find(|importer| importer.can_import(file_path))
            .ok_or_else(|| ImportError::UnsupportedFormat {
                format: file_path
                    .extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            })?;

        let mut outcome = importer.import_file(file_path, timezone)?;
        outcome.workouts.sort_by_key(|w| w.start);

        info!(
            file = %file_path.display(),
            format = importer.format_name(),
            imported = outcome.summary.imported,
            skipped = outcome.summary.skipped.len(),
            "Imported workouts"
        );

        Ok(outcome)
    }
}

pub(crate) fn has_extension(file_path: &Path, expected: &str) -> bool {
    file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

/// Parse a workout start time.
///
/// Accepts RFC 3339 with an offset, naive date-times (local to `timezone`),
/// bare dates (local midnight) and epoch seconds.
pub fn parse_timestamp(value: &str, timezone: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }

    const NAIVE_FORMATS: [&str; 6] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    for format in &NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return timezone.from_local_datetime(&naive).single();
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| timezone.from_local_datetime(&naive).single());
    }

    value
        .parse::<i64>()
        .ok()
        .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
        .map(|utc| utc.with_timezone(timezone))
}

/// Parse a duration given as seconds or as `HH:MM:SS` / `MM:SS`
pub fn parse_duration_seconds(value: &str) -> Option<u32> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u32>() {
        return Some(seconds);
    }
    if let Ok(seconds) = value.parse::<f64>() {
        let rounded = seconds.round();
        return (rounded.is_finite() && rounded >= 0.0 && rounded <= f64::from(u32::MAX))
            .then_some(rounded as u32);
    }

    let parts: Vec<u32> = value.split(':').map(|p| p.parse().ok()).collect::<Option<Vec<_>>>()?;
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0, *m, *s),
        _ => return None,
    };

    hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}

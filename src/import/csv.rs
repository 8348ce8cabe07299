use chrono::FixedOffset;
use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ImportError, Result};
use crate::import::{has_extension, parse_duration_seconds, parse_timestamp, ImportFormat, ImportOutcome};
use crate::models::{SportCategory, WorkoutRecord};

/// CSV importer with flexible column mapping, one workout per row
pub struct CsvImporter {
    column_mapping: HashMap<String, &'static str>,
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvImporter {
    pub fn new() -> Self {
        let mut column_mapping = HashMap::new();

        Self::add_mapping(&mut column_mapping, "id", &["id", "activity_id", "workout_id"]);
        Self::add_mapping(
            &mut column_mapping,
            "start",
            &["start", "start_time", "start_date", "date", "timestamp", "start_date_local"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "sport",
            &["sport", "type", "activity_type", "sport_type"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "moving_time",
            &["moving_time", "moving_time_seconds", "duration", "elapsed_time"],
        );
        Self::add_mapping(&mut column_mapping, "distance", &["distance", "distance_meters", "dist"]);
        Self::add_mapping(
            &mut column_mapping,
            "avg_heart_rate",
            &["avg_heart_rate", "average_heartrate", "avg_hr", "heart_rate", "hr"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "max_heart_rate",
            &["max_heart_rate", "max_heartrate", "max_hr"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "avg_power",
            &["avg_power", "average_watts", "power", "watts"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "perceived_exertion",
            &["perceived_exertion", "rpe", "exertion"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "stress_score",
            &["stress_score", "tss", "training_stress_score", "suffer_score"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "recovery_hours",
            &["recovery_hours", "recovery_time", "recovery"],
        );

        Self { column_mapping }
    }

    fn add_mapping(mapping: &mut HashMap<String, &'static str>, standard: &'static str, variations: &[&str]) {
        for variation in variations {
            mapping.insert(variation.to_lowercase(), standard);
        }
    }

    fn normalize_column_name(&self, name: &str) -> Option<&'static str> {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");
        self.column_mapping.get(&normalized).copied()
    }

    /// Map standard field names onto header positions; first match wins
    fn index_headers(&self, headers: &StringRecord) -> HashMap<&'static str, usize> {
        let mut columns = HashMap::new();
        for (index, header) in headers.iter().enumerate() {
            if let Some(standard) = self.normalize_column_name(header) {
                columns.entry(standard).or_insert(index);
            }
        }
        columns
    }

    fn parse_row(
        row: &StringRecord,
        columns: &HashMap<&'static str, usize>,
        position: usize,
        timezone: &FixedOffset,
    ) -> std::result::Result<WorkoutRecord, String> {
        let field = |name: &str| {
            columns
                .get(name)
                .and_then(|index| row.get(*index))
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let start_raw = field("start").ok_or_else(|| "missing start time".to_string())?;
        let start =
            parse_timestamp(start_raw, timezone).ok_or_else(|| format!("invalid start time '{}'", start_raw))?;

        let sport = field("sport").map(SportCategory::from_label).unwrap_or(SportCategory::Other);
        let id = field("id").map(str::to_string).unwrap_or_else(|| format!("row-{}", position));

        let mut record = WorkoutRecord::new(id, start, sport);
        record.moving_time_seconds = optional(field("moving_time"), "moving_time", parse_duration_seconds)?;
        record.distance_meters = optional(field("distance"), "distance", |v| Decimal::from_str(v).ok())?;
        record.avg_heart_rate = optional(field("avg_heart_rate"), "avg_heart_rate", parse_whole)?;
        record.max_heart_rate = optional(field("max_heart_rate"), "max_heart_rate", parse_whole)?;
        record.avg_power = optional(field("avg_power"), "avg_power", parse_whole)?;
        record.perceived_exertion = optional(field("perceived_exertion"), "perceived_exertion", parse_whole)?;
        record.stress_score = optional(field("stress_score"), "stress_score", |v| Decimal::from_str(v).ok())?;
        record.recovery_hours = optional(field("recovery_hours"), "recovery_hours", parse_whole)?;

        Ok(record)
    }
}

/// Parse an optional cell; a present but unparsable value rejects the row
fn optional<T>(
    value: Option<&str>,
    name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> std::result::Result<Option<T>, String> {
    match value {
        None => Ok(None),
        Some(raw) => parse(raw)
            .map(Some)
            .ok_or_else(|| format!("invalid {} '{}'", name, raw)),
    }
}

/// Whole numbers, tolerating a trailing ".0" from spreadsheet exports
fn parse_whole<T: TryFrom<u64>>(value: &str) -> Option<T> {
    let number = value
        .parse::<u64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v.round() as u64))?;
    T::try_from(number).ok()
}

impl ImportFormat for CsvImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        has_extension(file_path, "csv")
    }

    fn import_file(&self, file_path: &Path, timezone: &FixedOffset) -> Result<ImportOutcome> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(file_path)?;

        let columns = self.index_headers(reader.headers()?);
        if !columns.contains_key("start") {
            return Err(ImportError::MissingColumn {
                column: "start".to_string(),
            }
            .into());
        }

        let mut outcome = ImportOutcome::default();
        for (index, row) in reader.records().enumerate() {
            let position = index + 1;
            let parsed = row
                .map_err(|err| err.to_string())
                .and_then(|row| Self::parse_row(&row, &columns, position, timezone));

            match parsed {
                Ok(record) => {
                    outcome.summary.record_ok();
                    outcome.workouts.push(record);
                }
                Err(reason) => outcome.summary.record_skip(position, reason),
            }
        }

        Ok(outcome)
    }

    fn format_name(&self) -> &'static str {
        "CSV"
    }
}

use chrono::FixedOffset;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::{ImportError, Result};
use crate::import::{has_extension, parse_timestamp, ImportFormat, ImportOutcome};
use crate::models::{SportCategory, WorkoutRecord};

/// Loose shape of one workout in a JSON export
#[derive(Debug, Deserialize)]
struct JsonWorkout {
    #[serde(default)]
    id: Option<Value>,
    #[serde(alias = "start_time", alias = "start_date", alias = "date")]
    start: String,
    #[serde(default, alias = "type", alias = "activity_type")]
    sport: Option<String>,
    #[serde(default, alias = "duration")]
    moving_time_seconds: Option<u32>,
    #[serde(default, alias = "distance")]
    distance_meters: Option<Decimal>,
    #[serde(default, alias = "average_heartrate")]
    avg_heart_rate: Option<u16>,
    #[serde(default, alias = "max_heartrate")]
    max_heart_rate: Option<u16>,
    #[serde(default, alias = "average_watts")]
    avg_power: Option<u16>,
    #[serde(default, alias = "rpe")]
    perceived_exertion: Option<u8>,
    #[serde(default, alias = "tss")]
    stress_score: Option<Decimal>,
    #[serde(default)]
    recovery_hours: Option<u32>,
}

impl JsonWorkout {
    fn into_record(self, position: usize, timezone: &FixedOffset) -> std::result::Result<WorkoutRecord, String> {
        let start = parse_timestamp(&self.start, timezone)
            .ok_or_else(|| format!("invalid start time '{}'", self.start))?;

        let id = match self.id {
            Some(Value::String(id)) => id,
            Some(Value::Number(id)) => id.to_string(),
            _ => format!("item-{}", position),
        };
        let sport = self
            .sport
            .as_deref()
            .map(SportCategory::from_label)
            .unwrap_or(SportCategory::Other);

        let mut record = WorkoutRecord::new(id, start, sport);
        record.moving_time_seconds = self.moving_time_seconds;
        record.distance_meters = self.distance_meters;
        record.avg_heart_rate = self.avg_heart_rate;
        record.max_heart_rate = self.max_heart_rate;
        record.avg_power = self.avg_power;
        record.perceived_exertion = self.perceived_exertion;
        record.stress_score = self.stress_score;
        record.recovery_hours = self.recovery_hours;
        Ok(record)
    }
}

/// Reads a JSON array of workouts, or an object with a `workouts` array
#[derive(Debug, Default)]
pub struct JsonImporter;

impl JsonImporter {
    pub fn new() -> Self {
        JsonImporter
    }

    fn items(document: Value) -> Result<Vec<Value>> {
        match document {
            Value::Array(items) => Ok(items),
            Value::Object(mut object) => match object.remove("workouts") {
                Some(Value::Array(items)) => Ok(items),
                _ => Err(ImportError::InvalidDocument {
                    reason: "expected a 'workouts' array".to_string(),
                }
                .into()),
            },
            _ => Err(ImportError::InvalidDocument {
                reason: "expected an array of workouts".to_string(),
            }
            .into()),
        }
    }
}

impl ImportFormat for JsonImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        has_extension(file_path, "json")
    }

    fn import_file(&self, file_path: &Path, timezone: &FixedOffset) -> Result<ImportOutcome> {
        let content = fs::read_to_string(file_path)?;
        let document: Value = serde_json::from_str(&content)?;

        let mut outcome = ImportOutcome::default();
        for (index, item) in Self::items(document)?.into_iter().enumerate() {
            let position = index + 1;
            let parsed = serde_json::from_value::<JsonWorkout>(item)
                .map_err(|err| err.to_string())
                .and_then(|workout| workout.into_record(position, timezone));

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
        "JSON"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn import(content: &str) -> Result<ImportOutcome> {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        JsonImporter::new().import_file(file.path(), &FixedOffset::east_opt(3600).unwrap())
    }

    #[test]
    fn test_import_array() {
        let outcome = import(
            r#"[
                {"id": 42, "start_time": "2024-05-01T06:00:00Z", "type": "Run", "duration": 2700, "average_heartrate": 152},
                {"id": "b", "start": "2024-05-02 17:00:00", "sport": "cycling", "tss": "80.5"}
            ]"#,
        )
        .unwrap();

        assert_eq!(outcome.summary.imported, 2);
        assert_eq!(outcome.workouts[0].id, "42");
        assert_eq!(outcome.workouts[0].sport, SportCategory::Running);
        assert_eq!(outcome.workouts[0].avg_heart_rate, Some(152));
        assert_eq!(outcome.workouts[1].start.to_rfc3339(), "2024-05-02T17:00:00+01:00");
        assert_eq!(outcome.workouts[1].stress_score, Some(dec!(80.5)));
    }

    #[test]
    fn test_malformed_items_are_skipped() {
        let outcome = import(
            r#"{"workouts": [
                {"start": "2024-05-01T06:00:00Z", "sport": "swim"},
                {"start": "someday", "sport": "run"},
                {"sport": "run"},
                {"start": "2024-05-03T06:00:00Z", "avg_heart_rate": -5}
            ]}"#,
        )
        .unwrap();

        assert_eq!(outcome.summary.total, 4);
        assert_eq!(outcome.summary.imported, 1);
        let positions: Vec<usize> = outcome.summary.skipped.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![2, 3, 4]);
        assert_eq!(outcome.workouts[0].id, "item-1");
    }

    #[test]
    fn test_non_array_document_is_rejected() {
        assert!(import(r#"{"activities": []}"#).is_err());
        assert!(import("42").is_err());
        assert!(import("not json").is_err());
    }
}

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sport categories recognised by the training load engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SportCategory {
    Running,
    Cycling,
    Swimming,
    Walking,
    Hiking,
    Rowing,
    Strength,
    CrossTraining,
    Other,
}

impl SportCategory {
    /// Map a provider activity label onto a sport category.
    ///
    /// Matching is case-insensitive and ignores separators, so "Trail Run",
    /// "trail_run" and "TrailRun" all resolve to [`SportCategory::Running`].
    /// Unknown labels fall back to [`SportCategory::Other`].
    pub fn from_label(label: &str) -> Self {
        let normalized: String = label
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "running" | "run" | "trailrun" | "virtualrun" | "jog" | "jogging" | "treadmill" => {
                SportCategory::Running
            }
            "cycling" | "ride" | "bike" | "biking" | "virtualride" | "ebikeride"
            | "mountainbikeride" | "gravelride" => SportCategory::Cycling,
            "swimming" | "swim" | "openwaterswim" => SportCategory::Swimming,
            "walking" | "walk" => SportCategory::Walking,
            "hiking" | "hike" => SportCategory::Hiking,
            "rowing" | "row" | "virtualrow" | "canoeing" | "kayaking" => SportCategory::Rowing,
            "strength" | "weighttraining" | "workout" => SportCategory::Strength,
            "crosstraining" | "crossfit" | "elliptical" | "hiit" => SportCategory::CrossTraining,
            _ => SportCategory::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SportCategory::Running => "running",
            SportCategory::Cycling => "cycling",
            SportCategory::Swimming => "swimming",
            SportCategory::Walking => "walking",
            SportCategory::Hiking => "hiking",
            SportCategory::Rowing => "rowing",
            SportCategory::Strength => "strength",
            SportCategory::CrossTraining => "cross_training",
            SportCategory::Other => "other",
        }
    }
}

impl fmt::Display for SportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single completed workout as supplied by the activity store.
///
/// Records are read-only inputs to the engine. The start instant keeps the
/// offset it was recorded in; calendar bucketing always happens in the
/// athlete's timezone, never in the recording offset or UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    /// Identifier assigned by the activity store
    pub id: String,

    /// Start instant with its originating UTC offset
    pub start: DateTime<FixedOffset>,

    /// Sport category
    pub sport: SportCategory,

    /// Moving time in seconds
    #[serde(default)]
    pub moving_time_seconds: Option<u32>,

    /// Distance in meters
    #[serde(default)]
    pub distance_meters: Option<Decimal>,

    /// Average heart rate in bpm
    #[serde(default)]
    pub avg_heart_rate: Option<u16>,

    /// Highest heart rate recorded during the workout
    #[serde(default)]
    pub max_heart_rate: Option<u16>,

    /// Average power in watts
    #[serde(default)]
    pub avg_power: Option<u16>,

    /// Rate of perceived exertion, 1-10
    #[serde(default)]
    pub perceived_exertion: Option<u8>,

    /// Stress score supplied by the provider or device; always preferred over estimation
    #[serde(default)]
    pub stress_score: Option<Decimal>,

    /// Recovery time the device recommended after this workout, in hours
    #[serde(default)]
    pub recovery_hours: Option<u32>,
}

impl WorkoutRecord {
    /// Minimal record used as a starting point by importers and tests
    pub fn new(id: impl Into<String>, start: DateTime<FixedOffset>, sport: SportCategory) -> Self {
        WorkoutRecord {
            id: id.into(),
            start,
            sport,
            moving_time_seconds: None,
            distance_meters: None,
            avg_heart_rate: None,
            max_heart_rate: None,
            avg_power: None,
            perceived_exertion: None,
            stress_score: None,
            recovery_hours: None,
        }
    }

    /// Calendar date of the start instant in the athlete's timezone
    pub fn local_date(&self, timezone: &FixedOffset) -> NaiveDate {
        self.start.with_timezone(timezone).date_naive()
    }

    /// Instant the workout finished (start + moving time)
    pub fn end_time(&self) -> DateTime<FixedOffset> {
        self.start + Duration::seconds(i64::from(self.moving_time_seconds.unwrap_or(0)))
    }

    /// Moving time in hours, zero when missing
    pub fn duration_hours(&self) -> Decimal {
        Decimal::from(self.moving_time_seconds.unwrap_or(0)) / Decimal::from(3600)
    }

    pub fn has_heart_rate(&self) -> bool {
        self.avg_heart_rate.is_some() || self.max_heart_rate.is_some()
    }

    /// Perceived exertion clamped to the 1-10 scale
    pub fn rpe(&self) -> Option<u8> {
        self.perceived_exertion.map(|rpe| rpe.clamp(1, 10))
    }
}

/// Summed training stress for one local calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLoadPoint {
    /// Local calendar date
    pub date: NaiveDate,

    /// Total stress of all workouts on this date (zero on rest days)
    pub load: Decimal,

    /// Total TRIMP of all workouts on this date
    pub trimp: Decimal,

    /// Number of workouts that contributed
    pub workout_count: u16,
}

impl DailyLoadPoint {
    /// Zero-load rest day
    pub fn rest(date: NaiveDate) -> Self {
        DailyLoadPoint {
            date,
            load: Decimal::ZERO,
            trimp: Decimal::ZERO,
            workout_count: 0,
        }
    }

    pub fn is_rest_day(&self) -> bool {
        self.workout_count == 0
    }
}

/// Physiological thresholds estimated from workout history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AthleteThresholds {
    /// Functional maximum heart rate in bpm
    pub max_heart_rate: u16,

    /// Resting heart rate in bpm
    pub resting_heart_rate: u16,

    /// Functional threshold power in watts
    pub functional_threshold_power: Option<u16>,

    /// Lactate threshold heart rate in bpm
    pub lactate_threshold_heart_rate: Option<u16>,
}

/// Manually entered values that replace estimated thresholds for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdOverrides {
    #[serde(default)]
    pub max_heart_rate: Option<u16>,
    #[serde(default)]
    pub resting_heart_rate: Option<u16>,
    #[serde(default)]
    pub functional_threshold_power: Option<u16>,
    #[serde(default)]
    pub lactate_threshold_heart_rate: Option<u16>,
}

impl ThresholdOverrides {
    pub fn is_empty(&self) -> bool {
        self.max_heart_rate.is_none()
            && self.resting_heart_rate.is_none()
            && self.functional_threshold_power.is_none()
            && self.lactate_threshold_heart_rate.is_none()
    }
}

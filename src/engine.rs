//! Training load engine
//!
//! Wires the stress estimator, daily aggregator, PMC calculator, zone analyzer
//! and readiness evaluator together. Every entry point is a pure function of
//! its inputs and always returns a populated result.

use crate::aggregation::{DailyLoadAggregator, DateWindow};
use crate::error::{Result, TrainLoadError};
use crate::models::{AthleteThresholds, DailyLoadPoint, ThresholdOverrides, WorkoutRecord};
use crate::pmc::{PmcCalculator, PmcConfig, PmcMetrics, PmcTrends};
use crate::readiness::{ReadinessConfig, ReadinessEvaluator, ReadinessInput, ReadinessResult};
use crate::tss::{StressConfig, StressEstimator};
use crate::zones::{AnalysisResult, ZoneAnalyzer, ZoneConfig, ZoneRequest, ZoneScheme};
use chrono::{DateTime, FixedOffset};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Every tunable constant used by the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub stress: StressConfig,
    pub pmc: PmcConfig,
    pub zones: ZoneConfig,
    pub readiness: ReadinessConfig,
}

impl EngineConfig {
    /// Reject settings whose bounds are inverted
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.stress.min_intensity_multiplier > self.stress.max_intensity_multiplier {
            problems.push(format!(
                "stress.min_intensity_multiplier ({}) exceeds stress.max_intensity_multiplier ({})",
                self.stress.min_intensity_multiplier, self.stress.max_intensity_multiplier
            ));
        }
        if self.zones.min_plausible_hr > self.zones.max_plausible_hr {
            problems.push(format!(
                "zones.min_plausible_hr ({}) exceeds zones.max_plausible_hr ({})",
                self.zones.min_plausible_hr, self.zones.max_plausible_hr
            ));
        }
        if self.readiness.moderate_threshold > self.readiness.ready_threshold {
            problems.push(format!(
                "readiness.moderate_threshold ({}) exceeds readiness.ready_threshold ({})",
                self.readiness.moderate_threshold, self.readiness.ready_threshold
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(TrainLoadError::Configuration(problems.join("; ")))
        }
    }
}

/// Parameters for a training load query
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub window: DateWindow,
    pub timezone: FixedOffset,
    pub overrides: ThresholdOverrides,
}

/// Daily series, PMC trend and current status for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingLoadReport {
    pub window: DateWindow,
    pub thresholds: AthleteThresholds,
    pub daily: Vec<DailyLoadPoint>,
    pub series: Vec<PmcMetrics>,
    /// Metrics for the last day of the window
    pub current: PmcMetrics,
    pub recommendations: Vec<String>,
    /// Present once the window is long enough for trend analysis
    pub trends: Option<PmcTrends>,
}

impl TrainingLoadReport {
    pub fn total_load(&self) -> Decimal {
        self.daily.iter().map(|p| p.load).sum()
    }

    pub fn rest_days(&self) -> usize {
        self.daily.iter().filter(|p| p.is_rest_day()).count()
    }
}

/// Parameters for a readiness query
#[derive(Debug, Clone)]
pub struct ReadinessRequest {
    pub now: DateTime<FixedOffset>,
    pub timezone: FixedOffset,
    pub weekly_target: Option<Decimal>,
    pub overrides: ThresholdOverrides,
}

/// Shared parameters for a multi-athlete evaluation
#[derive(Debug, Clone)]
pub struct AthleteRequest {
    pub now: DateTime<FixedOffset>,
    pub timezone: FixedOffset,
    /// Training load window length, ending on the local date of `now`
    pub window_days: u32,
    pub weekly_target: Option<Decimal>,
    pub overrides: ThresholdOverrides,
    pub scheme: Option<ZoneScheme>,
}

/// Full evaluation for one athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteReport {
    pub athlete_id: String,
    pub training_load: TrainingLoadReport,
    pub zones: AnalysisResult,
    pub readiness: ReadinessResult,
}

#[derive(Debug, Clone, Default)]
pub struct TrainingLoadEngine {
    config: EngineConfig,
    estimator: StressEstimator,
    aggregator: DailyLoadAggregator,
    pmc: PmcCalculator,
    zones: ZoneAnalyzer,
    readiness: ReadinessEvaluator,
}

impl TrainingLoadEngine {
    pub fn new(config: EngineConfig) -> Self {
        let estimator = StressEstimator::with_config(config.stress.clone());
        TrainingLoadEngine {
            aggregator: DailyLoadAggregator::new(estimator.clone()),
            estimator,
            pmc: PmcCalculator::with_config(config.pmc.clone()),
            zones: ZoneAnalyzer::with_config(config.zones.clone()),
            readiness: ReadinessEvaluator::with_config(config.readiness.clone()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Daily load series and PMC metrics for the requested window.
    ///
    /// An inverted window is swapped rather than rejected. Each workout is
    /// scored with thresholds estimated from the workouts that started at or
    /// before it, so later history never rewrites earlier days. The reported
    /// thresholds are those in force at the end of the window.
    pub fn training_load(&self, workouts: &[WorkoutRecord], request: &LoadRequest) -> TrainingLoadReport {
        let window = if request.window.is_valid() {
            request.window
        } else {
            warn!(
                start = %request.window.start,
                end = %request.window.end,
                "Swapping inverted date window"
            );
            request.window.normalized()
        };

        let history: Vec<WorkoutRecord> = workouts
            .iter()
            .filter(|w| w.local_date(&request.timezone) <= window.end)
            .cloned()
            .collect();
        let (thresholds, _) = self.zones.estimate_thresholds(&history, &request.overrides);
        let daily = self.progressive_daily(&history, &window, &request.timezone, &request.overrides);
        let series = self.pmc.calculate_series(&daily);

        let current = series
            .last()
            .cloned()
            .unwrap_or_else(|| PmcMetrics::empty(window.end));
        let recommendations = self.pmc.generate_recommendations(&current);
        let trends = self.pmc.analyze_trends(&series);

        debug!(
            days = daily.len(),
            chronic = %current.chronic,
            acute = %current.acute,
            status = %current.status,
            "Computed training load"
        );

        TrainingLoadReport {
            window,
            thresholds,
            daily,
            series,
            current,
            recommendations,
            trends,
        }
    }

    /// Heart rate zones and thresholds from the full history
    pub fn analyze_zones(&self, workouts: &[WorkoutRecord], request: &ZoneRequest) -> AnalysisResult {
        self.zones.analyze(workouts, request)
    }

    /// Same-day readiness; form comes from the PMC over the configured lookback.
    /// Workouts starting after `now` are ignored throughout.
    pub fn readiness(&self, workouts: &[WorkoutRecord], request: &ReadinessRequest) -> ReadinessResult {
        let past: Vec<WorkoutRecord> = workouts.iter().filter(|w| w.start <= request.now).cloned().collect();
        let (thresholds, _) = self.zones.estimate_thresholds(&past, &request.overrides);

        let today = request.now.with_timezone(&request.timezone).date_naive();
        let lookback = DateWindow::ending_on(today, self.config.readiness.lookback_days);
        let daily = self.progressive_daily(&past, &lookback, &request.timezone, &request.overrides);
        let form = self.pmc.latest(&daily).map(|metrics| metrics.form);

        let input = ReadinessInput::from_history(
            &past,
            request.now,
            &request.timezone,
            request.weekly_target,
            form,
            &self.estimator,
            &thresholds,
        );

        self.readiness.evaluate(&input)
    }

    /// Daily series where every workout is scored with its own threshold snapshot
    fn progressive_daily(
        &self,
        workouts: &[WorkoutRecord],
        window: &DateWindow,
        timezone: &FixedOffset,
        overrides: &ThresholdOverrides,
    ) -> Vec<DailyLoadPoint> {
        let snapshots = self.zones.thresholds_as_of_each(workouts, overrides);
        self.aggregator
            .aggregate_with(workouts, window, timezone, |index| &snapshots[index])
    }

    /// Evaluate many athletes in parallel; each athlete is independent
    pub fn evaluate_athletes(
        &self,
        athletes: &BTreeMap<String, Vec<WorkoutRecord>>,
        request: &AthleteRequest,
    ) -> BTreeMap<String, AthleteReport> {
        info!("Evaluating {} athletes", athletes.len());

        athletes
            .par_iter()
            .map(|(athlete_id, workouts)| {
                let report = self.evaluate_athlete(athlete_id, workouts, request);
                (athlete_id.clone(), report)
            })
            .collect()
    }

    fn evaluate_athlete(
        &self,
        athlete_id: &str,
        workouts: &[WorkoutRecord],
        request: &AthleteRequest,
    ) -> AthleteReport {
        let today = request.now.with_timezone(&request.timezone).date_naive();

        let training_load = self.training_load(
            workouts,
            &LoadRequest {
                window: DateWindow::ending_on(today, request.window_days),
                timezone: request.timezone,
                overrides: request.overrides.clone(),
            },
        );

        let zones = self.analyze_zones(
            workouts,
            &ZoneRequest {
                as_of: request.now,
                overrides: request.overrides.clone(),
                scheme: request.scheme,
                include_alternatives: true,
            },
        );

        let readiness = self.readiness(
            workouts,
            &ReadinessRequest {
                now: request.now,
                timezone: request.timezone,
                weekly_target: request.weekly_target,
                overrides: request.overrides.clone(),
            },
        );

        debug!(athlete_id, score = readiness.score, "Evaluated athlete");

        AthleteReport {
            athlete_id: athlete_id.to_string(),
            training_load,
            zones,
            readiness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SportCategory;
    use crate::pmc::TrainingStatus;
    use crate::zones::DataQuality;
    use chrono::{Duration, NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn scored(id: &str, day: u32, stress: Decimal) -> WorkoutRecord {
        let start = utc().with_ymd_and_hms(2024, 5, day, 7, 0, 0).unwrap();
        let mut record = WorkoutRecord::new(id, start, SportCategory::Cycling);
        record.moving_time_seconds = Some(3600);
        record.stress_score = Some(stress);
        record
    }

    fn load_request(start: u32, end: u32) -> LoadRequest {
        LoadRequest {
            window: DateWindow::new(date(start), date(end)),
            timezone: utc(),
            overrides: ThresholdOverrides::default(),
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(EngineConfig::default().validate().is_ok());

        let mut config = EngineConfig::default();
        config.stress.min_intensity_multiplier = dec!(2);
        config.zones.min_plausible_hr = 240;
        let err = config.validate().unwrap_err();

        assert!(matches!(err, TrainLoadError::Configuration(_)));
        let message = err.to_string();
        assert!(message.contains("min_intensity_multiplier"));
        assert!(message.contains("min_plausible_hr"));
    }

    #[test]
    fn test_training_load_covers_every_day() {
        let engine = TrainingLoadEngine::default();
        let workouts = vec![scored("a", 3, dec!(80)), scored("b", 3, dec!(20)), scored("c", 6, dec!(50))];

        let report = engine.training_load(&workouts, &load_request(1, 10));

        assert_eq!(report.daily.len(), 10);
        assert_eq!(report.series.len(), 10);
        assert_eq!(report.daily[2].load, dec!(100));
        assert_eq!(report.total_load(), dec!(150));
        assert_eq!(report.rest_days(), 8);
        assert_eq!(report.current.date, date(10));
        assert!(!report.recommendations.is_empty());
    }

    #[test]
    fn test_inverted_window_is_swapped() {
        let engine = TrainingLoadEngine::default();
        let report = engine.training_load(&[scored("a", 4, dec!(60))], &load_request(10, 1));

        assert_eq!(report.window, DateWindow::new(date(1), date(10)));
        assert_eq!(report.daily.len(), 10);
    }

    #[test]
    fn test_empty_history_still_reports() {
        let engine = TrainingLoadEngine::default();
        let report = engine.training_load(&[], &load_request(1, 3));

        assert_eq!(report.current.chronic, Decimal::ZERO);
        assert_eq!(report.current.status, TrainingStatus::Maintain);
        assert_eq!(report.thresholds.max_heart_rate, 190);
        assert!(report.trends.is_none());
    }

    #[test]
    fn test_readiness_uses_full_history() {
        let engine = TrainingLoadEngine::default();
        let workouts = vec![scored("old", 1, dec!(90))];
        let request = ReadinessRequest {
            now: utc().with_ymd_and_hms(2024, 5, 11, 8, 0, 0).unwrap(),
            timezone: utc(),
            weekly_target: None,
            overrides: ThresholdOverrides::default(),
        };

        let result = engine.readiness(&workouts, &request);

        assert_eq!(result.days_since_workout, Some(10));
        assert_eq!(result.weekly_stress, Decimal::ZERO);
        assert!(result.form.is_some());
    }

    fn ride(id: &str, day: u32, watts: u16) -> WorkoutRecord {
        let start = utc().with_ymd_and_hms(2024, 5, day, 7, 0, 0).unwrap();
        let mut record = WorkoutRecord::new(id, start, SportCategory::Cycling);
        record.moving_time_seconds = Some(3600);
        record.avg_power = Some(watts);
        record
    }

    #[test]
    fn test_later_workouts_do_not_rescore_earlier_days() {
        let engine = TrainingLoadEngine::default();
        let first = vec![ride("easy", 1, 200)];
        let mut extended = first.clone();
        extended.push(ride("hard", 8, 300));

        let before = engine.training_load(&first, &load_request(1, 10));
        let after = engine.training_load(&extended, &load_request(1, 10));

        // FTP from the first ride alone is 190 W
        assert_eq!(before.series[0].daily_load.round_dp(2), dec!(110.80));
        for (a, b) in before.series.iter().zip(after.series.iter()).take(7) {
            assert_eq!(a, b);
        }
        // The later ride is scored against the FTP it set itself (285 W)
        assert_eq!(after.thresholds.functional_threshold_power, Some(285));
        assert_eq!(after.daily[7].load.round_dp(2), dec!(110.80));
        assert_ne!(before.series[7], after.series[7]);
    }

    #[test]
    fn test_thresholds_reported_as_of_window_end() {
        let engine = TrainingLoadEngine::default();
        let workouts = vec![ride("early", 2, 200), ride("late", 20, 400)];

        let report = engine.training_load(&workouts, &load_request(1, 10));

        assert_eq!(report.thresholds.functional_threshold_power, Some(190));
    }

    #[test]
    fn test_readiness_ignores_workouts_after_now() {
        let engine = TrainingLoadEngine::default();
        let request = ReadinessRequest {
            now: utc().with_ymd_and_hms(2024, 5, 9, 6, 0, 0).unwrap(),
            timezone: utc(),
            weekly_target: None,
            overrides: ThresholdOverrides::default(),
        };
        let past = vec![ride("a", 3, 220), ride("b", 6, 240)];
        let mut with_future = past.clone();
        with_future.push(ride("later", 9, 380));

        assert_eq!(engine.readiness(&past, &request), engine.readiness(&with_future, &request));
    }

    #[test]
    fn test_evaluate_athletes_keeps_results_separate() {
        let engine = TrainingLoadEngine::default();
        let now = utc().with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();

        let mut busy = Vec::new();
        for day in 0..14 {
            let mut record = WorkoutRecord::new(format!("r{}", day), now - Duration::days(day), SportCategory::Running);
            record.moving_time_seconds = Some(3600);
            record.avg_heart_rate = Some(150);
            record.max_heart_rate = Some(180 + (day % 3) as u16);
            busy.push(record);
        }

        let mut athletes = BTreeMap::new();
        athletes.insert("busy".to_string(), busy);
        athletes.insert("idle".to_string(), Vec::new());

        let request = AthleteRequest {
            now,
            timezone: utc(),
            window_days: 28,
            weekly_target: Some(dec!(300)),
            overrides: ThresholdOverrides::default(),
            scheme: None,
        };
        let reports = engine.evaluate_athletes(&athletes, &request);

        assert_eq!(reports.len(), 2);
        let busy = &reports["busy"];
        let idle = &reports["idle"];
        assert_eq!(busy.training_load.daily.len(), 28);
        assert_eq!(busy.zones.thresholds.max_heart_rate, 182);
        assert_eq!(busy.zones.data_quality, DataQuality::Excellent);
        assert_eq!(idle.zones.data_quality, DataQuality::None);
        assert_eq!(idle.readiness.days_since_workout, None);
        assert!(busy.training_load.total_load() > Decimal::ZERO);
    }
}

use crate::models::{AthleteThresholds, SportCategory, WorkoutRecord};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Stress estimation constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// Base stress per hour for running (default: 70)
    pub running_tss_per_hour: Decimal,

    /// Base stress per hour for every other sport (default: 55)
    pub default_tss_per_hour: Decimal,

    /// Average heart rate that maps to an intensity multiplier of 1.0
    pub reference_heart_rate: u16,

    /// Lower bound of the heart rate intensity multiplier
    pub min_intensity_multiplier: Decimal,

    /// Upper bound of the heart rate intensity multiplier
    pub max_intensity_multiplier: Decimal,

    /// Cap on the power intensity factor (avg power / FTP)
    pub max_power_intensity_factor: Decimal,

    /// Banister TRIMP weighting coefficient
    pub trimp_weighting: f64,

    /// Banister TRIMP exponent
    pub trimp_exponent: f64,
}

impl Default for StressConfig {
    fn default() -> Self {
        StressConfig {
            running_tss_per_hour: dec!(70),
            default_tss_per_hour: dec!(55),
            reference_heart_rate: 140,
            min_intensity_multiplier: dec!(0.5),
            max_intensity_multiplier: dec!(1.5),
            max_power_intensity_factor: dec!(1.5),
            trimp_weighting: 0.64,
            trimp_exponent: 1.92,
        }
    }
}

/// Method used to obtain a workout's stress score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressMethod {
    /// Score supplied with the record
    Explicit,
    /// Average power against FTP
    PowerBased,
    /// Duration and sport scaled by heart rate
    HeartRateBased,
    /// Duration and sport only
    DurationEstimate,
}

/// Stress estimate for one workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressResult {
    pub stress: Decimal,
    pub trimp: Decimal,
    pub method: StressMethod,
    pub intensity_factor: Option<Decimal>,
}

/// Converts workout records into stress and TRIMP values
#[derive(Debug, Clone, Default)]
pub struct StressEstimator {
    config: StressConfig,
}

impl StressEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StressConfig) -> Self {
        StressEstimator { config }
    }

    pub fn config(&self) -> &StressConfig {
        &self.config
    }

    /// Estimate stress for a workout using the best available inputs.
    ///
    /// Order of preference: explicit score, power against FTP, heart-rate
    /// scaled duration, plain duration. TRIMP is computed independently of the
    /// stress path whenever average heart rate is present.
    pub fn estimate(&self, workout: &WorkoutRecord, thresholds: &AthleteThresholds) -> StressResult {
        let trimp = self.calculate_trimp(workout, thresholds);

        if let Some(score) = workout.stress_score {
            if score >= Decimal::ZERO {
                return StressResult {
                    stress: score,
                    trimp,
                    method: StressMethod::Explicit,
                    intensity_factor: None,
                };
            }
            warn!(
                workout_id = %workout.id,
                score = %score,
                "Ignoring negative explicit stress score, falling back to estimation"
            );
        }

        let duration_hours = workout.duration_hours();
        if duration_hours <= Decimal::ZERO {
            return StressResult {
                stress: Decimal::ZERO,
                trimp: Decimal::ZERO,
                method: StressMethod::DurationEstimate,
                intensity_factor: None,
            };
        }

        if let Some(result) = self.power_stress(workout, thresholds, duration_hours, trimp) {
            return result;
        }

        self.duration_stress(workout, duration_hours, trimp)
    }

    /// Power-based stress: hours × IF² × 100
    fn power_stress(
        &self,
        workout: &WorkoutRecord,
        thresholds: &AthleteThresholds,
        duration_hours: Decimal,
        trimp: Decimal,
    ) -> Option<StressResult> {
        let avg_power = workout.avg_power.filter(|p| *p > 0)?;
        let ftp = thresholds.functional_threshold_power.filter(|f| *f > 0)?;

        let intensity_factor = (Decimal::from(avg_power) / Decimal::from(ftp))
            .min(self.config.max_power_intensity_factor);
        let stress = duration_hours * intensity_factor * intensity_factor * dec!(100);

        Some(StressResult {
            stress,
            trimp,
            method: StressMethod::PowerBased,
            intensity_factor: Some(intensity_factor),
        })
    }

    /// Sport base rate scaled by a clamped heart rate multiplier
    fn duration_stress(
        &self,
        workout: &WorkoutRecord,
        duration_hours: Decimal,
        trimp: Decimal,
    ) -> StressResult {
        let base = self.base_tss_per_hour(workout.sport);

        let (multiplier, method) = match self.intensity_multiplier(workout.avg_heart_rate) {
            Some(multiplier) => (multiplier, StressMethod::HeartRateBased),
            None => (Decimal::ONE, StressMethod::DurationEstimate),
        };

        StressResult {
            stress: (duration_hours * base * multiplier).max(Decimal::ZERO),
            trimp,
            method,
            intensity_factor: Some(multiplier),
        }
    }

    /// Base stress per hour for a sport; running is weighted higher
    pub fn base_tss_per_hour(&self, sport: SportCategory) -> Decimal {
        match sport {
            SportCategory::Running => self.config.running_tss_per_hour,
            _ => self.config.default_tss_per_hour,
        }
    }

    /// Heart rate relative to the reference value, clamped to the configured band
    pub fn intensity_multiplier(&self, avg_heart_rate: Option<u16>) -> Option<Decimal> {
        let hr = avg_heart_rate.filter(|hr| *hr > 0)?;
        if self.config.reference_heart_rate == 0 {
            return None;
        }

        let raw = Decimal::from(hr) / Decimal::from(self.config.reference_heart_rate);
        Some(
            raw.max(self.config.min_intensity_multiplier)
                .min(self.config.max_intensity_multiplier),
        )
    }

    /// Banister TRIMP: minutes × HRr × k × e^(b × HRr)
    pub fn calculate_trimp(&self, workout: &WorkoutRecord, thresholds: &AthleteThresholds) -> Decimal {
        let (Some(avg_hr), Some(seconds)) = (workout.avg_heart_rate, workout.moving_time_seconds) else {
            return Decimal::ZERO;
        };

        let max_hr = f64::from(thresholds.max_heart_rate);
        let rest_hr = f64::from(thresholds.resting_heart_rate);
        if max_hr <= rest_hr || seconds == 0 {
            return Decimal::ZERO;
        }

        let reserve_fraction = ((f64::from(avg_hr) - rest_hr) / (max_hr - rest_hr)).clamp(0.0, 1.0);
        let minutes = f64::from(seconds) / 60.0;
        let trimp = minutes
            * reserve_fraction
            * self.config.trimp_weighting
            * (self.config.trimp_exponent * reserve_fraction).exp();

        Decimal::from_f64(trimp)
            .map(|value| value.round_dp(2))
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO)
    }
}

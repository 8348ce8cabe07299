use crate::models::DailyLoadPoint;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Thresholds that classify ramp rate and form into a training status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusThresholds {
    /// Ramp rate at or above which the athlete is peaking (default: 8)
    pub peak_ramp_rate: Decimal,

    /// Ramp rates within ±band count as a flat trend (default: 1)
    pub flat_ramp_band: Decimal,

    /// Form at or above which the athlete is recovering (default: 15)
    pub recover_form: Decimal,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        StatusThresholds {
            peak_ramp_rate: dec!(8),
            flat_ramp_band: dec!(1),
            recover_form: dec!(15),
        }
    }
}

/// PMC configuration with customizable time constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PmcConfig {
    /// Chronic load time constant in days (default: 42)
    pub chronic_time_constant: u16,

    /// Acute load time constant in days (default: 7)
    pub acute_time_constant: u16,

    /// Ramp rate comparison period in days (default: 7)
    pub ramp_rate_days: u16,

    /// Minimum days required for trend analysis
    pub min_trend_days: u16,

    /// Status classification thresholds
    pub status: StatusThresholds,
}

impl Default for PmcConfig {
    fn default() -> Self {
        PmcConfig {
            chronic_time_constant: 42,
            acute_time_constant: 7,
            ramp_rate_days: 7,
            min_trend_days: 14,
            status: StatusThresholds::default(),
        }
    }
}

/// Categorical training status derived from ramp rate and form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    Build,
    Peak,
    Maintain,
    Recover,
}

impl TrainingStatus {
    /// Classify a day's ramp rate and form
    pub fn classify(ramp_rate: Decimal, form: Decimal, thresholds: &StatusThresholds) -> Self {
        if ramp_rate >= thresholds.peak_ramp_rate {
            TrainingStatus::Peak
        } else if ramp_rate <= -thresholds.flat_ramp_band || form >= thresholds.recover_form {
            TrainingStatus::Recover
        } else if ramp_rate >= thresholds.flat_ramp_band && form < Decimal::ZERO {
            TrainingStatus::Build
        } else {
            TrainingStatus::Maintain
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            TrainingStatus::Build => {
                "Fitness is building. Keep the progression steady and protect one easy day per week"
            }
            TrainingStatus::Peak => {
                "Load is climbing fast. Hold the current volume and schedule a recovery week soon"
            }
            TrainingStatus::Maintain => {
                "Training load is stable. Add a key session if you want to keep improving"
            }
            TrainingStatus::Recover => {
                "Load is dropping and fatigue is clearing. Good window for racing or testing"
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStatus::Build => "build",
            TrainingStatus::Peak => "peak",
            TrainingStatus::Maintain => "maintain",
            TrainingStatus::Recover => "recover",
        }
    }
}

impl fmt::Display for TrainingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Performance Management Chart (PMC) metrics for a specific date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmcMetrics {
    /// Date these metrics are calculated for
    pub date: NaiveDate,

    /// Daily load value used in calculations
    pub daily_load: Decimal,

    /// Acute load (short time constant), a proxy for fatigue
    pub acute: Decimal,

    /// Chronic load (long time constant), a proxy for fitness
    pub chronic: Decimal,

    /// Form: chronic minus acute
    pub form: Decimal,

    /// Chronic load change over the ramp period
    pub ramp_rate: Decimal,

    /// Training status for this day
    pub status: TrainingStatus,
}

impl PmcMetrics {
    /// Metrics for a day with no training history at all
    pub fn empty(date: NaiveDate) -> Self {
        PmcMetrics {
            date,
            daily_load: Decimal::ZERO,
            acute: Decimal::ZERO,
            chronic: Decimal::ZERO,
            form: Decimal::ZERO,
            ramp_rate: Decimal::ZERO,
            status: TrainingStatus::Maintain,
        }
    }
}

/// Form interpretation ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormInterpretation {
    VeryFresh,    // +25 and above
    Fresh,        // +5 to +25
    Neutral,      // -10 to +5
    Fatigued,     // -30 to -10
    VeryFatigued, // Below -30
}

impl FormInterpretation {
    pub fn from_form(form: Decimal) -> Self {
        if form >= dec!(25) {
            FormInterpretation::VeryFresh
        } else if form >= dec!(5) {
            FormInterpretation::Fresh
        } else if form >= dec!(-10) {
            FormInterpretation::Neutral
        } else if form >= dec!(-30) {
            FormInterpretation::Fatigued
        } else {
            FormInterpretation::VeryFatigued
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FormInterpretation::VeryFresh => "Very fresh (may be losing fitness)",
            FormInterpretation::Fresh => "Fresh and ready for hard training or racing",
            FormInterpretation::Neutral => "Neutral (normal training)",
            FormInterpretation::Fatigued => "Fatigued (monitor closely)",
            FormInterpretation::VeryFatigued => "Very fatigued (rest needed)",
        }
    }
}

/// PMC trend analysis results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmcTrends {
    pub chronic_trend: TrendDirection,
    pub acute_trend: TrendDirection,
    pub form_trend: TrendDirection,

    /// Average ramp rate over the analysed period
    pub avg_ramp_rate: Decimal,

    /// Days spent in each status over the analysed period
    pub build_days: u16,
    pub peak_days: u16,
    pub maintain_days: u16,
    pub recover_days: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

/// Core PMC calculation engine
#[derive(Debug, Clone, Default)]
pub struct PmcCalculator {
    config: PmcConfig,
}

impl PmcCalculator {
    /// Create new PMC calculator with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create new PMC calculator with custom configuration
    pub fn with_config(config: PmcConfig) -> Self {
        PmcCalculator { config }
    }

    pub fn config(&self) -> &PmcConfig {
        &self.config
    }

    /// Calculate PMC metrics for every day of a gap-free daily series.
    ///
    /// Both averages start at the first day's load and are then updated with
    /// `x_today = x_yesterday + (load_today - x_yesterday) / time_constant`.
    /// Each output point only depends on the points up to and including it.
    pub fn calculate_series(&self, daily: &[DailyLoadPoint]) -> Vec<PmcMetrics> {
        let Some(first) = daily.first() else {
            return Vec::new();
        };

        let chronic_factor = Self::smoothing_factor(self.config.chronic_time_constant);
        let acute_factor = Self::smoothing_factor(self.config.acute_time_constant);
        let ramp_days = usize::from(self.config.ramp_rate_days.max(1));

        let mut chronic = first.load;
        let mut acute = first.load;
        let mut chronic_history: Vec<Decimal> = Vec::with_capacity(daily.len());
        let mut series = Vec::with_capacity(daily.len());

        for (index, point) in daily.iter().enumerate() {
            if index > 0 {
                chronic += (point.load - chronic) * chronic_factor;
                acute += (point.load - acute) * acute_factor;
            }
            chronic_history.push(chronic);

            let ramp_rate = chronic - chronic_history[index.saturating_sub(ramp_days)];
            let form = chronic - acute;

            series.push(PmcMetrics {
                date: point.date,
                daily_load: point.load,
                acute,
                chronic,
                form,
                ramp_rate,
                status: TrainingStatus::classify(ramp_rate, form, &self.config.status),
            });
        }

        series
    }

    /// Metrics for the most recent day in the series
    pub fn latest(&self, daily: &[DailyLoadPoint]) -> Option<PmcMetrics> {
        self.calculate_series(daily).pop()
    }

    fn smoothing_factor(time_constant: u16) -> Decimal {
        Decimal::ONE / Decimal::from(time_constant.max(1))
    }

    /// Analyze PMC trends over a period
    pub fn analyze_trends(&self, series: &[PmcMetrics]) -> Option<PmcTrends> {
        if series.len() < usize::from(self.config.min_trend_days.max(1)) {
            return None;
        }

        let first = series.first()?;
        let last = series.last()?;

        let avg_ramp_rate =
            series.iter().map(|m| m.ramp_rate).sum::<Decimal>() / Decimal::from(series.len());

        let count = |status: TrainingStatus| -> u16 {
            series.iter().filter(|m| m.status == status).count().min(u16::MAX as usize) as u16
        };

        Some(PmcTrends {
            chronic_trend: Self::determine_trend(first.chronic, last.chronic),
            acute_trend: Self::determine_trend(first.acute, last.acute),
            form_trend: Self::determine_trend(first.form, last.form),
            avg_ramp_rate,
            build_days: count(TrainingStatus::Build),
            peak_days: count(TrainingStatus::Peak),
            maintain_days: count(TrainingStatus::Maintain),
            recover_days: count(TrainingStatus::Recover),
        })
    }

    /// Determine trend direction between two values
    fn determine_trend(start: Decimal, end: Decimal) -> TrendDirection {
        let change_threshold = dec!(0.05); // 5% threshold
        let percent_change = (end - start) / start.abs().max(Decimal::ONE);

        if percent_change > change_threshold {
            TrendDirection::Increasing
        } else if percent_change < -change_threshold {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }

    /// Generate training recommendations based on PMC metrics
    pub fn generate_recommendations(&self, metrics: &PmcMetrics) -> Vec<String> {
        let mut recommendations = vec![metrics.status.recommendation().to_string()];

        let interpretation = FormInterpretation::from_form(metrics.form);
        recommendations.push(format!("Form: {}", interpretation.description()));

        if metrics.ramp_rate > self.config.status.peak_ramp_rate {
            recommendations.push("Ramp rate is aggressive - monitor for overreaching".to_string());
        } else if metrics.ramp_rate < -self.config.status.peak_ramp_rate {
            recommendations
                .push("Chronic load is declining rapidly - consider increasing training".to_string());
        }

        if interpretation == FormInterpretation::VeryFatigued {
            recommendations.push("Prioritize sleep, nutrition, and active recovery".to_string());
        }

        recommendations
    }
}

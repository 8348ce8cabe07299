//! Same-day training readiness
//!
//! Combines the athlete's weekly stress balance, days of rest, the last
//! perceived exertion and any outstanding device recovery time into a 0-100
//! score, a readiness level and a canned recommendation.
//!
//! Two balances are in play and kept apart:
//! - **TSS balance**: weekly stress target minus stress accumulated over the
//!   last seven local days. Drives the score.
//! - **Form**: chronic minus acute load from the PMC. Reported alongside.

use crate::aggregation::DateWindow;
use crate::models::{AthleteThresholds, WorkoutRecord};
use crate::tss::StressEstimator;
use chrono::{DateTime, FixedOffset};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Scoring constants and level bands for readiness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub baseline_score: Decimal,
    pub rest_bonus_per_day: Decimal,
    pub max_rest_bonus: Decimal,
    /// RPE at which exertion neither helps nor hurts
    pub rpe_neutral: Decimal,
    pub rpe_penalty_per_point: Decimal,
    /// Balance below the negative of this is heavy overload
    pub heavy_balance: Decimal,
    pub heavy_balance_penalty: Decimal,
    /// Balance above this is a strong surplus
    pub strong_balance: Decimal,
    pub strong_balance_bonus: Decimal,
    /// Penalty when none of the required recovery time has passed
    pub recovery_penalty: Decimal,
    pub recovery_met_bonus: Decimal,
    pub ready_threshold: Decimal,
    pub moderate_threshold: Decimal,
    pub long_break_days: u32,
    pub accumulated_rest_days: u32,
    pub default_weekly_target: Decimal,
    /// Days of history fed into the PMC when computing form
    pub lookback_days: u32,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        ReadinessConfig {
            baseline_score: dec!(50),
            rest_bonus_per_day: dec!(10),
            max_rest_bonus: dec!(25),
            rpe_neutral: dec!(5),
            rpe_penalty_per_point: dec!(5),
            heavy_balance: dec!(150),
            heavy_balance_penalty: dec!(20),
            strong_balance: dec!(150),
            strong_balance_bonus: dec!(10),
            recovery_penalty: dec!(20),
            recovery_met_bonus: dec!(5),
            ready_threshold: dec!(70),
            moderate_threshold: dec!(40),
            long_break_days: 7,
            accumulated_rest_days: 2,
            default_weekly_target: dec!(300),
            lookback_days: 90,
        }
    }
}

/// Readiness tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessLevel {
    High,
    Moderate,
    Low,
}

impl fmt::Display for ReadinessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessLevel::High => write!(f, "High"),
            ReadinessLevel::Moderate => write!(f, "Moderate"),
            ReadinessLevel::Low => write!(f, "Low"),
        }
    }
}

/// Recovery time recommended after the last workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryRequirement {
    pub required_hours: Decimal,
    pub elapsed_hours: Decimal,
}

impl RecoveryRequirement {
    pub fn is_met(&self) -> bool {
        self.elapsed_hours >= self.required_hours
    }

    /// Share of the required time still outstanding, in [0, 1]
    pub fn remaining_fraction(&self) -> Decimal {
        if self.required_hours <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        ((self.required_hours - self.elapsed_hours) / self.required_hours).clamp(Decimal::ZERO, Decimal::ONE)
    }
}

/// Everything the evaluator needs for one assessment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadinessInput {
    /// PMC form on the assessment day
    pub form: Option<Decimal>,
    /// RPE of the most recent workout
    pub last_rpe: Option<u8>,
    /// Weekly stress target; the configured default when absent or not positive
    pub weekly_target: Option<Decimal>,
    /// Stress accumulated over the last seven local days
    pub weekly_stress: Decimal,
    /// Whole local days since the most recent workout, None without history
    pub days_since_workout: Option<u32>,
    pub recovery: Option<RecoveryRequirement>,
}

impl ReadinessInput {
    /// Derive readiness inputs from the athlete's full workout history.
    ///
    /// Workouts starting after `now` are ignored. Day counts use local dates
    /// in `timezone`, so a late-evening workout followed by an early-morning
    /// check counts as one day of rest.
    pub fn from_history(
        workouts: &[WorkoutRecord],
        now: DateTime<FixedOffset>,
        timezone: &FixedOffset,
        weekly_target: Option<Decimal>,
        form: Option<Decimal>,
        estimator: &StressEstimator,
        thresholds: &AthleteThresholds,
    ) -> Self {
        let today = now.with_timezone(timezone).date_naive();
        let week = DateWindow::ending_on(today, 7);

        let past: Vec<&WorkoutRecord> = workouts.iter().filter(|w| w.start <= now).collect();
        let last = past.iter().copied().max_by_key(|w| w.start);

        let weekly_stress = past
            .iter()
            .filter(|w| week.contains(w.local_date(timezone)))
            .map(|w| estimator.estimate(w, thresholds).stress)
            .sum();

        let days_since_workout = last.map(|w| {
            let days = (today - w.local_date(timezone)).num_days();
            u32::try_from(days.max(0)).unwrap_or(u32::MAX)
        });

        let recovery = last.and_then(|w| {
            w.recovery_hours.map(|hours| {
                let elapsed_minutes = (now - w.end_time()).num_minutes().max(0);
                RecoveryRequirement {
                    required_hours: Decimal::from(hours),
                    elapsed_hours: Decimal::from(elapsed_minutes) / dec!(60),
                }
            })
        });

        ReadinessInput {
            form,
            last_rpe: last.and_then(|w| w.rpe()),
            weekly_target,
            weekly_stress,
            days_since_workout,
            recovery,
        }
    }
}

/// Contribution of each factor to the raw score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessFactors {
    pub baseline: Decimal,
    pub rest_bonus: Decimal,
    pub rpe_adjustment: Decimal,
    pub balance_adjustment: Decimal,
    pub recovery_adjustment: Decimal,
    /// Sum before clamping
    pub raw_score: Decimal,
}

/// Outcome of a readiness assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessResult {
    /// Score in [0, 100]
    pub score: u8,
    pub level: ReadinessLevel,
    pub recommendation: String,
    pub last_rpe: Option<u8>,
    /// Weekly target minus weekly stress
    pub tss_balance: Decimal,
    pub form: Option<Decimal>,
    pub days_since_workout: Option<u32>,
    pub weekly_target: Decimal,
    pub weekly_stress: Decimal,
    pub factors: ReadinessFactors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RestContext {
    NoHistory,
    LongBreak(u32),
    AccumulatedRest(u32),
    Normal,
}

#[derive(Debug, Clone, Default)]
pub struct ReadinessEvaluator {
    config: ReadinessConfig,
}

impl ReadinessEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReadinessConfig) -> Self {
        ReadinessEvaluator { config }
    }

    pub fn config(&self) -> &ReadinessConfig {
        &self.config
    }

    /// Score readiness; always returns a populated result
    pub fn evaluate(&self, input: &ReadinessInput) -> ReadinessResult {
        let cfg = &self.config;

        let weekly_target = input
            .weekly_target
            .filter(|target| *target > Decimal::ZERO)
            .unwrap_or(cfg.default_weekly_target);
        let tss_balance = weekly_target - input.weekly_stress;

        let rest_bonus = input
            .days_since_workout
            .map(|days| (Decimal::from(days) * cfg.rest_bonus_per_day).min(cfg.max_rest_bonus))
            .unwrap_or(Decimal::ZERO);

        let rpe_adjustment = input
            .last_rpe
            .map(|rpe| -(Decimal::from(rpe.clamp(1, 10)) - cfg.rpe_neutral) * cfg.rpe_penalty_per_point)
            .unwrap_or(Decimal::ZERO);

        let balance_adjustment = if tss_balance < -cfg.heavy_balance {
            -cfg.heavy_balance_penalty
        } else if tss_balance > cfg.strong_balance {
            cfg.strong_balance_bonus
        } else {
            Decimal::ZERO
        };

        let recovery_adjustment = match &input.recovery {
            Some(recovery) if recovery.is_met() => cfg.recovery_met_bonus,
            Some(recovery) => -cfg.recovery_penalty * recovery.remaining_fraction(),
            None => Decimal::ZERO,
        };

        let raw_score =
            cfg.baseline_score + rest_bonus + rpe_adjustment + balance_adjustment + recovery_adjustment;
        let clamped = raw_score.clamp(Decimal::ZERO, dec!(100)).round();
        let score = clamped.to_u8().unwrap_or(0);

        let level = self.level_for(clamped);
        let recommendation = self.recommendation(level, self.rest_context(input.days_since_workout));

        debug!(
            score,
            level = %level,
            balance = %tss_balance,
            days_since = ?input.days_since_workout,
            "Evaluated readiness"
        );

        ReadinessResult {
            score,
            level,
            recommendation,
            last_rpe: input.last_rpe,
            tss_balance,
            form: input.form,
            days_since_workout: input.days_since_workout,
            weekly_target,
            weekly_stress: input.weekly_stress,
            factors: ReadinessFactors {
                baseline: cfg.baseline_score,
                rest_bonus,
                rpe_adjustment,
                balance_adjustment,
                recovery_adjustment,
                raw_score,
            },
        }
    }

    fn level_for(&self, score: Decimal) -> ReadinessLevel {
        if score >= self.config.ready_threshold {
            ReadinessLevel::High
        } else if score >= self.config.moderate_threshold {
            ReadinessLevel::Moderate
        } else {
            ReadinessLevel::Low
        }
    }

    fn rest_context(&self, days_since_workout: Option<u32>) -> RestContext {
        match days_since_workout {
            None => RestContext::NoHistory,
            Some(days) if days >= self.config.long_break_days => RestContext::LongBreak(days),
            Some(days) if days >= self.config.accumulated_rest_days => RestContext::AccumulatedRest(days),
            Some(_) => RestContext::Normal,
        }
    }

    fn recommendation(&self, level: ReadinessLevel, context: RestContext) -> String {
        match (level, context) {
            (_, RestContext::NoHistory) => {
                "No recent workouts on record. Start with an easy session to establish a baseline".to_string()
            }
            (ReadinessLevel::Low, RestContext::LongBreak(_) | RestContext::AccumulatedRest(_)) => {
                "Still carrying fatigue despite recent rest. Keep today easy or take another rest day".to_string()
            }
            (_, RestContext::LongBreak(days)) => format!(
                "Back after {} days off. Ease in with a moderate session before returning to hard efforts",
                days
            ),
            (ReadinessLevel::High, RestContext::AccumulatedRest(days)) => format!(
                "Fresh after {} days of rest. A good day for a key workout",
                days
            ),
            (ReadinessLevel::High, _) => "Ready to train. Go ahead with planned intensity".to_string(),
            (ReadinessLevel::Moderate, RestContext::AccumulatedRest(_)) => {
                "Partly recovered. Steady aerobic work is a good fit today".to_string()
            }
            (ReadinessLevel::Moderate, _) => {
                "Moderately recovered. Favour endurance work over intensity today".to_string()
            }
            (ReadinessLevel::Low, _) => {
                "Fatigue is high. Prioritise recovery with rest or very light activity".to_string()
            }
        }
    }
}

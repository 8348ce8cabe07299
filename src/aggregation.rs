//! Daily load aggregation
//!
//! Buckets workouts by the athlete's local calendar day and produces a
//! contiguous, ascending series with exactly one point per date. Rest days are
//! emitted as zero-load points so the moving averages decay through them.

use crate::models::{AthleteThresholds, DailyLoadPoint, WorkoutRecord};
use crate::tss::StressEstimator;
use chrono::{Days, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Closed range of local calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateWindow { start, end }
    }

    /// Window of `days` calendar days ending on `end` (inclusive)
    pub fn ending_on(end: NaiveDate, days: u32) -> Self {
        let span = u64::from(days.max(1) - 1);
        let start = end.checked_sub_days(Days::new(span)).unwrap_or(end);
        DateWindow { start, end }
    }

    /// Same window with the bounds in ascending order
    pub fn normalized(&self) -> Self {
        if self.start <= self.end {
            *self
        } else {
            DateWindow {
                start: self.end,
                end: self.start,
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days in the window, zero when inverted
    pub fn len_days(&self) -> usize {
        if !self.is_valid() {
            return 0;
        }
        (self.end - self.start).num_days() as usize + 1
    }

    /// Every date in the window, ascending
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let window = *self;
        window
            .start
            .iter_days()
            .take_while(move |date| *date <= window.end)
            .take(window.len_days())
    }
}

/// Sums per-workout stress into one load value per local day
#[derive(Debug, Clone, Default)]
pub struct DailyLoadAggregator {
    estimator: StressEstimator,
}

impl DailyLoadAggregator {
    pub fn new(estimator: StressEstimator) -> Self {
        DailyLoadAggregator { estimator }
    }

    /// Aggregate workouts into a gap-free daily series for `window`.
    ///
    /// Workouts are assigned to the calendar date of their start instant in
    /// `timezone`. Workouts outside the window are dropped before summing.
    pub fn aggregate(
        &self,
        workouts: &[WorkoutRecord],
        window: &DateWindow,
        timezone: &FixedOffset,
        thresholds: &AthleteThresholds,
    ) -> Vec<DailyLoadPoint> {
        self.aggregate_with(workouts, window, timezone, |_| thresholds)
    }

    /// Like [`aggregate`](Self::aggregate), with the thresholds for each
    /// workout looked up by its index in `workouts`
    pub fn aggregate_with<'t>(
        &self,
        workouts: &[WorkoutRecord],
        window: &DateWindow,
        timezone: &FixedOffset,
        thresholds_for: impl Fn(usize) -> &'t AthleteThresholds,
    ) -> Vec<DailyLoadPoint> {
        if !window.is_valid() {
            warn!(
                start = %window.start,
                end = %window.end,
                "Inverted date window, producing empty load series"
            );
            return Vec::new();
        }

        let mut days: BTreeMap<NaiveDate, DailyLoadPoint> =
            window.dates().map(|date| (date, DailyLoadPoint::rest(date))).collect();

        let mut excluded = 0usize;
        for (index, workout) in workouts.iter().enumerate() {
            let date = workout.local_date(timezone);
            let Some(day) = days.get_mut(&date) else {
                excluded += 1;
                continue;
            };

            let result = self.estimator.estimate(workout, thresholds_for(index));
            day.load += result.stress;
            day.trimp += result.trimp;
            day.workout_count = day.workout_count.saturating_add(1);
        }

        debug!(
            days = days.len(),
            included = workouts.len() - excluded,
            excluded,
            "Aggregated daily load"
        );

        days.into_values().collect()
    }
}

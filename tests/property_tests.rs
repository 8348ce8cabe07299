use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone};
use proptest::prelude::*;
use rust_decimal::Decimal;
use trainload::engine::{LoadRequest, ReadinessRequest};
use trainload::models::{DailyLoadPoint, SportCategory, ThresholdOverrides, WorkoutRecord};
use trainload::pmc::PmcCalculator;
use trainload::readiness::{ReadinessEvaluator, ReadinessInput, RecoveryRequirement};
use trainload::zones::{ZoneRequest, ZoneScheme};
use trainload::{DateWindow, TrainingLoadEngine};

/// Property-based tests over whole engine requests

fn timezone() -> FixedOffset {
    FixedOffset::west_opt(5 * 3600).unwrap()
}

fn origin() -> DateTime<FixedOffset> {
    timezone().with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap()
}

fn origin_date() -> NaiveDate {
    origin().date_naive()
}

prop_compose! {
    fn arb_workout()(
        day in 0i64..120,
        hour in 0i64..24,
        sport_index in 0usize..4,
        minutes in 0u32..240,
        avg_hr in proptest::option::of(90u16..190),
        max_hr in proptest::option::of(120u16..215),
        power in proptest::option::of(80u16..400),
        explicit in proptest::option::of(-50i64..400),
        rpe in proptest::option::of(0u8..12),
    ) -> WorkoutRecord {
        let sport = [
            SportCategory::Running,
            SportCategory::Cycling,
            SportCategory::Swimming,
            SportCategory::Strength,
        ][sport_index];
        let start = origin() + Duration::days(day) + Duration::hours(hour);
        let mut workout = WorkoutRecord::new(format!("w{}-{}", day, hour), start, sport);
        workout.moving_time_seconds = Some(minutes * 60);
        workout.avg_heart_rate = avg_hr;
        workout.max_heart_rate = max_hr;
        workout.avg_power = power;
        workout.stress_score = explicit.map(Decimal::from);
        workout.perceived_exertion = rpe;
        workout
    }
}

fn load_request(start_offset: i64, days: i64) -> LoadRequest {
    let start = origin_date() + Duration::days(start_offset);
    LoadRequest {
        window: DateWindow::new(start, start + Duration::days(days - 1)),
        timezone: timezone(),
        overrides: ThresholdOverrides::default(),
    }
}

proptest! {
    #[test]
    fn prop_series_covers_every_day(
        workouts in proptest::collection::vec(arb_workout(), 0..40),
        start_offset in 0i64..100,
        days in 1i64..90,
    ) {
        let engine = TrainingLoadEngine::default();
        let report = engine.training_load(&workouts, &load_request(start_offset, days));

        prop_assert_eq!(report.daily.len() as i64, days);
        prop_assert_eq!(report.series.len() as i64, days);
        for pair in report.daily.windows(2) {
            prop_assert_eq!(pair[0].date + Duration::days(1), pair[1].date);
        }
        for point in &report.daily {
            prop_assert!(point.load >= Decimal::ZERO);
        }
    }

    #[test]
    fn prop_future_workouts_never_change_past_metrics(
        workouts in proptest::collection::vec(arb_workout(), 1..30),
        extra in proptest::collection::vec(arb_workout(), 1..10),
        cut in 1i64..60,
    ) {
        let engine = TrainingLoadEngine::default();
        let request = load_request(0, 120);
        let cutoff = origin_date() + Duration::days(cut);

        let base = workouts;
        let mut extended = base.clone();
        extended.extend(extra.into_iter().filter(|w| w.local_date(&timezone()) > cutoff));

        let before = engine.training_load(&base, &request);
        let after = engine.training_load(&extended, &request);

        for (a, b) in before.series.iter().zip(after.series.iter()) {
            if a.date <= cutoff {
                prop_assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn prop_ramp_sign_follows_chronic_change(
        workouts in proptest::collection::vec(arb_workout(), 0..40),
    ) {
        let engine = TrainingLoadEngine::default();
        let report = engine.training_load(&workouts, &load_request(0, 60));

        for (index, metrics) in report.series.iter().enumerate().skip(7) {
            let reference = &report.series[index - 7];
            let delta = metrics.chronic - reference.chronic;
            prop_assert_eq!(metrics.ramp_rate, delta);
        }
    }

    #[test]
    fn prop_monotonic_loads_give_matching_ramp_sign(
        steps in proptest::collection::vec(1i64..40, 2..60),
        increasing in any::<bool>(),
    ) {
        let mut level = if increasing { 0 } else { steps.iter().sum::<i64>() + 1 };
        let daily: Vec<DailyLoadPoint> = steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                level += if increasing { *step } else { -*step };
                DailyLoadPoint {
                    date: origin_date() + Duration::days(index as i64),
                    load: Decimal::from(level),
                    trimp: Decimal::ZERO,
                    workout_count: 1,
                }
            })
            .collect();

        let series = PmcCalculator::new().calculate_series(&daily);
        for metrics in series.iter().skip(1) {
            if increasing {
                prop_assert!(metrics.ramp_rate > Decimal::ZERO);
            } else {
                prop_assert!(metrics.ramp_rate < Decimal::ZERO);
            }
        }
    }

    #[test]
    fn prop_zone_models_partition_estimated_range(
        workouts in proptest::collection::vec(arb_workout(), 0..40),
        scheme_index in 0usize..3,
        override_max in proptest::option::of(60u16..260),
    ) {
        let engine = TrainingLoadEngine::default();
        let mut request = ZoneRequest::new(origin() + Duration::days(130));
        request.scheme = Some(ZoneScheme::ALL[scheme_index]);
        request.overrides.max_heart_rate = override_max;

        let result = engine.analyze_zones(&workouts, &request);
        let model = &result.default_model;

        prop_assert!(model.max_heart_rate >= 100 && model.max_heart_rate <= 230);
        prop_assert_eq!(model.zones.first().map(|z| z.lower_bpm), Some(0));
        prop_assert_eq!(model.zones.last().map(|z| z.upper_bpm), Some(model.max_heart_rate));
        for pair in model.zones.windows(2) {
            prop_assert_eq!(pair[0].upper_bpm, pair[1].lower_bpm);
        }
        prop_assert!(result.thresholds.resting_heart_rate < result.thresholds.max_heart_rate);
    }

    #[test]
    fn prop_readiness_score_is_bounded(
        form in proptest::option::of(-200i64..200),
        last_rpe in proptest::option::of(0u8..15),
        weekly_target in proptest::option::of(-100i64..1500),
        weekly_stress in 0i64..3000,
        days_since_workout in proptest::option::of(0u32..400),
        recovery in proptest::option::of((0u32..120, 0i64..200)),
    ) {
        let input = ReadinessInput {
            form: form.map(Decimal::from),
            last_rpe,
            weekly_target: weekly_target.map(Decimal::from),
            weekly_stress: Decimal::from(weekly_stress),
            days_since_workout,
            recovery: recovery.map(|(required, elapsed)| RecoveryRequirement {
                required_hours: Decimal::from(required),
                elapsed_hours: Decimal::from(elapsed),
            }),
        };

        let result = ReadinessEvaluator::new().evaluate(&input);
        let raw = result.factors.raw_score;
        prop_assert_eq!(Decimal::from(result.score), raw.max(Decimal::ZERO).min(Decimal::ONE_HUNDRED).round());
        prop_assert_eq!(result.score == 0, raw.round() <= Decimal::ZERO);
        prop_assert!(!result.recommendation.is_empty());
        prop_assert_eq!(result.tss_balance, result.weekly_target - result.weekly_stress);
    }

    #[test]
    fn prop_engine_readiness_ignores_future_workouts(
        workouts in proptest::collection::vec(arb_workout(), 0..30),
        now_day in 10i64..110,
    ) {
        let engine = TrainingLoadEngine::default();
        let now = origin() + Duration::days(now_day);
        let request = ReadinessRequest {
            now,
            timezone: timezone(),
            weekly_target: None,
            overrides: ThresholdOverrides::default(),
        };

        let past: Vec<WorkoutRecord> = workouts.iter().filter(|w| w.start <= now).cloned().collect();
        let with_future = engine.readiness(&workouts, &request);
        let past_only = engine.readiness(&past, &request);

        prop_assert_eq!(with_future.days_since_workout, past_only.days_since_workout);
        prop_assert_eq!(with_future.weekly_stress, past_only.weekly_stress);
        prop_assert_eq!(with_future.last_rpe, past_only.last_rpe);
    }
}

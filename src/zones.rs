//! Heart rate zone analysis
//!
//! Estimates the athlete's functional maximum heart rate from workout history,
//! grades how much that estimate can be trusted, and lays out zone models as
//! percentage-of-max schemes. Zones always partition `[0, max]`: zone 1 starts
//! at 0 bpm, the last zone ends at the maximum, and neighbouring zones share
//! their boundary (lower bound inclusive, upper bound exclusive).

use crate::models::{AthleteThresholds, SportCategory, ThresholdOverrides, WorkoutRecord};
use chrono::{DateTime, Duration, FixedOffset};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Data quality bands, as percentage of activities carrying heart rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityBands {
    pub fair_percent: Decimal,
    pub good_percent: Decimal,
    pub excellent_percent: Decimal,
}

impl Default for QualityBands {
    fn default() -> Self {
        QualityBands {
            fair_percent: dec!(25),
            good_percent: dec!(50),
            excellent_percent: dec!(75),
        }
    }
}

/// Confidence bands, as count of recent high-intensity samples
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceBands {
    pub medium_samples: usize,
    pub high_samples: usize,
}

impl Default for ConfidenceBands {
    fn default() -> Self {
        ConfidenceBands {
            medium_samples: 5,
            high_samples: 15,
        }
    }
}

/// Zone analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Max heart rate samples below this are ignored
    pub min_plausible_hr: u16,

    /// Max heart rate samples above this are ignored
    pub max_plausible_hr: u16,

    /// Samples within this many bpm below a candidate corroborate it
    pub corroboration_tolerance_bpm: u16,

    /// Samples (candidate included) needed to accept a candidate maximum
    pub min_corroborating_samples: usize,

    /// Fraction of max a sample must reach to count as high intensity
    pub high_intensity_fraction: Decimal,

    /// Only samples this recent count towards confidence
    pub recency_window_days: u32,

    /// Minimum activities with heart rate for a per-sport breakdown
    pub min_sport_activities: usize,

    /// Maximum heart rate used when there is no usable history
    pub default_max_hr: u16,

    /// Resting heart rate used unless overridden
    pub default_resting_hr: u16,

    /// Minimum duration of an effort used for threshold estimation
    pub sustained_effort_seconds: u32,

    /// FTP as a fraction of best sustained average power
    pub ftp_factor: Decimal,

    pub quality_bands: QualityBands,

    pub confidence_bands: ConfidenceBands,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        ZoneConfig {
            min_plausible_hr: 100,
            max_plausible_hr: 230,
            corroboration_tolerance_bpm: 5,
            min_corroborating_samples: 2,
            high_intensity_fraction: dec!(0.85),
            recency_window_days: 180,
            min_sport_activities: 3,
            default_max_hr: 190,
            default_resting_hr: 60,
            sustained_effort_seconds: 1200,
            ftp_factor: dec!(0.95),
            quality_bands: QualityBands::default(),
            confidence_bands: ConfidenceBands::default(),
        }
    }
}

/// Zone layout scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneScheme {
    #[default]
    FiveZone,
    ThreeZone,
    PowerBased,
}

/// Static description of one zone within a scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneDefinition {
    pub name: &'static str,
    pub min_percent: u8,
    pub max_percent: u8,
    pub color: &'static str,
}

const FIVE_ZONE: [ZoneDefinition; 5] = [
    ZoneDefinition { name: "Recovery", min_percent: 0, max_percent: 60, color: "#9E9E9E" },
    ZoneDefinition { name: "Endurance", min_percent: 60, max_percent: 70, color: "#2196F3" },
    ZoneDefinition { name: "Tempo", min_percent: 70, max_percent: 80, color: "#4CAF50" },
    ZoneDefinition { name: "Threshold", min_percent: 80, max_percent: 90, color: "#FF9800" },
    ZoneDefinition { name: "VO2 Max", min_percent: 90, max_percent: 100, color: "#F44336" },
];

const THREE_ZONE: [ZoneDefinition; 3] = [
    ZoneDefinition { name: "Easy", min_percent: 0, max_percent: 80, color: "#4CAF50" },
    ZoneDefinition { name: "Moderate", min_percent: 80, max_percent: 90, color: "#FF9800" },
    ZoneDefinition { name: "Hard", min_percent: 90, max_percent: 100, color: "#F44336" },
];

// Coggan training levels laid over the heart rate range
const POWER_BASED: [ZoneDefinition; 7] = [
    ZoneDefinition { name: "Active Recovery", min_percent: 0, max_percent: 55, color: "#9E9E9E" },
    ZoneDefinition { name: "Endurance", min_percent: 55, max_percent: 68, color: "#2196F3" },
    ZoneDefinition { name: "Tempo", min_percent: 68, max_percent: 78, color: "#4CAF50" },
    ZoneDefinition { name: "Lactate Threshold", min_percent: 78, max_percent: 86, color: "#FFEB3B" },
    ZoneDefinition { name: "VO2 Max", min_percent: 86, max_percent: 92, color: "#FF9800" },
    ZoneDefinition { name: "Anaerobic Capacity", min_percent: 92, max_percent: 96, color: "#F44336" },
    ZoneDefinition { name: "Neuromuscular", min_percent: 96, max_percent: 100, color: "#9C27B0" },
];

impl ZoneScheme {
    pub const ALL: [ZoneScheme; 3] = [ZoneScheme::FiveZone, ZoneScheme::ThreeZone, ZoneScheme::PowerBased];

    pub fn definitions(&self) -> &'static [ZoneDefinition] {
        match self {
            ZoneScheme::FiveZone => &FIVE_ZONE,
            ZoneScheme::ThreeZone => &THREE_ZONE,
            ZoneScheme::PowerBased => &POWER_BASED,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneScheme::FiveZone => "five_zone",
            ZoneScheme::ThreeZone => "three_zone",
            ZoneScheme::PowerBased => "power_based",
        }
    }
}

impl fmt::Display for ZoneScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ZoneScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "five_zone" | "five" | "5" => Ok(ZoneScheme::FiveZone),
            "three_zone" | "three" | "3" => Ok(ZoneScheme::ThreeZone),
            "power_based" | "power" => Ok(ZoneScheme::PowerBased),
            _ => Err(format!("Invalid zone scheme: {}", s)),
        }
    }
}

/// One heart rate zone with concrete bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateZone {
    pub number: u8,
    pub name: String,
    /// Inclusive lower bound in bpm
    pub lower_bpm: u16,
    /// Exclusive upper bound in bpm (inclusive for the last zone)
    pub upper_bpm: u16,
    pub min_percent: u8,
    pub max_percent: u8,
    pub color: String,
}

/// A complete zone layout for one maximum heart rate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneModel {
    pub scheme: ZoneScheme,
    pub max_heart_rate: u16,
    pub zones: Vec<HeartRateZone>,
}

impl ZoneModel {
    /// Lay out `scheme` over `[0, max_heart_rate]`
    pub fn from_max(scheme: ZoneScheme, max_heart_rate: u16) -> Self {
        let zones = scheme
            .definitions()
            .iter()
            .enumerate()
            .map(|(index, definition)| HeartRateZone {
                number: index as u8 + 1,
                name: definition.name.to_string(),
                lower_bpm: percent_of(max_heart_rate, definition.min_percent),
                upper_bpm: percent_of(max_heart_rate, definition.max_percent),
                min_percent: definition.min_percent,
                max_percent: definition.max_percent,
                color: definition.color.to_string(),
            })
            .collect();

        ZoneModel {
            scheme,
            max_heart_rate,
            zones,
        }
    }

    /// Zone a heart rate falls into; values at or above max land in the last zone
    pub fn zone_for(&self, heart_rate: u16) -> Option<&HeartRateZone> {
        self.zones
            .iter()
            .find(|zone| heart_rate >= zone.lower_bpm && heart_rate < zone.upper_bpm)
            .or_else(|| self.zones.last().filter(|zone| heart_rate >= zone.lower_bpm))
    }
}

/// Rounded percentage of a bpm value
fn percent_of(value: u16, percent: u8) -> u16 {
    ((u32::from(value) * u32::from(percent) + 50) / 100) as u16
}

/// Data quality grade from heart rate coverage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    None,
    Poor,
    Fair,
    Good,
    Excellent,
}

/// Confidence grade of the maximum heart rate estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    None,
    Low,
    Medium,
    High,
}

/// Where the maximum heart rate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxHrSource {
    Estimated,
    Override,
    Default,
}

/// Zone breakdown for a single sport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportZoneBreakdown {
    pub sport: SportCategory,
    pub activity_count: usize,
    pub heart_rate_activity_count: usize,
    pub max_heart_rate: u16,
    pub data_quality: DataQuality,
    pub confidence: Confidence,
    pub zones: ZoneModel,
}

/// Result of a zone analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub thresholds: AthleteThresholds,
    pub max_hr_source: MaxHrSource,
    pub default_model: ZoneModel,
    pub data_quality: DataQuality,
    pub confidence: Confidence,
    pub total_activities: usize,
    pub heart_rate_coverage_percent: Decimal,
    pub qualifying_samples: usize,
    pub sport_breakdowns: Vec<SportZoneBreakdown>,
    pub alternatives: Vec<ZoneModel>,
    pub recommendations: Vec<String>,
}

/// Parameters for one zone analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRequest {
    /// Reference instant for sample recency
    pub as_of: DateTime<FixedOffset>,

    #[serde(default)]
    pub overrides: ThresholdOverrides,

    /// Scheme for the default model (five-zone when absent)
    #[serde(default)]
    pub scheme: Option<ZoneScheme>,

    #[serde(default = "default_include_alternatives")]
    pub include_alternatives: bool,
}

fn default_include_alternatives() -> bool {
    true
}

impl ZoneRequest {
    pub fn new(as_of: DateTime<FixedOffset>) -> Self {
        ZoneRequest {
            as_of,
            overrides: ThresholdOverrides::default(),
            scheme: None,
            include_alternatives: true,
        }
    }
}

/// Heart rate evidence gathered from a set of workouts
struct HeartRateEvidence {
    total: usize,
    with_heart_rate: usize,
    samples: Vec<u16>,
}

/// History that feeds threshold estimates, accumulated workout by workout
#[derive(Debug, Default)]
struct ThresholdEvidence {
    max_hr_samples: Vec<u16>,
    peak_sustained_hr: Option<u16>,
    peak_sustained_power: Option<u16>,
}

/// Builds personalised zone models from workout history
#[derive(Debug, Clone, Default)]
pub struct ZoneAnalyzer {
    config: ZoneConfig,
}

impl ZoneAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ZoneConfig) -> Self {
        ZoneAnalyzer { config }
    }

    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    /// Run a full zone analysis over the athlete's history
    pub fn analyze(&self, workouts: &[WorkoutRecord], request: &ZoneRequest) -> AnalysisResult {
        let (thresholds, max_hr_source) = self.estimate_thresholds(workouts, &request.overrides);
        let max_hr = thresholds.max_heart_rate;

        let evidence = self.gather_evidence(workouts.iter());
        let (data_quality, coverage) = self.grade_quality(evidence.with_heart_rate, evidence.total);
        let qualifying_samples = self.count_qualifying(workouts.iter(), max_hr, &request.as_of);
        let confidence = self.grade_confidence(evidence.with_heart_rate > 0, qualifying_samples);

        let scheme = request.scheme.unwrap_or_default();
        let default_model = ZoneModel::from_max(scheme, max_hr);
        let alternatives = if request.include_alternatives {
            ZoneScheme::ALL
                .iter()
                .filter(|candidate| **candidate != scheme)
                .map(|candidate| ZoneModel::from_max(*candidate, max_hr))
                .collect()
        } else {
            Vec::new()
        };

        let (sport_breakdowns, thin_sports) = self.sport_breakdowns(workouts, request, max_hr);

        let mut result = AnalysisResult {
            thresholds,
            max_hr_source,
            default_model,
            data_quality,
            confidence,
            total_activities: evidence.total,
            heart_rate_coverage_percent: coverage,
            qualifying_samples,
            sport_breakdowns,
            alternatives,
            recommendations: Vec::new(),
        };
        result.recommendations = self.recommendations(&result, &thin_sports);

        debug!(
            max_hr,
            source = ?result.max_hr_source,
            quality = ?result.data_quality,
            confidence = ?result.confidence,
            sports = result.sport_breakdowns.len(),
            "Zone analysis complete"
        );

        result
    }

    /// Estimate thresholds from history, applying any manual overrides
    pub fn estimate_thresholds(
        &self,
        workouts: &[WorkoutRecord],
        overrides: &ThresholdOverrides,
    ) -> (AthleteThresholds, MaxHrSource) {
        let mut evidence = ThresholdEvidence::default();
        for workout in workouts {
            self.record_threshold_evidence(&mut evidence, workout);
        }
        self.thresholds_from(&evidence, overrides)
    }

    /// Thresholds in force for each workout, index-aligned with `workouts`.
    ///
    /// A workout only sees history that started at or before it, so later
    /// workouts never change the stress of earlier ones. Workouts sharing a
    /// start instant see each other.
    pub fn thresholds_as_of_each(
        &self,
        workouts: &[WorkoutRecord],
        overrides: &ThresholdOverrides,
    ) -> Vec<AthleteThresholds> {
        let mut order: Vec<usize> = (0..workouts.len()).collect();
        order.sort_by_key(|index| workouts[*index].start);

        let mut evidence = ThresholdEvidence::default();
        let (baseline, _) = self.thresholds_from(&evidence, overrides);
        let mut snapshots = vec![baseline; workouts.len()];

        for group in order.chunk_by(|a, b| workouts[*a].start == workouts[*b].start) {
            for index in group {
                self.record_threshold_evidence(&mut evidence, &workouts[*index]);
            }
            let (snapshot, _) = self.thresholds_from(&evidence, overrides);
            for index in group {
                snapshots[*index] = snapshot.clone();
            }
        }

        snapshots
    }

    fn record_threshold_evidence(&self, evidence: &mut ThresholdEvidence, workout: &WorkoutRecord) {
        if let Some(hr) = workout.max_heart_rate.filter(|hr| self.is_plausible(*hr)) {
            evidence.max_hr_samples.push(hr);
        }

        if workout.moving_time_seconds.unwrap_or(0) < self.config.sustained_effort_seconds {
            return;
        }
        if let Some(hr) = workout.avg_heart_rate.filter(|hr| *hr >= self.config.min_plausible_hr) {
            evidence.peak_sustained_hr = evidence.peak_sustained_hr.max(Some(hr));
        }
        if let Some(power) = workout.avg_power.filter(|power| *power > 0) {
            evidence.peak_sustained_power = evidence.peak_sustained_power.max(Some(power));
        }
    }

    fn thresholds_from(
        &self,
        evidence: &ThresholdEvidence,
        overrides: &ThresholdOverrides,
    ) -> (AthleteThresholds, MaxHrSource) {
        let (max_heart_rate, source) = match overrides.max_heart_rate {
            Some(max) => (
                max.max(self.config.min_plausible_hr).min(self.config.max_plausible_hr),
                MaxHrSource::Override,
            ),
            None => match self.estimate_max_hr(&evidence.max_hr_samples) {
                Some(max) => (max, MaxHrSource::Estimated),
                None => (self.config.default_max_hr, MaxHrSource::Default),
            },
        };

        let resting_heart_rate = overrides
            .resting_heart_rate
            .unwrap_or(self.config.default_resting_hr)
            .min(max_heart_rate.saturating_sub(1));

        let lactate_threshold_heart_rate = overrides
            .lactate_threshold_heart_rate
            .or_else(|| evidence.peak_sustained_hr.map(|hr| hr.min(max_heart_rate)));

        let functional_threshold_power = overrides.functional_threshold_power.or_else(|| {
            evidence
                .peak_sustained_power
                .and_then(|power| (Decimal::from(power) * self.config.ftp_factor).round().to_u16())
        });

        (
            AthleteThresholds {
                max_heart_rate,
                resting_heart_rate,
                functional_threshold_power,
                lactate_threshold_heart_rate,
            },
            source,
        )
    }

    /// Highest maximum heart rate corroborated by neighbouring samples.
    ///
    /// Samples are scanned from the top; a candidate is accepted once enough
    /// samples sit within the tolerance at or below it. A lone spike is thus
    /// skipped. If nothing is corroborated the top sample is discarded and the
    /// next one used.
    pub fn estimate_max_hr(&self, samples: &[u16]) -> Option<u16> {
        let mut sorted: Vec<u16> = samples
            .iter()
            .copied()
            .filter(|hr| self.is_plausible(*hr))
            .collect();
        sorted.sort_unstable_by(|a, b| b.cmp(a));

        if sorted.is_empty() {
            return None;
        }

        let needed = self.config.min_corroborating_samples.max(1);
        let tolerance = self.config.corroboration_tolerance_bpm;

        let corroborated = sorted.iter().copied().find(|candidate| {
            let floor = candidate.saturating_sub(tolerance);
            sorted.iter().filter(|hr| **hr <= *candidate && **hr >= floor).count() >= needed
        });

        corroborated.or_else(|| sorted.get(1).or(sorted.first()).copied())
    }

    /// Quality grade and percentage of activities carrying heart rate
    pub fn grade_quality(&self, with_heart_rate: usize, total: usize) -> (DataQuality, Decimal) {
        if total == 0 || with_heart_rate == 0 {
            return (DataQuality::None, Decimal::ZERO);
        }

        let percent = (Decimal::from(with_heart_rate) * dec!(100) / Decimal::from(total)).round_dp(1);
        let bands = &self.config.quality_bands;
        let quality = if percent >= bands.excellent_percent {
            DataQuality::Excellent
        } else if percent >= bands.good_percent {
            DataQuality::Good
        } else if percent >= bands.fair_percent {
            DataQuality::Fair
        } else {
            DataQuality::Poor
        };

        (quality, percent)
    }

    /// Confidence grade from the number of qualifying high-intensity samples
    pub fn grade_confidence(&self, has_heart_rate: bool, qualifying_samples: usize) -> Confidence {
        let bands = &self.config.confidence_bands;
        if !has_heart_rate {
            Confidence::None
        } else if qualifying_samples >= bands.high_samples {
            Confidence::High
        } else if qualifying_samples >= bands.medium_samples {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Recent samples reaching the high-intensity fraction of `max_hr`
    fn count_qualifying<'a>(
        &self,
        workouts: impl Iterator<Item = &'a WorkoutRecord>,
        max_hr: u16,
        as_of: &DateTime<FixedOffset>,
    ) -> usize {
        let cutoff = *as_of - Duration::days(i64::from(self.config.recency_window_days));
        let floor = Decimal::from(max_hr) * self.config.high_intensity_fraction;

        workouts
            .filter(|w| w.start >= cutoff && w.start <= *as_of)
            .filter_map(|w| w.max_heart_rate)
            .filter(|hr| self.is_plausible(*hr) && Decimal::from(*hr) >= floor)
            .count()
    }

    fn gather_evidence<'a>(&self, workouts: impl Iterator<Item = &'a WorkoutRecord>) -> HeartRateEvidence {
        let mut evidence = HeartRateEvidence {
            total: 0,
            with_heart_rate: 0,
            samples: Vec::new(),
        };

        for workout in workouts {
            evidence.total += 1;
            if workout.has_heart_rate() {
                evidence.with_heart_rate += 1;
            }
            if let Some(hr) = workout.max_heart_rate.filter(|hr| self.is_plausible(*hr)) {
                evidence.samples.push(hr);
            }
        }

        evidence
    }

    fn is_plausible(&self, heart_rate: u16) -> bool {
        heart_rate >= self.config.min_plausible_hr && heart_rate <= self.config.max_plausible_hr
    }

    /// Per-sport breakdowns plus the sports skipped for lack of data
    fn sport_breakdowns(
        &self,
        workouts: &[WorkoutRecord],
        request: &ZoneRequest,
        overall_max: u16,
    ) -> (Vec<SportZoneBreakdown>, Vec<SportCategory>) {
        let mut by_sport: BTreeMap<SportCategory, Vec<&WorkoutRecord>> = BTreeMap::new();
        for workout in workouts {
            by_sport.entry(workout.sport).or_default().push(workout);
        }

        let mut breakdowns = Vec::new();
        let mut thin = Vec::new();

        for (sport, records) in by_sport {
            let evidence = self.gather_evidence(records.iter().copied());
            if evidence.with_heart_rate < self.config.min_sport_activities {
                if evidence.with_heart_rate > 0 {
                    thin.push(sport);
                }
                continue;
            }

            // Average-only sports borrow the overall maximum
            let max_heart_rate = self.estimate_max_hr(&evidence.samples).unwrap_or(overall_max);
            let (data_quality, _) = self.grade_quality(evidence.with_heart_rate, evidence.total);
            let qualifying = self.count_qualifying(records.iter().copied(), max_heart_rate, &request.as_of);

            breakdowns.push(SportZoneBreakdown {
                sport,
                activity_count: evidence.total,
                heart_rate_activity_count: evidence.with_heart_rate,
                max_heart_rate,
                data_quality,
                confidence: self.grade_confidence(true, qualifying),
                zones: ZoneModel::from_max(request.scheme.unwrap_or_default(), max_heart_rate),
            });
        }

        (breakdowns, thin)
    }

    fn recommendations(&self, result: &AnalysisResult, thin_sports: &[SportCategory]) -> Vec<String> {
        let mut recommendations = Vec::new();
        let max_hr = result.thresholds.max_heart_rate;

        match result.max_hr_source {
            MaxHrSource::Override => recommendations.push(format!(
                "Zones are based on your manually entered maximum heart rate of {} bpm",
                max_hr
            )),
            MaxHrSource::Default => recommendations.push(format!(
                "Using a default maximum heart rate of {} bpm until enough data is available",
                max_hr
            )),
            MaxHrSource::Estimated => {}
        }

        match result.data_quality {
            DataQuality::None => recommendations.push(
                "No heart rate data found. Record workouts with a heart rate monitor to personalise your zones"
                    .to_string(),
            ),
            DataQuality::Poor | DataQuality::Fair => recommendations.push(format!(
                "Only {}% of activities include heart rate data. Wear a heart rate monitor more consistently",
                result.heart_rate_coverage_percent
            )),
            DataQuality::Good | DataQuality::Excellent => {}
        }

        match result.confidence {
            Confidence::Low => recommendations.push(
                "Few recent high-intensity efforts. Add a hard interval session or a max effort test to confirm your maximum"
                    .to_string(),
            ),
            Confidence::Medium => recommendations
                .push("Zone estimate is reasonable. A few more hard efforts will increase confidence".to_string()),
            Confidence::High => {
                recommendations.push("Zones are well supported by recent hard efforts".to_string())
            }
            Confidence::None => {}
        }

        for breakdown in &result.sport_breakdowns {
            if breakdown.max_heart_rate.abs_diff(max_hr) >= self.config.corroboration_tolerance_bpm {
                recommendations.push(format!(
                    "Your {} maximum ({} bpm) differs from your overall estimate; use the {} zones for those workouts",
                    breakdown.sport, breakdown.max_heart_rate, breakdown.sport
                ));
            }
        }

        if !thin_sports.is_empty() {
            let names: Vec<&str> = thin_sports.iter().map(|s| s.as_str()).collect();
            recommendations.push(format!(
                "Sport-specific zones need at least {} activities with heart rate; not enough data for {}",
                self.config.min_sport_activities,
                names.join(", ")
            ));
        }

        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn as_of() -> DateTime<FixedOffset> {
        tz().with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap()
    }

    fn workout(day: i64, sport: SportCategory, avg_hr: Option<u16>, max_hr: Option<u16>) -> WorkoutRecord {
        let start = as_of() - Duration::days(day);
        let mut record = WorkoutRecord::new(format!("w{}", day), start, sport);
        record.moving_time_seconds = Some(3600);
        record.avg_heart_rate = avg_hr;
        record.max_heart_rate = max_hr;
        record
    }

    #[test]
    fn test_five_zone_layout() {
        let model = ZoneModel::from_max(ZoneScheme::FiveZone, 190);
        let bounds: Vec<(u16, u16)> = model.zones.iter().map(|z| (z.lower_bpm, z.upper_bpm)).collect();

        assert_eq!(bounds, vec![(0, 114), (114, 133), (133, 152), (152, 171), (171, 190)]);
        assert_eq!(model.zones[4].name, "VO2 Max");
        assert_eq!(model.zones[0].number, 1);
    }

    #[test]
    fn test_zone_lookup() {
        let model = ZoneModel::from_max(ZoneScheme::ThreeZone, 200);
        assert_eq!(model.zone_for(120).map(|z| z.number), Some(1));
        assert_eq!(model.zone_for(160).map(|z| z.number), Some(2));
        assert_eq!(model.zone_for(200).map(|z| z.number), Some(3));
        assert_eq!(model.zone_for(215).map(|z| z.number), Some(3));
    }

    #[test]
    fn test_single_spike_is_not_the_max() {
        let analyzer = ZoneAnalyzer::new();
        let samples = vec![221, 186, 184, 183, 170];
        assert_eq!(analyzer.estimate_max_hr(&samples), Some(186));
    }

    #[test]
    fn test_uncorroborated_samples_drop_the_top_one() {
        let analyzer = ZoneAnalyzer::new();
        assert_eq!(analyzer.estimate_max_hr(&[200, 180, 160]), Some(180));
        assert_eq!(analyzer.estimate_max_hr(&[188]), Some(188));
        assert_eq!(analyzer.estimate_max_hr(&[40, 250]), None);
    }

    #[test]
    fn test_quality_bands() {
        let analyzer = ZoneAnalyzer::new();
        assert_eq!(analyzer.grade_quality(0, 10).0, DataQuality::None);
        assert_eq!(analyzer.grade_quality(2, 10).0, DataQuality::Poor);
        assert_eq!(analyzer.grade_quality(1, 4).0, DataQuality::Fair);
        assert_eq!(analyzer.grade_quality(1, 2).0, DataQuality::Good);
        assert_eq!(analyzer.grade_quality(3, 4).0, DataQuality::Excellent);
        assert_eq!(analyzer.grade_quality(3, 4).1, dec!(75));
    }

    #[test]
    fn test_confidence_bands() {
        let analyzer = ZoneAnalyzer::new();
        assert_eq!(analyzer.grade_confidence(false, 0), Confidence::None);
        assert_eq!(analyzer.grade_confidence(true, 0), Confidence::Low);
        assert_eq!(analyzer.grade_confidence(true, 4), Confidence::Low);
        assert_eq!(analyzer.grade_confidence(true, 5), Confidence::Medium);
        assert_eq!(analyzer.grade_confidence(true, 14), Confidence::Medium);
        assert_eq!(analyzer.grade_confidence(true, 15), Confidence::High);
    }

    #[test]
    fn test_empty_history_gives_defaults() {
        let analyzer = ZoneAnalyzer::new();
        let result = analyzer.analyze(&[], &ZoneRequest::new(as_of()));

        assert_eq!(result.max_hr_source, MaxHrSource::Default);
        assert_eq!(result.thresholds.max_heart_rate, 190);
        assert_eq!(result.data_quality, DataQuality::None);
        assert_eq!(result.confidence, Confidence::None);
        assert_eq!(result.default_model.scheme, ZoneScheme::FiveZone);
        assert_eq!(result.alternatives.len(), 2);
        assert!(result.sport_breakdowns.is_empty());
        assert!(!result.recommendations.is_empty());
    }

    #[test]
    fn test_override_replaces_estimate() {
        let analyzer = ZoneAnalyzer::new();
        let workouts: Vec<WorkoutRecord> = (0..6)
            .map(|d| workout(d, SportCategory::Running, Some(150), Some(185)))
            .collect();

        let mut request = ZoneRequest::new(as_of());
        request.overrides.max_heart_rate = Some(200);
        let result = analyzer.analyze(&workouts, &request);

        assert_eq!(result.max_hr_source, MaxHrSource::Override);
        assert_eq!(result.default_model.max_heart_rate, 200);
        assert!(result.alternatives.iter().all(|m| m.max_heart_rate == 200));
        assert!(result.recommendations[0].contains("200 bpm"));
    }

    #[test]
    fn test_requested_scheme_becomes_default() {
        let analyzer = ZoneAnalyzer::new();
        let mut request = ZoneRequest::new(as_of());
        request.scheme = Some(ZoneScheme::ThreeZone);
        request.include_alternatives = false;

        let result = analyzer.analyze(&[], &request);
        assert_eq!(result.default_model.scheme, ZoneScheme::ThreeZone);
        assert!(result.alternatives.is_empty());
    }

    #[test]
    fn test_sport_breakdown_requires_minimum_activities() {
        let analyzer = ZoneAnalyzer::new();
        let mut workouts: Vec<WorkoutRecord> = (0..4)
            .map(|d| workout(d, SportCategory::Running, Some(155), Some(188)))
            .collect();
        workouts.extend((10..12).map(|d| workout(d, SportCategory::Cycling, Some(140), Some(176))));

        let result = analyzer.analyze(&workouts, &ZoneRequest::new(as_of()));

        assert_eq!(result.sport_breakdowns.len(), 1);
        assert_eq!(result.sport_breakdowns[0].sport, SportCategory::Running);
        assert_eq!(result.sport_breakdowns[0].max_heart_rate, 188);
        assert!(result.recommendations.iter().any(|r| r.contains("cycling")));
    }

    #[test]
    fn test_confidence_ignores_stale_samples() {
        let analyzer = ZoneAnalyzer::new();
        let workouts: Vec<WorkoutRecord> = (0..20)
            .map(|i| workout(200 + i, SportCategory::Running, Some(150), Some(186)))
            .collect();

        let result = analyzer.analyze(&workouts, &ZoneRequest::new(as_of()));
        assert_eq!(result.thresholds.max_heart_rate, 186);
        assert_eq!(result.qualifying_samples, 0);
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.data_quality, DataQuality::Excellent);
    }

    #[test]
    fn test_threshold_estimates_from_sustained_efforts() {
        let analyzer = ZoneAnalyzer::new();
        let mut short = workout(1, SportCategory::Cycling, Some(178), Some(185));
        short.moving_time_seconds = Some(600);
        short.avg_power = Some(400);
        let mut long = workout(2, SportCategory::Cycling, Some(165), Some(183));
        long.avg_power = Some(260);

        let (thresholds, source) = analyzer.estimate_thresholds(&[short, long], &ThresholdOverrides::default());

        assert_eq!(source, MaxHrSource::Estimated);
        assert_eq!(thresholds.lactate_threshold_heart_rate, Some(165));
        assert_eq!(thresholds.functional_threshold_power, Some(247));
        assert_eq!(thresholds.resting_heart_rate, 60);
    }

    #[test]
    fn test_thresholds_only_see_earlier_workouts() {
        let analyzer = ZoneAnalyzer::new();
        let mut newer = workout(1, SportCategory::Cycling, None, Some(190));
        newer.avg_power = Some(300);
        let mut older = workout(5, SportCategory::Cycling, None, Some(182));
        older.avg_power = Some(200);

        let snapshots = analyzer.thresholds_as_of_each(&[newer, older], &ThresholdOverrides::default());

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].functional_threshold_power, Some(190));
        assert_eq!(snapshots[1].max_heart_rate, 182);
        assert_eq!(snapshots[0].functional_threshold_power, Some(285));
        assert_eq!(snapshots[0].max_heart_rate, 182);

        let overrides = ThresholdOverrides {
            max_heart_rate: Some(250),
            ..ThresholdOverrides::default()
        };
        let snapshots = analyzer.thresholds_as_of_each(&[workout(3, SportCategory::Running, None, None)], &overrides);
        assert_eq!(snapshots[0].max_heart_rate, 230);
        assert_eq!(snapshots[0].functional_threshold_power, None);
    }

    #[test]
    fn test_inverted_plausible_range_does_not_panic() {
        let analyzer = ZoneAnalyzer::with_config(ZoneConfig {
            min_plausible_hr: 220,
            max_plausible_hr: 120,
            ..ZoneConfig::default()
        });
        let overrides = ThresholdOverrides {
            max_heart_rate: Some(180),
            ..ThresholdOverrides::default()
        };

        let (thresholds, source) = analyzer.estimate_thresholds(&[], &overrides);
        assert_eq!(source, MaxHrSource::Override);
        assert_eq!(thresholds.max_heart_rate, 120);
    }

    #[test]
    fn test_default_scheme_is_five_zone() {
        assert_eq!(ZoneScheme::default(), ZoneScheme::FiveZone);
    }

    #[test]
    fn test_scheme_parsing() {
        assert_eq!("five-zone".parse::<ZoneScheme>().unwrap(), ZoneScheme::FiveZone);
        assert_eq!("three_zone".parse::<ZoneScheme>().unwrap(), ZoneScheme::ThreeZone);
        assert_eq!("power".parse::<ZoneScheme>().unwrap(), ZoneScheme::PowerBased);
        assert!("seven".parse::<ZoneScheme>().is_err());
    }

    proptest! {
        #[test]
        fn test_zones_partition_range(max_hr in 100u16..=230u16, scheme_index in 0usize..3) {
            let model = ZoneModel::from_max(ZoneScheme::ALL[scheme_index], max_hr);

            prop_assert_eq!(model.zones.first().unwrap().lower_bpm, 0);
            prop_assert_eq!(model.zones.last().unwrap().upper_bpm, max_hr);
            for zone in &model.zones {
                prop_assert!(zone.lower_bpm < zone.upper_bpm);
            }
            for pair in model.zones.windows(2) {
                prop_assert_eq!(pair[0].upper_bpm, pair[1].lower_bpm);
                prop_assert_eq!(pair[0].number + 1, pair[1].number);
            }
        }
    }
}

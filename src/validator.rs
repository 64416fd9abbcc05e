//! Session validation
//!
//! Cleans raw RR intervals and decides whether a session is trustworthy enough
//! for metric computation:
//! - Motion-artifact gate
//! - Physiological range filter
//! - Statistical outlier removal (z-score or IQR)
//! - Quality scoring and labeling
//!
//! Each call folds over a fresh [`ValidationState`], so a single [`Validator`]
//! can be reused across sessions and threads.

use crate::config::ValidationConfig;
use crate::types::{CleanedIntervals, FilterMethod, QualityLabel, RawSessionInput, ValidationResult};
use tracing::debug;

pub const REASON_MOTION_ARTIFACT: &str = "Motion artifact detected";
pub const REASON_TOO_FEW_INTERVALS: &str = "Too few valid RR intervals";
pub const REASON_LOW_VALID_PERCENTAGE: &str = "Low valid RR percentage";
pub const REASON_POOR_QUALITY: &str = "Poor quality score";

/// Separator between accumulated failure reasons
pub const REASON_SEPARATOR: &str = " + ";

/// Cleaned intervals together with the verdict that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub cleaned: CleanedIntervals,
    pub result: ValidationResult,
}

/// Validator for raw session input
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate and clean one session
    pub fn validate(&self, input: &RawSessionInput) -> ValidationOutcome {
        let mut state = ValidationState::new(self.config.filter_method);

        if input.motion_artifacts {
            // Quality fields keep their defaults on this path
            state.fail(REASON_MOTION_ARTIFACT);
            debug!(session = %input.recording_session_id, "motion artifact gate tripped");
            return state.finish(CleanedIntervals::default());
        }

        let total = input.rr_intervals.len();
        let (in_range, range_outliers) =
            range_filter(&input.rr_intervals, self.config.min_rr_ms, self.config.max_rr_ms);
        state.outlier_count += range_outliers;

        if total > 0 {
            state.valid_rr_percentage = in_range.len() as f64 / total as f64 * 100.0;
        } else {
            state.valid_rr_percentage = 0.0;
        }

        if in_range.len() < self.config.min_rr_count {
            state.fail(REASON_TOO_FEW_INTERVALS);
        }
        if state.valid_rr_percentage < self.config.min_valid_percentage {
            state.fail(REASON_LOW_VALID_PERCENTAGE);
        }

        let cleaned = remove_statistical_outliers(&in_range, &self.config);
        state.outlier_count += in_range.len() - cleaned.len();

        if total > 0 {
            state.quality_score = 1.0 - state.outlier_count as f64 / total as f64;
        }
        if state.quality_score < self.config.min_quality_score {
            state.fail(REASON_POOR_QUALITY);
        }
        state.quality_label = QualityLabel::from_score(state.quality_score);

        debug!(
            session = %input.recording_session_id,
            total,
            in_range = in_range.len(),
            cleaned = cleaned.len(),
            outliers = state.outlier_count,
            quality_score = state.quality_score,
            "validation complete"
        );

        state.finish(CleanedIntervals::new(cleaned))
    }
}

/// Per-session accumulator, consumed into a [`ValidationOutcome`]
#[derive(Debug)]
struct ValidationState {
    reasons: Vec<&'static str>,
    outlier_count: usize,
    valid_rr_percentage: f64,
    quality_score: f64,
    quality_label: QualityLabel,
    filter_method: FilterMethod,
}

impl ValidationState {
    fn new(filter_method: FilterMethod) -> Self {
        Self {
            reasons: Vec::new(),
            outlier_count: 0,
            valid_rr_percentage: 100.0,
            quality_score: 1.0,
            quality_label: QualityLabel::Excellent,
            filter_method,
        }
    }

    fn fail(&mut self, reason: &'static str) {
        self.reasons.push(reason);
    }

    fn finish(self, cleaned: CleanedIntervals) -> ValidationOutcome {
        let reason = if self.reasons.is_empty() {
            None
        } else {
            Some(self.reasons.join(REASON_SEPARATOR))
        };

        ValidationOutcome {
            cleaned,
            result: ValidationResult {
                valid: self.reasons.is_empty(),
                reason,
                quality_score: self.quality_score,
                quality_label: self.quality_label,
                filter_method: self.filter_method,
                outlier_count: self.outlier_count,
                valid_rr_percentage: self.valid_rr_percentage,
            },
        }
    }
}

/// Keep intervals within `[min_ms, max_ms]`; returns kept values and the rejected count
///
/// Negative readings fall outside the range like any other faulty value.
pub fn range_filter(values: &[i64], min_ms: u32, max_ms: u32) -> (Vec<u32>, usize) {
    let kept: Vec<u32> = values
        .iter()
        .filter_map(|&rr| u32::try_from(rr).ok())
        .filter(|rr| (min_ms..=max_ms).contains(rr))
        .collect();
    let rejected = values.len() - kept.len();
    (kept, rejected)
}

/// Apply the configured statistical filter, preserving order
pub fn remove_statistical_outliers(values: &[u32], config: &ValidationConfig) -> Vec<u32> {
    if values.is_empty() {
        return Vec::new();
    }

    match config.filter_method {
        FilterMethod::Zscore => zscore_filter(values, config.zscore_threshold),
        FilterMethod::Iqr => iqr_filter(values, config.iqr_multiplier),
    }
}

/// Drop values whose absolute population z-score exceeds `threshold`
///
/// A zero-variance sequence has no defined z-score and is dropped entirely.
fn zscore_filter(values: &[u32], threshold: f64) -> Vec<u32> {
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let std = variance.sqrt();

    if std == 0.0 {
        return Vec::new();
    }

    values
        .iter()
        .copied()
        .filter(|&v| ((v as f64 - mean) / std).abs() <= threshold)
        .collect()
}

/// Drop values outside `[Q1 - k*IQR, Q3 + k*IQR]`
fn iqr_filter(values: &[u32], multiplier: f64) -> Vec<u32> {
    let mut sorted: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q1 = percentile(&sorted, 25.0);
    let q3 = percentile(&sorted, 75.0);
    let iqr = q3 - q1;
    let lower = q1 - multiplier * iqr;
    let upper = q3 + multiplier * iqr;

    values
        .iter()
        .copied()
        .filter(|&v| {
            let v = v as f64;
            v >= lower && v <= upper
        })
        .collect()
}

/// Linear-interpolated percentile of an ascending, non-empty slice
pub(crate) fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let rank = (sorted.len() - 1) as f64 * pct / 100.0;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeviceInfo;
    use pretty_assertions::assert_eq;

    fn make_input(rr_intervals: Vec<i64>, motion_artifacts: bool) -> RawSessionInput {
        RawSessionInput {
            user_id: "user@example.com".to_string(),
            device_info: DeviceInfo {
                model: "Polar H10".to_string(),
                firmware_version: "2.1.9".to_string(),
            },
            recording_session_id: "test-session".to_string(),
            timestamp: "2025-03-25T23:10:00Z".to_string(),
            rr_intervals,
            heart_rate: Some(74),
            motion_artifacts,
            tags: vec!["Sleep".to_string()],
        }
    }

    /// Gently oscillating intervals around 800 ms
    fn steady_intervals(n: usize) -> Vec<i64> {
        (0..n).map(|i| 790 + (i % 5) as i64 * 5).collect()
    }

    #[test]
    fn test_clean_session_is_valid() {
        let outcome = Validator::default().validate(&make_input(steady_intervals(50), false));

        assert!(outcome.result.valid);
        assert_eq!(outcome.result.reason, None);
        assert_eq!(outcome.result.outlier_count, 0);
        assert_eq!(outcome.result.quality_score, 1.0);
        assert_eq!(outcome.result.quality_label, QualityLabel::Excellent);
        assert_eq!(outcome.result.valid_rr_percentage, 100.0);
        assert_eq!(outcome.cleaned.len(), 50);
    }

    // Motion-flagged sessions keep the initial quality fields
    #[test]
    fn test_motion_artifact_keeps_default_quality() {
        let outcome = Validator::default().validate(&make_input(steady_intervals(50), true));

        assert!(!outcome.result.valid);
        assert_eq!(outcome.result.reason.as_deref(), Some("Motion artifact detected"));
        assert!(outcome.cleaned.is_empty());
        assert_eq!(outcome.result.quality_score, 1.0);
        assert_eq!(outcome.result.quality_label, QualityLabel::Excellent);
        assert_eq!(outcome.result.outlier_count, 0);
        assert_eq!(outcome.result.valid_rr_percentage, 100.0);
    }

    #[test]
    fn test_too_few_intervals() {
        let outcome = Validator::default().validate(&make_input(vec![500; 10], false));

        assert!(!outcome.result.valid);
        assert_eq!(
            outcome.result.reason.as_deref(),
            Some("Too few valid RR intervals")
        );
        assert_eq!(outcome.result.valid_rr_percentage, 100.0);
    }

    #[test]
    fn test_low_valid_percentage() {
        let mut rr = steady_intervals(35);
        rr.extend([50; 5]);
        let outcome = Validator::default().validate(&make_input(rr, false));

        assert!(!outcome.result.valid);
        assert_eq!(outcome.result.valid_rr_percentage, 87.5);
        assert_eq!(outcome.result.outlier_count, 5);
        assert_eq!(
            outcome.result.reason.as_deref(),
            Some("Low valid RR percentage")
        );
        // 1 - 5/40
        assert!((outcome.result.quality_score - 0.875).abs() < 1e-12);
        assert_eq!(outcome.result.quality_label, QualityLabel::Acceptable);
    }

    #[test]
    fn test_reasons_accumulate_in_order() {
        let mut rr = steady_intervals(20);
        rr.extend([2500; 20]);
        let outcome = Validator::default().validate(&make_input(rr, false));

        assert!(!outcome.result.valid);
        assert_eq!(
            outcome.result.reason.as_deref(),
            Some("Too few valid RR intervals + Low valid RR percentage + Poor quality score")
        );
        assert_eq!(outcome.result.quality_label, QualityLabel::Poor);
        // Statistical filtering still ran on the in-range values
        assert_eq!(outcome.cleaned.len(), 20);
    }

    #[test]
    fn test_empty_session() {
        let outcome = Validator::default().validate(&make_input(vec![], false));

        assert!(!outcome.result.valid);
        assert_eq!(outcome.result.valid_rr_percentage, 0.0);
        assert_eq!(outcome.result.quality_score, 1.0);
        assert_eq!(
            outcome.result.reason.as_deref(),
            Some("Too few valid RR intervals + Low valid RR percentage")
        );
        assert!(outcome.cleaned.is_empty());
    }

    #[test]
    fn test_zscore_removes_spike() {
        let mut rr = steady_intervals(49);
        rr.insert(25, 1900);
        let outcome = Validator::default().validate(&make_input(rr, false));

        assert!(outcome.result.valid);
        assert_eq!(outcome.result.outlier_count, 1);
        assert!(!outcome.cleaned.as_slice().contains(&1900));
        assert!((outcome.result.quality_score - 0.98).abs() < 1e-12);
        assert_eq!(outcome.result.quality_label, QualityLabel::Excellent);
    }

    #[test]
    fn test_iqr_removes_spike() {
        let config = ValidationConfig {
            filter_method: FilterMethod::Iqr,
            ..Default::default()
        };
        let mut rr = steady_intervals(49);
        rr.insert(10, 1200);
        let outcome = Validator::new(config).validate(&make_input(rr, false));

        assert!(outcome.result.valid);
        assert_eq!(outcome.result.filter_method, FilterMethod::Iqr);
        assert_eq!(outcome.result.outlier_count, 1);
        assert!(!outcome.cleaned.as_slice().contains(&1200));
    }

    #[test]
    fn test_flatline_session_is_poor() {
        let outcome = Validator::default().validate(&make_input(vec![1000; 60], false));

        assert!(!outcome.result.valid);
        assert_eq!(outcome.result.reason.as_deref(), Some("Poor quality score"));
        assert!(outcome.cleaned.is_empty());
        assert_eq!(outcome.result.outlier_count, 60);
        assert_eq!(outcome.result.quality_score, 0.0);
        assert_eq!(outcome.result.quality_label, QualityLabel::Poor);
        assert_eq!(outcome.result.valid_rr_percentage, 100.0);
    }

    #[test]
    fn test_iqr_keeps_flatline() {
        let config = ValidationConfig {
            filter_method: FilterMethod::Iqr,
            ..Default::default()
        };
        let outcome = Validator::new(config).validate(&make_input(vec![1000; 60], false));

        assert!(outcome.result.valid);
        assert_eq!(outcome.cleaned.len(), 60);
    }

    #[test]
    fn test_negative_interval_is_range_outlier() {
        let mut rr = steady_intervals(49);
        rr.push(-1);
        let outcome = Validator::default().validate(&make_input(rr, false));

        assert!(outcome.result.valid);
        assert_eq!(outcome.result.outlier_count, 1);
        assert_eq!(outcome.result.valid_rr_percentage, 98.0);
        assert!((outcome.result.quality_score - 0.98).abs() < 1e-12);
        assert_eq!(outcome.cleaned.len(), 49);
    }

    #[test]
    fn test_order_preserved() {
        let rr = steady_intervals(40);
        let outcome = Validator::default().validate(&make_input(rr.clone(), false));
        let expected: Vec<u32> = rr.iter().map(|&v| v as u32).collect();
        assert_eq!(outcome.cleaned.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_range_filter_bounds_inclusive() {
        let (kept, rejected) = range_filter(&[-300, 0, 299, 300, 2000, 2001], 300, 2000);
        assert_eq!(kept, vec![300, 2000]);
        assert_eq!(rejected, 4);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&sorted, 25.0) - 1.75).abs() < 1e-12);
        assert!((percentile(&sorted, 75.0) - 3.25).abs() < 1e-12);
        assert_eq!(percentile(&[5.0], 50.0), 5.0);
    }

    #[test]
    fn test_validator_reuse_is_independent() {
        let validator = Validator::default();
        let bad = validator.validate(&make_input(vec![500; 10], false));
        let good = validator.validate(&make_input(steady_intervals(50), false));

        assert!(!bad.result.valid);
        assert!(good.result.valid);
        assert_eq!(good.result.reason, None);
    }
}

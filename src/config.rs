//! Pipeline configuration
//!
//! All thresholds default to the values the session API has always used. A TOML
//! file may override any subset of them:
//!
//! ```toml
//! [validation]
//! filter_method = "iqr"
//! min_valid_percentage = 85.0
//!
//! [spectral]
//! resample_hz = 4.0
//! ```

use crate::error::ComputeError;
use crate::types::FilterMethod;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lower bound of a physiologically plausible RR interval (ms)
pub const DEFAULT_MIN_RR_MS: u32 = 300;
/// Upper bound of a physiologically plausible RR interval (ms)
pub const DEFAULT_MAX_RR_MS: u32 = 2000;
/// Minimum number of in-range intervals for a valid session
pub const DEFAULT_MIN_RR_COUNT: usize = 30;
pub const DEFAULT_MIN_VALID_PERCENTAGE: f64 = 90.0;
pub const DEFAULT_MIN_QUALITY_SCORE: f64 = 0.6;
pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 3.0;
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Uniform resampling rate for spectral analysis (Hz)
pub const DEFAULT_RESAMPLE_HZ: f64 = 4.0;
pub const DEFAULT_LF_BAND: (f64, f64) = (0.04, 0.15);
pub const DEFAULT_HF_BAND: (f64, f64) = (0.15, 0.4);
/// Fewest cleaned intervals handed to spectral estimation
///
/// Session-level sufficiency is decided by validation; this only rules out a
/// series with no successive interval at all.
pub const DEFAULT_MIN_SPECTRAL_INTERVALS: usize = 2;

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub validation: ValidationConfig,
    pub spectral: SpectralConfig,
}

/// Validator thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    pub min_rr_ms: u32,
    pub max_rr_ms: u32,
    pub min_rr_count: usize,
    pub min_valid_percentage: f64,
    pub min_quality_score: f64,
    pub filter_method: FilterMethod,
    pub zscore_threshold: f64,
    pub iqr_multiplier: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_rr_ms: DEFAULT_MIN_RR_MS,
            max_rr_ms: DEFAULT_MAX_RR_MS,
            min_rr_count: DEFAULT_MIN_RR_COUNT,
            min_valid_percentage: DEFAULT_MIN_VALID_PERCENTAGE,
            min_quality_score: DEFAULT_MIN_QUALITY_SCORE,
            filter_method: FilterMethod::default(),
            zscore_threshold: DEFAULT_ZSCORE_THRESHOLD,
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
        }
    }
}

/// Frequency-domain analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpectralConfig {
    pub resample_hz: f64,
    /// Inclusive low-frequency band (Hz)
    pub lf_band: (f64, f64),
    /// Inclusive high-frequency band (Hz)
    pub hf_band: (f64, f64),
    /// Cleaned intervals required before spectral estimation is attempted
    pub min_intervals: usize,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            resample_hz: DEFAULT_RESAMPLE_HZ,
            lf_band: DEFAULT_LF_BAND,
            hf_band: DEFAULT_HF_BAND,
            min_intervals: DEFAULT_MIN_SPECTRAL_INTERVALS,
        }
    }
}

impl PipelineConfig {
    /// Parse and check a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ComputeError> {
        let config: PipelineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ComputeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, ComputeError> {
        toml::to_string_pretty(self).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ComputeError> {
        let v = &self.validation;
        if v.min_rr_ms >= v.max_rr_ms {
            return Err(ComputeError::ConfigError(format!(
                "min_rr_ms ({}) must be below max_rr_ms ({})",
                v.min_rr_ms, v.max_rr_ms
            )));
        }
        if !(0.0..=100.0).contains(&v.min_valid_percentage) {
            return Err(ComputeError::ConfigError(
                "min_valid_percentage must be within 0-100".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&v.min_quality_score) {
            return Err(ComputeError::ConfigError(
                "min_quality_score must be within 0-1".to_string(),
            ));
        }
        if v.zscore_threshold <= 0.0 || v.iqr_multiplier < 0.0 {
            return Err(ComputeError::ConfigError(
                "outlier thresholds must be positive".to_string(),
            ));
        }

        let s = &self.spectral;
        if !(s.resample_hz > 0.0) {
            return Err(ComputeError::ConfigError(
                "resample_hz must be positive".to_string(),
            ));
        }
        for (name, (lo, hi)) in [("lf_band", s.lf_band), ("hf_band", s.hf_band)] {
            if !(lo >= 0.0 && lo < hi) {
                return Err(ComputeError::ConfigError(format!(
                    "{name} must satisfy 0 <= low < high, got ({lo}, {hi})"
                )));
            }
            if hi > s.resample_hz / 2.0 {
                return Err(ComputeError::ConfigError(format!(
                    "{name} upper edge {hi} Hz exceeds Nyquist ({} Hz)",
                    s.resample_hz / 2.0
                )));
            }
        }
        if s.min_intervals < 2 {
            return Err(ComputeError::ConfigError(
                "min_intervals must be at least 2".to_string(),
            ));
        }

        Ok(())
    }
}

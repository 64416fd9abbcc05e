//! HRV metric computation
//!
//! This module derives session metrics from cleaned RR intervals:
//! - Time domain: mean RR, SDNN, RMSSD, pNN50, CV of RR
//! - Frequency domain: LF/HF band power, LF/HF ratio, breathing rate
//!
//! Carried-through fields (heart rate, motion flag, quality diagnostics) are
//! copied from the raw input and the validation result.

use crate::config::SpectralConfig;
use crate::error::ComputeError;
use crate::spectral::{
    cumulative_time_axis, detrend_linear, resample_linear, sampling_frequency, welch,
    MIN_RESAMPLED_SAMPLES,
};
use crate::types::{CleanedIntervals, RawSessionInput, SessionMetrics, ValidationResult};
use tracing::debug;

/// Successive difference threshold for pNN50 (ms)
const NN50_THRESHOLD_MS: f64 = 50.0;

/// Time-domain statistics of an RR series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeDomain {
    pub mean_rr: f64,
    pub sdnn: f64,
    pub rmssd: f64,
    pub pnn50: f64,
    pub cv_rr: f64,
    pub rr_count: usize,
}

/// Frequency-domain statistics of an RR series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyDomain {
    pub lf_power: f64,
    pub hf_power: f64,
    pub lf_hf_ratio: f64,
    pub breathing_rate: Option<f64>,
}

/// Metrics engine for cleaned sessions
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    config: SpectralConfig,
}

impl MetricsEngine {
    pub fn new(config: SpectralConfig) -> Self {
        Self { config }
    }

    /// Compute session metrics
    ///
    /// Fails with [`ComputeError::InsufficientSamples`] below the configured
    /// minimum interval count, and with [`ComputeError::DegenerateSpectrum`] when
    /// the resampled series cannot support a Welch segment.
    pub fn compute(
        &self,
        cleaned: &CleanedIntervals,
        input: &RawSessionInput,
        validation: &ValidationResult,
    ) -> Result<SessionMetrics, ComputeError> {
        if cleaned.len() < self.config.min_intervals {
            return Err(ComputeError::InsufficientSamples {
                required: self.config.min_intervals,
                actual: cleaned.len(),
            });
        }

        let rr = cleaned.to_f64();
        let time = time_domain(&rr);
        let freq = self.frequency_domain(&rr)?;

        debug!(
            rr_count = time.rr_count,
            rmssd = time.rmssd,
            lf_power = freq.lf_power,
            hf_power = freq.hf_power,
            "metrics computed"
        );

        Ok(SessionMetrics {
            mean_rr: time.mean_rr,
            sdnn: time.sdnn,
            rmssd: time.rmssd,
            pnn50: time.pnn50,
            cv_rr: time.cv_rr,
            rr_count: time.rr_count,
            lf_power: freq.lf_power,
            hf_power: freq.hf_power,
            lf_hf_ratio: freq.lf_hf_ratio,
            breathing_rate: freq.breathing_rate,
            heart_rate: input.heart_rate,
            motion_artifacts: input.motion_artifacts,
            valid_rr_percentage: validation.valid_rr_percentage,
            quality_score: validation.quality_score,
            outlier_count: validation.outlier_count,
            filter_method: validation.filter_method,
        })
    }

    /// Resample, detrend, estimate the PSD and integrate the LF/HF bands
    pub fn frequency_domain(&self, rr: &[f64]) -> Result<FrequencyDomain, ComputeError> {
        let times = cumulative_time_axis(rr);
        let (grid, resampled) = resample_linear(&times, rr, self.config.resample_hz);

        if resampled.len() < MIN_RESAMPLED_SAMPLES {
            return Err(ComputeError::DegenerateSpectrum(format!(
                "{} resampled points, need at least {MIN_RESAMPLED_SAMPLES}",
                resampled.len()
            )));
        }

        let detrended = detrend_linear(&resampled);
        let fs = sampling_frequency(&grid).ok_or_else(|| {
            ComputeError::DegenerateSpectrum("resampling grid has no spacing".to_string())
        })?;
        let psd = welch(&detrended, fs, detrended.len() / 2)?;

        let lf_power = psd.band_power(self.config.lf_band);
        let hf_power = psd.band_power(self.config.hf_band);
        let lf_hf_ratio = if hf_power > 0.0 {
            lf_power / hf_power
        } else {
            0.0
        };
        let breathing_rate = psd
            .peak_frequency(self.config.hf_band)
            .map(|freq_hz| freq_hz * 60.0);

        Ok(FrequencyDomain {
            lf_power,
            hf_power,
            lf_hf_ratio,
            breathing_rate,
        })
    }
}

/// Time-domain statistics; an empty series yields all zeros
pub fn time_domain(rr: &[f64]) -> TimeDomain {
    let n = rr.len();
    if n == 0 {
        return TimeDomain {
            mean_rr: 0.0,
            sdnn: 0.0,
            rmssd: 0.0,
            pnn50: 0.0,
            cv_rr: 0.0,
            rr_count: 0,
        };
    }

    let mean_rr = rr.iter().sum::<f64>() / n as f64;
    let sdnn = (rr.iter().map(|v| (v - mean_rr).powi(2)).sum::<f64>() / n as f64).sqrt();

    let diffs: Vec<f64> = rr.windows(2).map(|w| w[1] - w[0]).collect();
    let (rmssd, pnn50) = if diffs.is_empty() {
        (0.0, 0.0)
    } else {
        let m = diffs.len() as f64;
        let rmssd = (diffs.iter().map(|d| d * d).sum::<f64>() / m).sqrt();
        let nn50 = diffs.iter().filter(|d| d.abs() > NN50_THRESHOLD_MS).count();
        (rmssd, nn50 as f64 / m * 100.0)
    };

    let cv_rr = if mean_rr != 0.0 {
        sdnn / mean_rr * 100.0
    } else {
        0.0
    };

    TimeDomain {
        mean_rr,
        sdnn,
        rmssd,
        pnn50,
        cv_rr,
        rr_count: n,
    }
}

//! Core types for the HRV Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw session input, validation results, cleaned intervals, computed
//! metrics and the final session record.
//!
//! Field names on the wire follow the session API payloads (`recordingSessionId`,
//! `rrIntervals`, `lfPower`, ...), so records serialize to the same JSON shape
//! consumers already read.

use crate::indexes::MetricIndexes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recording device descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device model (e.g. "Polar H10")
    #[serde(default)]
    pub model: String,
    /// Firmware version string
    #[serde(rename = "firmwareVersion", default)]
    pub firmware_version: String,
}

/// One recording session as received from a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSessionInput {
    /// Owning user identifier
    pub user_id: String,
    /// Device that produced the recording
    #[serde(default)]
    pub device_info: DeviceInfo,
    /// Unique recording session identifier
    #[serde(rename = "recordingSessionId")]
    pub recording_session_id: String,
    /// Session start (ISO-8601)
    pub timestamp: String,
    /// RR intervals in milliseconds, in temporal order
    ///
    /// Signed so that faulty readings reach the range filter as outliers
    #[serde(rename = "rrIntervals")]
    pub rr_intervals: Vec<i64>,
    /// Device-reported heart rate (bpm)
    #[serde(rename = "heartRate", default)]
    pub heart_rate: Option<i64>,
    /// Device-reported motion artifact flag
    #[serde(rename = "motionArtifacts", default)]
    pub motion_artifacts: bool,
    /// Free-text tags
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Statistical outlier filter applied after range filtering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMethod {
    /// Drop values whose population z-score exceeds the threshold
    #[default]
    Zscore,
    /// Drop values outside the Tukey fences
    Iqr,
}

impl FilterMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMethod::Zscore => "zscore",
            FilterMethod::Iqr => "iqr",
        }
    }
}

impl std::str::FromStr for FilterMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zscore" => Ok(FilterMethod::Zscore),
            "iqr" => Ok(FilterMethod::Iqr),
            other => Err(format!("unknown filter method '{other}'")),
        }
    }
}

/// Quality classification derived from the quality score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLabel {
    #[default]
    Excellent,
    Acceptable,
    Borderline,
    Poor,
}

impl QualityLabel {
    /// Step function over the quality score
    pub fn from_score(score: f64) -> Self {
        if score > 0.95 {
            QualityLabel::Excellent
        } else if score > 0.80 {
            QualityLabel::Acceptable
        } else if score > 0.60 {
            QualityLabel::Borderline
        } else {
            QualityLabel::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLabel::Excellent => "excellent",
            QualityLabel::Acceptable => "acceptable",
            QualityLabel::Borderline => "borderline",
            QualityLabel::Poor => "poor",
        }
    }
}

/// Validity verdict and quality diagnostics for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// All failure reasons joined with `" + "`, `None` when valid
    pub reason: Option<String>,
    /// `1 - outliers / total`, in [0, 1]
    pub quality_score: f64,
    pub quality_label: QualityLabel,
    pub filter_method: FilterMethod,
    /// Range outliers plus statistical outliers
    pub outlier_count: usize,
    /// Share of raw intervals inside the physiological range (0-100)
    pub valid_rr_percentage: f64,
}

/// RR intervals that survived range filtering and outlier removal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CleanedIntervals(Vec<u32>);

impl CleanedIntervals {
    pub fn new(values: Vec<u32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Intervals as floating point milliseconds
    pub fn to_f64(&self) -> Vec<f64> {
        self.0.iter().map(|&rr| rr as f64).collect()
    }
}

/// Time- and frequency-domain HRV metrics for one valid session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// Mean RR interval (ms)
    pub mean_rr: f64,
    /// Population standard deviation of RR intervals (ms)
    pub sdnn: f64,
    /// Root mean square of successive differences (ms)
    pub rmssd: f64,
    /// Percentage of successive differences above 50 ms
    pub pnn50: f64,
    /// Coefficient of variation of RR (%)
    pub cv_rr: f64,
    /// Number of cleaned intervals
    pub rr_count: usize,
    /// Low-frequency band power (0.04-0.15 Hz, ms²)
    #[serde(rename = "lfPower")]
    pub lf_power: f64,
    /// High-frequency band power (0.15-0.4 Hz, ms²)
    #[serde(rename = "hfPower")]
    pub hf_power: f64,
    #[serde(rename = "lfHfRatio")]
    pub lf_hf_ratio: f64,
    /// Breaths per minute from the HF peak; absent without HF bins
    #[serde(rename = "breathingRate")]
    pub breathing_rate: Option<f64>,
    #[serde(rename = "heartRate")]
    pub heart_rate: Option<i64>,
    #[serde(rename = "motionArtifacts")]
    pub motion_artifacts: bool,
    pub valid_rr_percentage: f64,
    pub quality_score: f64,
    pub outlier_count: usize,
    pub filter_method: FilterMethod,
}

/// Session identity plus validation diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Timestamp exactly as received
    pub timestamp: String,
    /// Parsed timestamp, `None` when the received value is not ISO-8601
    pub recorded_at: Option<DateTime<Utc>>,
    #[serde(rename = "recordingSessionId")]
    pub recording_session_id: String,
    pub user_id: String,
    pub device_info: DeviceInfo,
    pub tags: Vec<String>,
    pub valid: bool,
    pub reason: Option<String>,
    pub quality_score: f64,
    pub quality_label: QualityLabel,
    pub filter_method: FilterMethod,
    pub outlier_count: usize,
    pub valid_rr_percentage: f64,
    #[serde(rename = "motionArtifacts")]
    pub motion_artifacts: bool,
}

impl SessionMetadata {
    pub fn new(
        input: &RawSessionInput,
        recorded_at: Option<DateTime<Utc>>,
        validation: &ValidationResult,
    ) -> Self {
        Self {
            timestamp: input.timestamp.clone(),
            recorded_at,
            recording_session_id: input.recording_session_id.clone(),
            user_id: input.user_id.clone(),
            device_info: input.device_info.clone(),
            tags: input.tags.clone(),
            valid: validation.valid,
            reason: validation.reason.clone(),
            quality_score: validation.quality_score,
            quality_label: validation.quality_label,
            filter_method: validation.filter_method,
            outlier_count: validation.outlier_count,
            valid_rr_percentage: validation.valid_rr_percentage,
            motion_artifacts: input.motion_artifacts,
        }
    }
}

/// Terminal artifact of the pipeline
///
/// Either metadata-only (invalid session) or fully processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub metadata: SessionMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SessionMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexes: Option<MetricIndexes>,
}

impl SessionRecord {
    /// Record for a session whose metrics were not computed
    pub fn metadata_only(metadata: SessionMetadata) -> Self {
        Self {
            metadata,
            metrics: None,
            indexes: None,
        }
    }

    /// Record for a valid session with metrics and indexes
    pub fn processed(
        metadata: SessionMetadata,
        metrics: SessionMetrics,
        indexes: MetricIndexes,
    ) -> Self {
        debug_assert!(metadata.valid, "metrics attached to an invalid session");
        Self {
            metadata,
            metrics: Some(metrics),
            indexes: Some(indexes),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.metadata.valid
    }

    pub fn is_fully_processed(&self) -> bool {
        self.metrics.is_some() && self.indexes.is_some()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary::from(self)
    }
}

/// Compact listing view of a processed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(rename = "recordingSessionId")]
    pub recording_session_id: String,
    pub timestamp: String,
    pub valid: bool,
    pub quality_score: f64,
    pub quality_label: QualityLabel,
    pub tags: Vec<String>,
}

impl From<&SessionRecord> for SessionSummary {
    fn from(record: &SessionRecord) -> Self {
        let meta = &record.metadata;
        Self {
            recording_session_id: meta.recording_session_id.clone(),
            timestamp: meta.timestamp.clone(),
            valid: meta.valid,
            quality_score: meta.quality_score,
            quality_label: meta.quality_label,
            tags: meta.tags.clone(),
        }
    }
}

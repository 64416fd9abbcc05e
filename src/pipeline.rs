//! Pipeline orchestration
//!
//! This module provides the public API for HRV Flux.
//! It orchestrates one session from raw input to the final record.

use crate::adapter::{parse_timestamp, SessionAdapter};
use crate::config::PipelineConfig;
use crate::encoder::RecordEncoder;
use crate::error::ComputeError;
use crate::indexes::build_metric_indexes;
use crate::metrics::MetricsEngine;
use crate::types::{RawSessionInput, SessionMetadata, SessionRecord};
use crate::validator::Validator;
use tracing::{debug, info, warn};

/// Convert one raw session JSON payload into an encoded response.
///
/// # Arguments
/// * `raw_json` - Session payload as received from the device
///
/// # Returns
/// Response envelope JSON carrying the session record
///
/// # Example
/// ```ignore
/// let response = process_session_json(session_json)?;
/// ```
pub fn process_session_json(raw_json: String) -> Result<String, ComputeError> {
    let input = SessionAdapter::parse(&raw_json)?;
    let processor = SessionProcessor::default();
    let (_, record) = processor.process(&input)?;
    RecordEncoder::new().encode_to_json(&record)
}

/// Session processor holding immutable pipeline configuration.
///
/// Pipeline stages:
/// 1. Validator - Gate, filter and score the raw intervals
/// 2. MetricsEngine - Time- and frequency-domain metrics (valid sessions only)
/// 3. Index builder - Group metrics into interpretive categories
/// 4. Record assembly
///
/// A processor holds no per-session state and can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct SessionProcessor {
    validator: Validator,
    engine: MetricsEngine,
}

impl SessionProcessor {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            validator: Validator::new(config.validation),
            engine: MetricsEngine::new(config.spectral),
        }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Process one session.
    ///
    /// Returns the validity verdict with the assembled record. An invalid
    /// session is not an error: it yields a metadata-only record. Errors come
    /// only from metric computation on a valid session.
    pub fn process(
        &self,
        input: &RawSessionInput,
    ) -> Result<(bool, SessionRecord), ComputeError> {
        let session = input.recording_session_id.as_str();

        let recorded_at = parse_timestamp(&input.timestamp);
        if recorded_at.is_none() {
            warn!(
                session,
                timestamp = %input.timestamp,
                "unparseable session timestamp"
            );
        }

        // Stage 1: Validate
        let outcome = self.validator.validate(input);
        let metadata = SessionMetadata::new(input, recorded_at, &outcome.result);
        let valid = outcome.result.valid;

        if !valid {
            info!(
                session,
                valid,
                reason = outcome.result.reason.as_deref().unwrap_or(""),
                "session rejected"
            );
            return Ok((false, SessionRecord::metadata_only(metadata)));
        }

        if outcome.cleaned.is_empty() {
            debug!(session, "no cleaned intervals, skipping metrics");
            return Ok((true, SessionRecord::metadata_only(metadata)));
        }

        // Stage 2: Metrics
        let metrics = self
            .engine
            .compute(&outcome.cleaned, input, &outcome.result)
            .map_err(|e| {
                warn!(session, error = %e, "metric computation failed");
                e
            })?;

        // Stage 3: Indexes
        let indexes = build_metric_indexes(&metrics);
        debug!(session, categories = indexes.len(), "indexes built");

        info!(
            session,
            valid,
            quality_score = outcome.result.quality_score,
            quality_label = outcome.result.quality_label.as_str(),
            "session processed"
        );

        // Stage 4: Record
        Ok((true, SessionRecord::processed(metadata, metrics, indexes)))
    }
}

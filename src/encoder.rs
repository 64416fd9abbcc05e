//! Response encoding
//!
//! This module wraps session records into the response envelope consumers of
//! the session API read: a status, a human-readable message, the record itself
//! and producer provenance.

use crate::error::ComputeError;
use crate::types::SessionRecord;
use crate::{FLUX_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// Message attached to a valid, fully processed session
pub const SUCCESS_MESSAGE: &str = "Session processed successfully";

/// Prefix of the message attached to an invalid session
pub const INVALID_MESSAGE_PREFIX: &str = "Invalid HRV session";

/// Outcome reported in the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Response envelope around one session record
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse<'a> {
    pub status: ResponseStatus,
    pub message: String,
    /// `None` when processing failed before a record existed
    pub data: Option<&'a SessionRecord>,
    pub producer: Producer,
    pub computed_at_utc: String,
}

/// Encoder for producing response envelopes
pub struct RecordEncoder {
    instance_id: String,
}

impl Default for RecordEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Wrap a record; status follows the record's validity
    pub fn encode<'a>(&self, record: &'a SessionRecord) -> SessionResponse<'a> {
        let (status, message) = if record.is_valid() {
            (ResponseStatus::Success, SUCCESS_MESSAGE.to_string())
        } else {
            let reason = record.metadata.reason.as_deref().unwrap_or("unknown");
            (
                ResponseStatus::Error,
                format!("{INVALID_MESSAGE_PREFIX}: {reason}"),
            )
        };

        SessionResponse {
            status,
            message,
            data: Some(record),
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
        }
    }

    /// Error envelope for a session whose processing failed
    pub fn encode_failure(&self, session_id: &str, error: &ComputeError) -> SessionResponse<'static> {
        SessionResponse {
            status: ResponseStatus::Error,
            message: format!("Failed to process session {session_id}: {error}"),
            data: None,
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(&self, record: &SessionRecord) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(&self.encode(record)).map_err(ComputeError::JsonError)
    }

    fn producer(&self) -> Producer {
        Producer {
            name: PRODUCER_NAME.to_string(),
            version: FLUX_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        DeviceInfo, FilterMethod, QualityLabel, RawSessionInput, SessionMetadata,
        ValidationResult,
    };
    use pretty_assertions::assert_eq;

    fn make_record(valid: bool, reason: Option<&str>) -> SessionRecord {
        let input = RawSessionInput {
            user_id: "user@example.com".to_string(),
            device_info: DeviceInfo::default(),
            recording_session_id: "enc-1".to_string(),
            timestamp: "2025-03-25T23:10:00Z".to_string(),
            rr_intervals: vec![500; 10],
            heart_rate: None,
            motion_artifacts: false,
            tags: vec!["Rest".to_string()],
        };
        let validation = ValidationResult {
            valid,
            reason: reason.map(str::to_string),
            quality_score: 1.0,
            quality_label: QualityLabel::Excellent,
            filter_method: FilterMethod::Zscore,
            outlier_count: 0,
            valid_rr_percentage: 100.0,
        };
        SessionRecord::metadata_only(SessionMetadata::new(&input, None, &validation))
    }

    #[test]
    fn test_encode_invalid_session() {
        let record = make_record(false, Some("Too few valid RR intervals"));
        let encoder = RecordEncoder::with_instance_id("test-instance".to_string());
        let response = encoder.encode(&record);

        assert_eq!(response.status, ResponseStatus::Error);
        assert_eq!(
            response.message,
            "Invalid HRV session: Too few valid RR intervals"
        );
        assert_eq!(response.producer.name, PRODUCER_NAME);
        assert_eq!(response.producer.version, FLUX_VERSION);
        assert_eq!(response.producer.instance_id, "test-instance");
    }

    #[test]
    fn test_encode_valid_session() {
        let record = make_record(true, None);
        let encoder = RecordEncoder::new();
        let response = encoder.encode(&record);

        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.message, SUCCESS_MESSAGE);
        assert_eq!(response.producer.instance_id, encoder.instance_id());
        assert_ne!(encoder.instance_id(), RecordEncoder::new().instance_id());
    }

    #[test]
    fn test_encode_to_json() {
        let record = make_record(false, Some("Motion artifact detected"));
        let json = RecordEncoder::new().encode_to_json(&record).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["status"], "error");
        assert_eq!(parsed["data"]["metadata"]["recordingSessionId"], "enc-1");
        assert!(parsed["data"].get("metrics").is_none());
        assert!(parsed.get("producer").is_some());
        assert!(parsed.get("computed_at_utc").is_some());
    }

    #[test]
    fn test_encode_failure() {
        let error = ComputeError::InsufficientSamples {
            required: 30,
            actual: 12,
        };
        let response = RecordEncoder::new().encode_failure("enc-2", &error);

        assert_eq!(response.status, ResponseStatus::Error);
        assert!(response.data.is_none());
        assert!(response.message.starts_with("Failed to process session enc-2"));
    }
}

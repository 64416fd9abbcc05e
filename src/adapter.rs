//! Session payload adapter
//!
//! Parses session JSON as a single object, an array of objects or NDJSON, and
//! rejects payloads whose identity fields are blank.

use crate::error::ComputeError;
use crate::types::RawSessionInput;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Adapter for session payloads
pub struct SessionAdapter;

impl SessionAdapter {
    /// Parse one session object
    pub fn parse(json: &str) -> Result<RawSessionInput, ComputeError> {
        let input: RawSessionInput = serde_json::from_str(json)?;
        check_required(&input)?;
        Ok(input)
    }

    /// Parse a JSON string containing an array of sessions
    pub fn parse_array(json: &str) -> Result<Vec<RawSessionInput>, ComputeError> {
        let inputs: Vec<RawSessionInput> = serde_json::from_str(json)?;
        for (idx, input) in inputs.iter().enumerate() {
            check_required(input).map_err(|e| {
                ComputeError::ParseError(format!("Session {} is incomplete: {}", idx, e))
            })?;
        }
        Ok(inputs)
    }

    /// Parse NDJSON (newline-delimited JSON), one session per line
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawSessionInput>, ComputeError> {
        let mut inputs = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match Self::parse(trimmed) {
                Ok(input) => inputs.push(input),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(inputs)
    }

    /// Parse whichever layout the text uses
    ///
    /// A leading `[` selects array parsing. Otherwise a document that parses as
    /// one object is a single session, and anything else is read as NDJSON.
    pub fn parse_any(text: &str) -> Result<Vec<RawSessionInput>, ComputeError> {
        let trimmed = text.trim_start();
        if trimmed.starts_with('[') {
            return Self::parse_array(trimmed);
        }
        match Self::parse(trimmed) {
            Ok(input) => Ok(vec![input]),
            Err(ComputeError::JsonError(_)) => Self::parse_ndjson(trimmed),
            Err(e) => Err(e),
        }
    }
}

fn check_required(input: &RawSessionInput) -> Result<(), ComputeError> {
    if input.recording_session_id.trim().is_empty() {
        return Err(ComputeError::MissingField("recordingSessionId".to_string()));
    }
    if input.user_id.trim().is_empty() {
        return Err(ComputeError::MissingField("user_id".to_string()));
    }
    if input.timestamp.trim().is_empty() {
        return Err(ComputeError::MissingField("timestamp".to_string()));
    }
    Ok(())
}

/// Parse an ISO-8601 session timestamp
///
/// Accepts RFC 3339 (with `Z` or an offset) and naive date-times, which are
/// taken as UTC. Returns `None` for anything else.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session_json(id: &str) -> String {
        format!(
            r#"{{"user_id":"user@example.com","recordingSessionId":"{id}","timestamp":"2025-03-25T23:10:00Z","rrIntervals":[800,810,805]}}"#
        )
    }

    #[test]
    fn test_parse_single() {
        let input = SessionAdapter::parse(&session_json("s-1")).unwrap();
        assert_eq!(input.recording_session_id, "s-1");
        assert_eq!(input.rr_intervals, vec![800, 810, 805]);
    }

    #[test]
    fn test_parse_missing_rr_intervals() {
        let json = r#"{"user_id":"u","recordingSessionId":"s","timestamp":"t"}"#;
        assert!(matches!(
            SessionAdapter::parse(json),
            Err(ComputeError::JsonError(_))
        ));
    }

    #[test]
    fn test_parse_blank_session_id() {
        let result = SessionAdapter::parse(&session_json("  "));
        match result {
            Err(ComputeError::MissingField(field)) => assert_eq!(field, "recordingSessionId"),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_array() {
        let json = format!("[{},{}]", session_json("a"), session_json("b"));
        let inputs = SessionAdapter::parse_array(&json).unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[1].recording_session_id, "b");
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = format!("{}\n\n{}\n", session_json("a"), session_json("b"));
        let inputs = SessionAdapter::parse_ndjson(&ndjson).unwrap();
        assert_eq!(inputs.len(), 2);
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = format!("{}\n{{not json}}\n", session_json("a"));
        let err = SessionAdapter::parse_ndjson(&ndjson).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn test_parse_any_layouts() {
        let single = session_json("a");
        let array = format!("[{}]", session_json("a"));
        let ndjson = format!("{}\n{}", session_json("a"), session_json("b"));

        assert_eq!(SessionAdapter::parse_any(&single).unwrap().len(), 1);
        assert_eq!(SessionAdapter::parse_any(&array).unwrap().len(), 1);
        assert_eq!(SessionAdapter::parse_any(&ndjson).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_timestamp() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 25, 23, 10, 0).unwrap();

        assert_eq!(parse_timestamp("2025-03-25T23:10:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-26T00:10:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-25T23:10:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }
}

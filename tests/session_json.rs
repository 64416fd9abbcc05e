//! JSON-in/JSON-out tests over the demo payloads.

use hrv_flux::{
    process_session_json, IndexCategory, PipelineConfig, SessionAdapter, SessionProcessor,
};
use pretty_assertions::assert_eq;
use serde_json::Value;

const SAMPLE_SESSION: &str = include_str!("../demos/sample_session.json");
const SESSIONS_NDJSON: &str = include_str!("../demos/sessions.ndjson");
const DEMO_CONFIG: &str = include_str!("../demos/hrv.toml");

#[test]
fn sample_session_response_shape() {
    let response = process_session_json(SAMPLE_SESSION.to_string()).unwrap();
    let value: Value = serde_json::from_str(&response).unwrap();

    assert_eq!(value["status"], "success");
    assert_eq!(value["message"], "Session processed successfully");
    assert_eq!(value["producer"]["name"], "hrv-flux");

    let data = &value["data"];
    assert_eq!(data["metadata"]["valid"], true);
    assert_eq!(data["metadata"]["quality_label"], "excellent");
    assert_eq!(data["metadata"]["device_info"]["firmwareVersion"], "2.1.9");
    assert_eq!(data["metadata"]["tags"], serde_json::json!(["Sleep"]));

    let metrics = &data["metrics"];
    for key in ["mean_rr", "sdnn", "rmssd", "pnn50", "cv_rr", "lfPower", "hfPower", "lfHfRatio"] {
        assert!(metrics[key].is_number(), "{key} missing");
    }
    assert_eq!(metrics["rr_count"], 50);
    assert_eq!(metrics["heartRate"], 74);
    assert_eq!(metrics["filter_method"], "zscore");

    let indexes = data["indexes"].as_object().unwrap();
    assert_eq!(indexes.len(), 9);
    for category in IndexCategory::ALL {
        let entry = &indexes[category.as_str()];
        assert_eq!(entry["Interpretation"], category.interpretation());
    }
    assert_eq!(
        indexes["Parasympathetic indicators"]["rmssd"],
        metrics["rmssd"]
    );
}

#[test]
fn invalid_sessions_from_ndjson() {
    let sessions = SessionAdapter::parse_ndjson(SESSIONS_NDJSON).unwrap();
    assert_eq!(sessions.len(), 2);

    let processor = SessionProcessor::default();
    let reasons: Vec<String> = sessions
        .iter()
        .map(|s| {
            let (valid, record) = processor.process(s).unwrap();
            assert!(!valid);
            assert!(record.metrics.is_none());
            assert!(record.indexes.is_none());
            record.metadata.reason.unwrap()
        })
        .collect();

    assert_eq!(reasons[0], "Too few valid RR intervals");
    assert_eq!(reasons[1], "Motion artifact detected");
}

#[test]
fn invalid_record_omits_metrics_keys() {
    let sessions = SessionAdapter::parse_ndjson(SESSIONS_NDJSON).unwrap();
    let (_, record) = SessionProcessor::default().process(&sessions[0]).unwrap();

    let value = serde_json::to_value(&record).unwrap();
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["metadata"]);
}

#[test]
fn demo_config_drives_filter_method() {
    let config = PipelineConfig::from_toml_str(DEMO_CONFIG).unwrap();
    let processor = SessionProcessor::new(config);
    let input = SessionAdapter::parse(SAMPLE_SESSION).unwrap();

    let (valid, record) = processor.process(&input).unwrap();
    assert!(valid);
    assert_eq!(record.metadata.filter_method.as_str(), "iqr");
    assert_eq!(record.metrics.unwrap().filter_method.as_str(), "iqr");
}

#[test]
fn summary_matches_listing_shape() {
    let input = SessionAdapter::parse(SAMPLE_SESSION).unwrap();
    let (_, record) = SessionProcessor::default().process(&input).unwrap();

    let value = serde_json::to_value(record.summary()).unwrap();
    assert_eq!(value["recordingSessionId"], "Ashkan_sample_session_001");
    assert_eq!(value["valid"], true);
    assert_eq!(value["quality_score"], 1.0);
    assert_eq!(value["tags"], serde_json::json!(["Sleep"]));
}

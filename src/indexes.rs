//! Metric indexes
//!
//! Groups session metrics into nine fixed interpretive categories. Category
//! membership and interpretation texts are static tables.

use crate::types::SessionMetrics;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Fallback text for labels outside the interpretation table
pub const NO_INTERPRETATION: &str = "No interpretation available.";

/// Key under which each serialized entry carries its interpretation
pub const INTERPRETATION_KEY: &str = "Interpretation";

/// Interpretive category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexCategory {
    Parasympathetic,
    Sympathetic,
    AutonomicBalance,
    Respiratory,
    GeneralCapacity,
    SignalQuality,
    CognitiveLoad,
    Fatigue,
    Circadian,
}

impl IndexCategory {
    /// Every category, in output order
    pub const ALL: [IndexCategory; 9] = [
        IndexCategory::Parasympathetic,
        IndexCategory::Sympathetic,
        IndexCategory::AutonomicBalance,
        IndexCategory::Respiratory,
        IndexCategory::GeneralCapacity,
        IndexCategory::SignalQuality,
        IndexCategory::CognitiveLoad,
        IndexCategory::Fatigue,
        IndexCategory::Circadian,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexCategory::Parasympathetic => "Parasympathetic indicators",
            IndexCategory::Sympathetic => "Sympathetic influence",
            IndexCategory::AutonomicBalance => "Autonomic balance",
            IndexCategory::Respiratory => "Respiratory-linked",
            IndexCategory::GeneralCapacity => "General HRV capacity",
            IndexCategory::SignalQuality => "Signal Quality & Validity",
            IndexCategory::CognitiveLoad => "Cognitive / Mental Load",
            IndexCategory::Fatigue => "Fatigue / Exhaustion",
            IndexCategory::Circadian => "Circadian patterning",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == label)
    }

    /// Metrics grouped under this category, in output order
    pub fn metric_keys(&self) -> &'static [MetricKey] {
        use MetricKey::*;
        match self {
            IndexCategory::Parasympathetic => &[Rmssd, Pnn50, HfPower],
            IndexCategory::Sympathetic => &[LfPower, LfHfRatio, Rmssd],
            IndexCategory::AutonomicBalance => &[Sdnn, LfHfRatio, CvRr, MeanRr],
            IndexCategory::Respiratory => &[HfPower, BreathingRate],
            IndexCategory::GeneralCapacity => &[Sdnn, CvRr, Rmssd, Pnn50],
            IndexCategory::SignalQuality => &[
                RrCount,
                MeanRr,
                MotionArtifacts,
                ValidRrPercentage,
                QualityScore,
                OutlierCount,
                FilterMethod,
            ],
            IndexCategory::CognitiveLoad => &[HeartRate, Rmssd, LfPower, LfHfRatio],
            IndexCategory::Fatigue => &[Rmssd, Sdnn, MeanRr, QualityScore, RrCount],
            IndexCategory::Circadian => &[MeanRr, HfPower, BreathingRate, HeartRate],
        }
    }

    pub fn interpretation(&self) -> &'static str {
        match self {
            IndexCategory::Parasympathetic => {
                "Captures parasympathetic (vagal) nervous system activity. Reflects your body's \
                 ability to rest, recover, and relax. Higher values mean stronger vagal tone, \
                 emotional regulation, and recovery capacity."
            }
            IndexCategory::Sympathetic => {
                "Reflects stress response or mental load. Increased LF activity, LF/HF ratio, \
                 and lower RMSSD suggest elevated sympathetic drive or arousal."
            }
            IndexCategory::AutonomicBalance => {
                "Shows coordination between sympathetic and parasympathetic systems. Helps \
                 track recovery status or chronic imbalance."
            }
            IndexCategory::Respiratory => {
                "Highlights breath-driven vagal modulation. Useful for detecting relaxed \
                 states, meditation, or sleep-linked variability."
            }
            IndexCategory::GeneralCapacity => {
                "Represents overall variability strength \u{2014} how resilient and adaptable \
                 your nervous system is under stress and recovery."
            }
            IndexCategory::SignalQuality => {
                "Assesses trust in data \u{2014} based on signal cleanliness, completeness, and \
                 detection accuracy. Helps flag unreliable sessions."
            }
            IndexCategory::CognitiveLoad => {
                "Estimates mental strain, focus demand, or executive processing load \u{2014} \
                 useful for tracking attention, alertness, or stress."
            }
            IndexCategory::Fatigue => {
                "Captures patterns of recovery depletion \u{2014} especially post-exertion, \
                 stress, or low sleep. Useful for pacing and recovery timing."
            }
            IndexCategory::Circadian => {
                "Tracks daily HRV rhythm and alignment with biological clocks. Useful for \
                 spotting disruption, irregular rest, or phase shifts."
            }
        }
    }
}

/// Interpretation text for a category label
pub fn interpret(label: &str) -> &'static str {
    IndexCategory::from_label(label)
        .map(|c| c.interpretation())
        .unwrap_or(NO_INTERPRETATION)
}

/// Metric names as they appear in serialized indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKey {
    MeanRr,
    Sdnn,
    Rmssd,
    Pnn50,
    CvRr,
    RrCount,
    LfPower,
    HfPower,
    LfHfRatio,
    BreathingRate,
    HeartRate,
    MotionArtifacts,
    ValidRrPercentage,
    QualityScore,
    OutlierCount,
    FilterMethod,
}

impl MetricKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::MeanRr => "mean_rr",
            MetricKey::Sdnn => "sdnn",
            MetricKey::Rmssd => "rmssd",
            MetricKey::Pnn50 => "pnn50",
            MetricKey::CvRr => "cv_rr",
            MetricKey::RrCount => "rr_count",
            MetricKey::LfPower => "lfPower",
            MetricKey::HfPower => "hfPower",
            MetricKey::LfHfRatio => "lfHfRatio",
            MetricKey::BreathingRate => "breathingRate",
            MetricKey::HeartRate => "heartRate",
            MetricKey::MotionArtifacts => "motionArtifacts",
            MetricKey::ValidRrPercentage => "valid_rr_percentage",
            MetricKey::QualityScore => "quality_score",
            MetricKey::OutlierCount => "outlier_count",
            MetricKey::FilterMethod => "filter_method",
        }
    }

    /// Read this metric from a session
    pub fn value_of(&self, m: &SessionMetrics) -> MetricValue {
        match self {
            MetricKey::MeanRr => MetricValue::Number(m.mean_rr),
            MetricKey::Sdnn => MetricValue::Number(m.sdnn),
            MetricKey::Rmssd => MetricValue::Number(m.rmssd),
            MetricKey::Pnn50 => MetricValue::Number(m.pnn50),
            MetricKey::CvRr => MetricValue::Number(m.cv_rr),
            MetricKey::RrCount => MetricValue::Count(m.rr_count as i64),
            MetricKey::LfPower => MetricValue::Number(m.lf_power),
            MetricKey::HfPower => MetricValue::Number(m.hf_power),
            MetricKey::LfHfRatio => MetricValue::Number(m.lf_hf_ratio),
            MetricKey::BreathingRate => m
                .breathing_rate
                .map(MetricValue::Number)
                .unwrap_or(MetricValue::Missing),
            MetricKey::HeartRate => m
                .heart_rate
                .map(MetricValue::Count)
                .unwrap_or(MetricValue::Missing),
            MetricKey::MotionArtifacts => MetricValue::Flag(m.motion_artifacts),
            MetricKey::ValidRrPercentage => MetricValue::Number(m.valid_rr_percentage),
            MetricKey::QualityScore => MetricValue::Number(m.quality_score),
            MetricKey::OutlierCount => MetricValue::Count(m.outlier_count as i64),
            MetricKey::FilterMethod => MetricValue::Text(m.filter_method.as_str()),
        }
    }
}

/// A metric value inside an index entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Count(i64),
    Flag(bool),
    Text(&'static str),
    /// Serialized as `null`
    Missing,
}

/// One category with its metric values and interpretation
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub category: IndexCategory,
    pub values: Vec<(MetricKey, MetricValue)>,
    pub interpretation: &'static str,
}

impl IndexEntry {
    pub fn get(&self, key: MetricKey) -> Option<MetricValue> {
        self.values
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }
}

impl Serialize for IndexEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        for (key, value) in &self.values {
            map.serialize_entry(key.as_str(), value)?;
        }
        map.serialize_entry(INTERPRETATION_KEY, self.interpretation)?;
        map.end()
    }
}

/// All nine category entries for a session
#[derive(Debug, Clone, PartialEq)]
pub struct MetricIndexes {
    entries: Vec<IndexEntry>,
}

impl MetricIndexes {
    pub fn get(&self, category: IndexCategory) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.category == category)
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MetricIndexes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(entry.category.as_str(), entry)?;
        }
        map.end()
    }
}

/// Build every category entry from session metrics
pub fn build_metric_indexes(metrics: &SessionMetrics) -> MetricIndexes {
    let entries = IndexCategory::ALL
        .iter()
        .map(|&category| IndexEntry {
            category,
            values: category
                .metric_keys()
                .iter()
                .map(|&key| (key, key.value_of(metrics)))
                .collect(),
            interpretation: interpret(category.as_str()),
        })
        .collect();

    MetricIndexes { entries }
}

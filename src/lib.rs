//! HRV Flux - Compute engine for heart rate variability sessions
//!
//! Flux turns one recording session of RR intervals into a validated, quantified
//! HRV record through a deterministic pipeline: validation → time- and
//! frequency-domain metrics → interpretive indexes → session record.
//!
//! ## Modules
//!
//! - **Validator**: Motion gate, range filter, statistical outlier removal and quality scoring
//! - **Metrics**: Time-domain statistics and Welch spectral analysis
//! - **Indexes**: Nine physiological categories with static interpretations

pub mod adapter;
pub mod config;
pub mod encoder;
pub mod error;
pub mod indexes;
pub mod metrics;
pub mod pipeline;
pub mod spectral;
pub mod types;
pub mod validator;

pub use adapter::SessionAdapter;
pub use config::PipelineConfig;
pub use encoder::RecordEncoder;
pub use error::ComputeError;
pub use indexes::{build_metric_indexes, IndexCategory, MetricIndexes};
pub use metrics::MetricsEngine;
pub use pipeline::{process_session_json, SessionProcessor};
pub use types::{RawSessionInput, SessionRecord, ValidationResult};
pub use validator::Validator;

/// Flux version embedded in all responses
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for responses
pub const PRODUCER_NAME: &str = "hrv-flux";

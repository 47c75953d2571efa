//! # RuVector Vitals
//!
//! Streaming instability sensing for bedside vital signs. Each sample flows
//! through four layers:
//!
//! - **Topology**: a sliding time-delay embedding is randomly projected into
//!   a small space, and the shape of the rolling point cloud is scored with
//!   persistent homology. A stable patient traces a tight cluster; a
//!   deteriorating one traces loops and spread.
//! - **Physics**: heart rate and mean arterial pressure are checked against
//!   each other through cardiac output and vascular resistance, so that
//!   sensor artifacts are vetoed instead of being mistaken for pathology.
//! - **Fusion**: shape and physics combine through a monotone spline into a
//!   bounded risk with a human-readable explanation.
//! - **Alerting**: a deterministic fast path decides every sample, a
//!   stabilizer latches escalations against flicker, and an optional
//!   inference backend runs slower deep analyses on its own thread.
//!
//! ## Example
//!
//! ```rust
//! use ruvector_vitals::{AlertLevel, TriagePipeline, VitalsConfig, VitalsSample};
//!
//! let mut pipeline = TriagePipeline::new(VitalsConfig::default()).unwrap();
//!
//! for t in 0..80 {
//!     let sample = VitalsSample::new(t as f64, 75.0, 90.0, 98.0, 37.0, 16.0).unwrap();
//!     let outcome = pipeline.process(&sample).unwrap();
//!     assert_eq!(outcome.alert.decision.level, AlertLevel::Stable);
//! }
//!
//! // A pressure no human can have is a sensor problem, not a diagnosis.
//! let artifact = VitalsSample::new(80.0, 75.0, 350.0, 98.0, 37.0, 16.0).unwrap();
//! let outcome = pipeline.process(&artifact).unwrap();
//! assert_eq!(outcome.alert.decision.level, AlertLevel::SensorConcern);
//! ```
//!
//! Deep analysis is off the sample path. Plug a model in through
//! [`InferenceBackend`] and [`TriagePipeline::with_backend`]; results are
//! picked up on later samples and shown while fresh.

#![warn(missing_debug_implementations)]

pub mod alert;
pub mod analysis;
pub mod config;
pub mod error;
pub mod fusion;
pub mod physics;
pub mod pipeline;
pub mod sample;
pub mod topology;

pub use alert::{
    AlertDecision, AlertLevel, AlertStabilizer, FastPathPolicy, Provenance, StableAlert,
    DISCLAIMER,
};
pub use analysis::{
    AnalysisRequest, DeepAnalysisCoordinator, DeepAnalysisResult, InferenceBackend,
    NoopBackend, SharedBackend, TriggerReason, TriggerState,
};
pub use config::{
    AlertConfig, AnalysisConfig, FusionConfig, PhysicsConfig, TopologyConfig, VitalsConfig,
};
pub use error::{Result, VitalsError};
pub use fusion::{MonotoneSpline, RiskAssessment, RiskFusion};
pub use physics::{PhysicsResult, PhysicsValidator};
pub use pipeline::{PipelineStats, SampleOutcome, TriagePipeline};
pub use sample::{VitalsSample, CHANNELS, CHANNEL_NAMES};
pub use topology::{ShapeReading, TopologicalSensor};

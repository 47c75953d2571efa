//! Asynchronous deep analysis.
//!
//! An [`InferenceBackend`] is consulted off the sample path when risk is high
//! or an operator asks for it. At most one request is in flight; results are
//! picked up by polling and fed to the alert stabilizer as a
//! [`TriggerState`] snapshot.

pub mod backend;
pub mod coordinator;
pub mod prompt;

pub use backend::{InferenceBackend, NoopBackend, SharedBackend};
pub use coordinator::{DeepAnalysisCoordinator, DeepAnalysisResult, TriggerReason, TriggerState};
pub use prompt::{
    build_prompt, json_objects, parse_response, strip_echo, AnalysisPayload, AnalysisRequest,
};

//! Inference backend abstraction.
//!
//! The coordinator only needs "prompt in, text out". Model loading, device
//! selection and generation parameters belong to the implementation.

use std::sync::Arc;

use crate::error::{Result, VitalsError};

/// A text model that can be asked for a clinical recommendation.
///
/// Implementations are called from the deep-analysis worker thread, one
/// request at a time. `infer` may block for as long as it needs.
///
/// # Example
///
/// ```rust,ignore
/// use ruvector_vitals::analysis::InferenceBackend;
///
/// struct Canned;
///
/// impl InferenceBackend for Canned {
///     fn model_id(&self) -> &str { "canned" }
///     fn infer(&self, _prompt: &str) -> ruvector_vitals::Result<String> {
///         Ok(r#"{"recommendation": "Repeat lactate", "alert_level": "ORANGE"}"#.into())
///     }
/// }
/// ```
pub trait InferenceBackend: Send + Sync {
    /// Identifier recorded in [`Provenance::DeepAnalysis`](crate::Provenance).
    fn model_id(&self) -> &str;

    /// Generate a completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`VitalsError::Backend`] when the model is unavailable or
    /// generation fails. The coordinator turns this into a fallback decision.
    fn infer(&self, prompt: &str) -> Result<String>;
}

/// Shared backend handle.
pub type SharedBackend = Arc<dyn InferenceBackend>;

/// Placeholder used when no model is wired in. Every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBackend;

impl InferenceBackend for NoopBackend {
    fn model_id(&self) -> &str {
        "noop"
    }

    fn infer(&self, _prompt: &str) -> Result<String> {
        Err(VitalsError::Backend(
            "No inference backend configured.".to_string(),
        ))
    }
}

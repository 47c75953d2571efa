//! Error types for ruvector-vitals
//!
//! Only contract violations surface here. Impossible physiology, warm-up and
//! deep-analysis failures are ordinary data and travel through
//! [`PhysicsResult`](crate::PhysicsResult), [`ShapeReading`](crate::ShapeReading)
//! and [`Provenance`](crate::Provenance) instead.

use thiserror::Error;

/// Result type alias for vitals operations
pub type Result<T> = std::result::Result<T, VitalsError>;

/// Main error type for the vitals pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VitalsError {
    /// A sample carried a non-finite channel value
    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    /// Vector length did not match what the component was built for
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Samples must arrive in non-decreasing timestamp order
    #[error("Out-of-order sample: timestamp {timestamp} precedes {previous}")]
    OutOfOrder { previous: f64, timestamp: f64 },

    /// `transform` was called before the projector was fit
    #[error("Projector has not been fit")]
    ProjectorNotFitted,

    /// `fit` was called a second time
    #[error("Projector is already fit; refitting would break comparability")]
    ProjectorAlreadyFitted,

    /// Configuration rejected at construction time
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Spline coefficients decrease somewhere
    #[error("Non-monotonic curve: coefficient {index} ({value}) is below its predecessor ({previous})")]
    NonMonotonicCurve {
        index: usize,
        previous: f64,
        value: f64,
    },

    /// Inference backend failure (recovered inside the coordinator)
    #[error("Backend error: {0}")]
    Backend(String),

    /// The deep-analysis worker could not be started or has gone away
    #[error("Worker error: {0}")]
    Worker(String),
}

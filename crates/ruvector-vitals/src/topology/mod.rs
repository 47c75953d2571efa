//! Topological shape sensing over a sliding window of vitals.
//!
//! [`EmbeddingBuffer`] turns the last W samples into one flattened vector,
//! [`Projector`] maps it into a small fixed space, [`PointCloudStore`] keeps
//! the last C projected points and [`TopologicalScorer`] summarizes the
//! cloud's shape. [`TopologicalSensor`] chains the four.

pub mod cloud;
pub mod embedding;
pub mod persistence;
pub mod projection;
pub mod sensor;

pub use cloud::{PointCloudStore, ShapeReading};
pub use embedding::EmbeddingBuffer;
pub use persistence::{Diagrams, PersistencePair, ShapeSummary, TopologicalScorer};
pub use projection::{ProjectedPoint, Projector};
pub use sensor::TopologicalSensor;

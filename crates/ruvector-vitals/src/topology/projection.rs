//! Fit-once sparse random projection
//!
//! Johnson–Lindenstrauss style dimensionality reduction from the embedding
//! space into a small feature space. The matrix is drawn exactly once, when
//! the first embedding arrives, and is never redrawn: points projected at
//! different times must live in the same space for cloud distances to mean
//! anything.
//!
//! # Properties
//!
//! - Sparse entries `±sqrt(1 / (density × output_dim))` with probability
//!   `density / 2` each, zero otherwise
//! - Density defaults to `1 / sqrt(input_dim)`
//! - Deterministic (seeded) for reproducibility
//!
//! # Performance
//!
//! - Time complexity: O(output_dim × input_dim × density) per transform
//! - Space complexity: O(output_dim × input_dim × density)

use std::sync::OnceLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VitalsError};

/// A point in the projected feature space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub coords: Vec<f64>,
}

impl ProjectedPoint {
    pub fn new(coords: Vec<f64>) -> Self {
        Self { coords }
    }

    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    /// Squared Euclidean distance to another point
    pub fn distance_squared(&self, other: &Self) -> f64 {
        self.coords
            .iter()
            .zip(&other.coords)
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// Drawn projection matrix, stored row-sparse (one row per output component).
#[derive(Debug, Clone)]
struct ProjectionMatrix {
    rows: Vec<Vec<(usize, f64)>>,
    input_dim: usize,
    density: f64,
}

impl ProjectionMatrix {
    fn draw(input_dim: usize, output_dim: usize, density: Option<f64>, seed: u64) -> Self {
        let density = density.unwrap_or_else(|| 1.0 / (input_dim as f64).sqrt());
        let magnitude = (1.0 / (density * output_dim as f64)).sqrt();
        let mut rng = StdRng::seed_from_u64(seed);

        let rows = (0..output_dim)
            .map(|_| {
                (0..input_dim)
                    .filter_map(|col| {
                        if rng.gen::<f64>() < density {
                            let sign = if rng.gen::<bool>() { 1.0 } else { -1.0 };
                            Some((col, sign * magnitude))
                        } else {
                            None
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            rows,
            input_dim,
            density,
        }
    }

    fn apply(&self, input: &[f64]) -> ProjectedPoint {
        let coords = self
            .rows
            .iter()
            .map(|row| row.iter().map(|&(col, w)| w * input[col]).sum())
            .collect();
        ProjectedPoint { coords }
    }
}

/// Fit-once projector from embedding vectors to [`ProjectedPoint`]s.
///
/// The single mutation (drawing the matrix) goes through a [`OnceLock`], so
/// it happens-before every transform even if the projector is shared.
#[derive(Debug)]
pub struct Projector {
    output_dim: usize,
    density: Option<f64>,
    seed: u64,
    matrix: OnceLock<ProjectionMatrix>,
}

impl Projector {
    /// Create an unfitted projector.
    ///
    /// # Arguments
    ///
    /// * `output_dim` - Projected dimension
    /// * `density` - Fraction of non-zero entries, `None` for `1/sqrt(input_dim)`
    /// * `seed` - Random seed for reproducibility
    pub fn new(output_dim: usize, density: Option<f64>, seed: u64) -> Result<Self> {
        if output_dim == 0 {
            return Err(VitalsError::InvalidConfig(
                "projection output dimension must be > 0".to_string(),
            ));
        }
        if let Some(d) = density {
            if !(d > 0.0 && d <= 1.0) {
                return Err(VitalsError::InvalidConfig(format!(
                    "projection density must be in (0, 1], got {}",
                    d
                )));
            }
        }
        Ok(Self {
            output_dim,
            density,
            seed,
            matrix: OnceLock::new(),
        })
    }

    /// Draw the projection matrix for the dimension of `embedding`.
    ///
    /// May only succeed once; a second call returns
    /// [`VitalsError::ProjectorAlreadyFitted`].
    pub fn fit(&self, embedding: &[f64]) -> Result<()> {
        if embedding.is_empty() {
            return Err(VitalsError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }
        let matrix = self.draw(embedding.len());
        self.matrix
            .set(matrix)
            .map_err(|_| VitalsError::ProjectorAlreadyFitted)
    }

    /// Fit on the first embedding ever seen, then transform.
    ///
    /// Later calls skip straight to [`transform`](Self::transform).
    pub fn fit_once(&self, embedding: &[f64]) -> Result<ProjectedPoint> {
        if embedding.is_empty() {
            return Err(VitalsError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }
        self.matrix.get_or_init(|| self.draw(embedding.len()));
        self.transform(embedding)
    }

    /// Project an embedding. Pure once fit.
    pub fn transform(&self, embedding: &[f64]) -> Result<ProjectedPoint> {
        let matrix = self.matrix.get().ok_or(VitalsError::ProjectorNotFitted)?;
        if embedding.len() != matrix.input_dim {
            return Err(VitalsError::DimensionMismatch {
                expected: matrix.input_dim,
                actual: embedding.len(),
            });
        }
        Ok(matrix.apply(embedding))
    }

    pub fn is_fitted(&self) -> bool {
        self.matrix.get().is_some()
    }

    /// Input dimension, once fit.
    pub fn input_dim(&self) -> Option<usize> {
        self.matrix.get().map(|m| m.input_dim)
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Effective density, once fit.
    pub fn density(&self) -> Option<f64> {
        self.matrix.get().map(|m| m.density)
    }

    fn draw(&self, input_dim: usize) -> ProjectionMatrix {
        debug!(
            input_dim,
            output_dim = self.output_dim,
            seed = self.seed,
            "fitting random projection"
        );
        ProjectionMatrix::draw(input_dim, self.output_dim, self.density, self.seed)
    }
}

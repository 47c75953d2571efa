//! Monotone risk fusion.
//!
//! ```text
//! risk = clip( w_shape · S(clip(shape, domain)) + w_physics · (1 − severity), 0, 1 )
//! ```
//!
//! `S` is a clamped B-spline whose control coefficients are checked to be
//! non-decreasing when the curve is built. A spline with non-decreasing
//! coefficients on a clamped knot vector is itself non-decreasing, so more
//! shape instability can never lower the shape term. With non-negative
//! weights, risk is non-decreasing in shape and non-increasing in severity.

use serde::{Deserialize, Serialize};

use crate::config::FusionConfig;
use crate::error::{Result, VitalsError};

/// Clamped B-spline with non-decreasing control coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct MonotoneSpline {
    knots: Vec<f64>,
    coefficients: Vec<f64>,
    degree: usize,
}

impl MonotoneSpline {
    /// Build a spline, rejecting any decrease in `coefficients`.
    ///
    /// `knots` must be non-decreasing with `coefficients.len() + degree + 1`
    /// entries and span a non-empty domain.
    pub fn new(knots: Vec<f64>, coefficients: Vec<f64>, degree: usize) -> Result<Self> {
        if coefficients.len() <= degree {
            return Err(VitalsError::InvalidConfig(format!(
                "spline needs more than {} coefficients, got {}",
                degree,
                coefficients.len()
            )));
        }
        if knots.len() != coefficients.len() + degree + 1 {
            return Err(VitalsError::DimensionMismatch {
                expected: coefficients.len() + degree + 1,
                actual: knots.len(),
            });
        }
        if knots.windows(2).any(|w| !(w[0] <= w[1])) {
            return Err(VitalsError::InvalidConfig(
                "spline knots must be non-decreasing".to_string(),
            ));
        }
        if !(knots[degree] < knots[coefficients.len()]) {
            return Err(VitalsError::InvalidConfig(
                "spline domain is empty".to_string(),
            ));
        }
        for (index, pair) in coefficients.windows(2).enumerate() {
            if !(pair[1] >= pair[0]) {
                return Err(VitalsError::NonMonotonicCurve {
                    index: index + 1,
                    previous: pair[0],
                    value: pair[1],
                });
            }
        }
        Ok(Self {
            knots,
            coefficients,
            degree,
        })
    }

    /// Clamped uniform spline whose coefficients sample a logistic curve
    /// centred on the domain midpoint, at the Greville abscissae.
    pub fn sigmoid(
        domain: (f64, f64),
        n_coefficients: usize,
        degree: usize,
        steepness: f64,
    ) -> Result<Self> {
        let (lo, hi) = domain;
        if n_coefficients <= degree {
            return Err(VitalsError::InvalidConfig(format!(
                "spline needs more than {} coefficients, got {}",
                degree, n_coefficients
            )));
        }
        let spans = (n_coefficients - degree) as f64;
        let mut knots = vec![lo; degree + 1];
        knots.extend((1..n_coefficients - degree).map(|j| lo + (hi - lo) * j as f64 / spans));
        knots.extend(std::iter::repeat(hi).take(degree + 1));

        let centre = 0.5 * (lo + hi);
        let coefficients = (0..n_coefficients)
            .map(|i| {
                let greville = knots[i + 1..=i + degree].iter().sum::<f64>() / degree.max(1) as f64;
                let x = if degree == 0 { knots[i] } else { greville };
                1.0 / (1.0 + (-(x - centre) * steepness).exp())
            })
            .collect();

        Self::new(knots, coefficients, degree)
    }

    /// Domain `[knots[degree], knots[n]]`.
    pub fn domain(&self) -> (f64, f64) {
        (self.knots[self.degree], self.knots[self.coefficients.len()])
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Evaluate with de Boor's algorithm; `x` is clamped to the domain.
    pub fn evaluate(&self, x: f64) -> f64 {
        let (lo, hi) = self.domain();
        let x = if x.is_nan() { lo } else { x.clamp(lo, hi) };
        let p = self.degree;
        let n = self.coefficients.len();
        let t = &self.knots;

        let mut span = p;
        while span < n - 1 && x >= t[span + 1] {
            span += 1;
        }

        let mut d: Vec<f64> = (0..=p).map(|j| self.coefficients[j + span - p]).collect();
        for r in 1..=p {
            for j in (r..=p).rev() {
                let left = t[j + span - p];
                let right = t[j + 1 + span - r];
                let alpha = if right > left {
                    (x - left) / (right - left)
                } else {
                    0.0
                };
                d[j] = (1.0 - alpha) * d[j - 1] + alpha * d[j];
            }
        }
        d[p]
    }
}

/// Fused risk for one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Risk probability in [0, 1].
    pub risk: f64,
    /// Symbolic form of the computation.
    pub explanation: String,
    pub shape_score: f64,
    pub physics_severity: f64,
    /// Value of the shape curve, before weighting.
    pub shape_term: f64,
}

/// Combines shape and physics scores into a bounded risk.
#[derive(Debug, Clone)]
pub struct RiskFusion {
    curve: MonotoneSpline,
    shape_weight: f64,
    physics_weight: f64,
}

impl RiskFusion {
    pub fn new(config: &FusionConfig) -> Result<Self> {
        config.validate()?;
        let curve = MonotoneSpline::sigmoid(
            config.shape_domain,
            config.spline_coefficients,
            config.spline_degree,
            config.sigmoid_steepness,
        )?;
        Self::with_curve(curve, config.shape_weight, config.physics_weight)
    }

    /// Use a custom curve. Weights must be non-negative and sum to 1.
    pub fn with_curve(curve: MonotoneSpline, shape_weight: f64, physics_weight: f64) -> Result<Self> {
        if shape_weight < 0.0
            || physics_weight < 0.0
            || ((shape_weight + physics_weight) - 1.0).abs() > 1e-9
        {
            return Err(VitalsError::InvalidConfig(format!(
                "fusion weights must be non-negative and sum to 1, got {} + {}",
                shape_weight, physics_weight
            )));
        }
        Ok(Self {
            curve,
            shape_weight,
            physics_weight,
        })
    }

    pub fn curve(&self) -> &MonotoneSpline {
        &self.curve
    }

    pub fn predict(&self, shape_score: f64, physics_severity: f64) -> RiskAssessment {
        let shape_term = self.curve.evaluate(shape_score);
        let severity = if physics_severity.is_nan() {
            0.0
        } else {
            physics_severity.clamp(0.0, 1.0)
        };
        let risk = (self.shape_weight * shape_term + self.physics_weight * (1.0 - severity))
            .clamp(0.0, 1.0);

        let explanation = format!(
            "Risk({:.2}) ~ {:.2}*Spline(Shape={:.2}) + {:.2}*(1 - Physics={:.2})",
            risk, self.shape_weight, shape_score, self.physics_weight, physics_severity
        );

        RiskAssessment {
            risk,
            explanation,
            shape_score,
            physics_severity,
            shape_term,
        }
    }
}

//! Rolling point cloud feeding the topological scorer.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::persistence::{ShapeSummary, TopologicalScorer};
use super::projection::ProjectedPoint;
use crate::error::{Result, VitalsError};

/// Output of the topological sensor for one sample.
///
/// `Calibrating` and `Ready` with a zero score are different things: the
/// former means "not enough history", the latter "genuinely no structure".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShapeReading {
    /// Not enough history yet.
    Calibrating { points: usize, required: usize },
    /// Cloud is large enough to be scored.
    Ready(ShapeSummary),
}

impl ShapeReading {
    /// Shape score, reported as 0 while calibrating.
    pub fn score(&self) -> f64 {
        match self {
            ShapeReading::Calibrating { .. } => 0.0,
            ShapeReading::Ready(summary) => summary.score(),
        }
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self, ShapeReading::Calibrating { .. })
    }

    pub fn summary(&self) -> Option<&ShapeSummary> {
        match self {
            ShapeReading::Ready(summary) => Some(summary),
            ShapeReading::Calibrating { .. } => None,
        }
    }

    /// Plain-language description used in deep-analysis prompts.
    pub fn describe(&self) -> String {
        match self {
            ShapeReading::Calibrating { points, required } => {
                format!("Calibrating ({}/{} points)", points, required)
            }
            ShapeReading::Ready(summary) if summary.score() > 2.0 => format!(
                "Exploding (radius {:.2}). Variance high.",
                summary.score()
            ),
            ShapeReading::Ready(summary) => format!("Stable (radius {:.2})", summary.score()),
        }
    }
}

/// FIFO of the most recent projected points.
#[derive(Debug, Clone)]
pub struct PointCloudStore {
    points: VecDeque<ProjectedPoint>,
    capacity: usize,
    calibration_min: usize,
}

impl PointCloudStore {
    pub fn new(capacity: usize, calibration_min: usize) -> Result<Self> {
        if capacity == 0 || calibration_min == 0 || calibration_min > capacity {
            return Err(VitalsError::InvalidConfig(format!(
                "point cloud needs 0 < calibration_min ({}) <= capacity ({})",
                calibration_min, capacity
            )));
        }
        Ok(Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
            calibration_min,
        })
    }

    /// Append a point, evicting the oldest past capacity.
    pub fn observe(&mut self, point: ProjectedPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// Score the current cloud, or report calibration progress.
    pub fn score(&self, scorer: &TopologicalScorer) -> ShapeReading {
        if !self.is_calibrated() {
            return ShapeReading::Calibrating {
                points: self.points.len(),
                required: self.calibration_min,
            };
        }
        let snapshot: Vec<ProjectedPoint> = self.points.iter().cloned().collect();
        ShapeReading::Ready(scorer.summarize(&snapshot))
    }

    pub fn is_calibrated(&self) -> bool {
        self.points.len() >= self.calibration_min
    }

    pub fn points(&self) -> impl Iterator<Item = &ProjectedPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn calibration_min(&self) -> usize {
        self.calibration_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(i: usize) -> ProjectedPoint {
        let t = i as f64 * 0.7;
        ProjectedPoint::new(vec![t.cos(), t.sin(), 0.01 * i as f64])
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(PointCloudStore::new(0, 0).is_err());
        assert!(PointCloudStore::new(10, 11).is_err());
        assert!(PointCloudStore::new(10, 0).is_err());
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let mut cloud = PointCloudStore::new(5, 3).unwrap();
        for i in 0..20 {
            cloud.observe(point(i));
            assert!(cloud.len() <= 5);
        }
        assert_eq!(cloud.len(), 5);
    }

    #[test]
    fn test_calibrating_until_minimum() {
        let scorer = TopologicalScorer::default();
        let mut cloud = PointCloudStore::new(8, 4).unwrap();
        for i in 0..3 {
            cloud.observe(point(i));
            let reading = cloud.score(&scorer);
            assert!(reading.is_calibrating());
            assert_eq!(reading.score(), 0.0);
        }
        for i in 3..30 {
            cloud.observe(point(i));
            assert!(!cloud.score(&scorer).is_calibrating());
        }
    }

    #[test]
    fn test_describe() {
        let calibrating = ShapeReading::Calibrating {
            points: 3,
            required: 30,
        };
        assert_eq!(calibrating.describe(), "Calibrating (3/30 points)");

        let summary = ShapeSummary {
            h0_amplitude: 1.0,
            h1_amplitude: 2.5,
            h1_features: 4,
            points: 50,
        };
        assert!(ShapeReading::Ready(summary).describe().starts_with("Exploding"));
        let calm = ShapeSummary {
            h1_amplitude: 0.3,
            ..summary
        };
        assert_eq!(ShapeReading::Ready(calm).describe(), "Stable (radius 0.30)");
    }
}

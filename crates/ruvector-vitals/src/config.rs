//! Configuration types for the vitals pipeline.
//!
//! Every stage has its own tuning block; [`VitalsConfig`] bundles them. All
//! time windows are expressed in the same unit as
//! [`VitalsSample::timestamp`](crate::VitalsSample::timestamp) (seconds).

use serde::{Deserialize, Serialize};

use crate::error::{Result, VitalsError};

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

/// Tuning parameters for the topological sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Number of samples in one time-delay embedding.
    pub window_size: usize,
    /// Dimension of the projected feature space.
    pub projection_dim: usize,
    /// Seed for the random projection matrix.
    pub projection_seed: u64,
    /// Fraction of non-zero projection entries. `None` uses `1/sqrt(input_dim)`.
    pub projection_density: Option<f64>,
    /// Maximum number of projected points kept in the cloud.
    pub cloud_capacity: usize,
    /// Points required before a shape score is reported.
    pub calibration_min: usize,
    /// Order of the p-norm used for diagram amplitudes.
    pub amplitude_order: f64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            projection_dim: 10,
            projection_seed: 42,
            projection_density: None,
            cloud_capacity: 50,
            calibration_min: 30,
            amplitude_order: 2.0,
        }
    }
}

impl TopologyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(VitalsError::InvalidConfig(
                "window_size must be > 0".to_string(),
            ));
        }
        if self.projection_dim == 0 {
            return Err(VitalsError::InvalidConfig(
                "projection_dim must be > 0".to_string(),
            ));
        }
        if let Some(density) = self.projection_density {
            if !(density > 0.0 && density <= 1.0) {
                return Err(VitalsError::InvalidConfig(format!(
                    "projection_density must be in (0, 1], got {}",
                    density
                )));
            }
        }
        if self.cloud_capacity < 2 {
            return Err(VitalsError::InvalidConfig(
                "cloud_capacity must be >= 2".to_string(),
            ));
        }
        if self.calibration_min < 2 || self.calibration_min > self.cloud_capacity {
            return Err(VitalsError::InvalidConfig(format!(
                "calibration_min must be in [2, {}], got {}",
                self.cloud_capacity, self.calibration_min
            )));
        }
        if !(self.amplitude_order >= 1.0) {
            return Err(VitalsError::InvalidConfig(format!(
                "amplitude_order must be >= 1, got {}",
                self.amplitude_order
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Physics
// ---------------------------------------------------------------------------

/// Hemodynamic constants and bounds for the physics validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Assumed stroke volume (mL/beat).
    pub stroke_volume_ml: f64,
    /// Physiologically possible heart rate range (bpm).
    pub heart_rate_bounds: (f64, f64),
    /// Physiologically possible mean arterial pressure range (mmHg).
    pub map_bounds: (f64, f64),
    /// Plausible systemic vascular resistance band (dyn·s/cm⁵). Outside it the
    /// reading is treated as a sensor artifact.
    pub resistance_band: (f64, f64),
    /// Resistance mapped to severity 0.
    pub severity_floor: f64,
    /// Resistance span over which severity rises from 0 to 1.
    pub severity_span: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            stroke_volume_ml: 70.0,
            heart_rate_bounds: (10.0, 300.0),
            map_bounds: (10.0, 300.0),
            resistance_band: (100.0, 5000.0),
            severity_floor: 400.0,
            severity_span: 600.0,
        }
    }
}

impl PhysicsConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.stroke_volume_ml > 0.0) {
            return Err(VitalsError::InvalidConfig(
                "stroke_volume_ml must be > 0".to_string(),
            ));
        }
        for (name, (lo, hi)) in [
            ("heart_rate_bounds", self.heart_rate_bounds),
            ("map_bounds", self.map_bounds),
            ("resistance_band", self.resistance_band),
        ] {
            if !(lo < hi) {
                return Err(VitalsError::InvalidConfig(format!(
                    "{} must satisfy low < high, got ({}, {})",
                    name, lo, hi
                )));
            }
        }
        if !(self.severity_span > 0.0) {
            return Err(VitalsError::InvalidConfig(
                "severity_span must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fusion
// ---------------------------------------------------------------------------

/// Shape curve and weighting for risk fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Domain the shape score is clipped to before evaluation.
    pub shape_domain: (f64, f64),
    /// Number of spline control coefficients.
    pub spline_coefficients: usize,
    /// Spline degree.
    pub spline_degree: usize,
    /// Slope of the sigmoid the coefficients are sampled from.
    pub sigmoid_steepness: f64,
    /// Weight of the shape-derived term.
    pub shape_weight: f64,
    /// Weight of the `(1 - physics_severity)` term.
    pub physics_weight: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            shape_domain: (0.0, 5.0),
            spline_coefficients: 12,
            spline_degree: 3,
            sigmoid_steepness: 2.0,
            shape_weight: 0.3,
            physics_weight: 0.7,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = self.shape_domain;
        if !(lo < hi) {
            return Err(VitalsError::InvalidConfig(format!(
                "shape_domain must satisfy low < high, got ({}, {})",
                lo, hi
            )));
        }
        if self.spline_coefficients <= self.spline_degree {
            return Err(VitalsError::InvalidConfig(format!(
                "spline_coefficients ({}) must exceed spline_degree ({})",
                self.spline_coefficients, self.spline_degree
            )));
        }
        if !(self.sigmoid_steepness > 0.0) {
            return Err(VitalsError::InvalidConfig(
                "sigmoid_steepness must be > 0".to_string(),
            ));
        }
        if self.shape_weight < 0.0 || self.physics_weight < 0.0 {
            return Err(VitalsError::InvalidConfig(
                "fusion weights must be non-negative".to_string(),
            ));
        }
        if ((self.shape_weight + self.physics_weight) - 1.0).abs() > 1e-9 {
            return Err(VitalsError::InvalidConfig(format!(
                "fusion weights must sum to 1, got {}",
                self.shape_weight + self.physics_weight
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Alerting
// ---------------------------------------------------------------------------

/// Thresholds and windows for the alert stabilizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Risk above which the fast path reports `Critical`.
    pub critical_threshold: f64,
    /// Risk above which the fast path reports `RisingConcern`.
    pub rising_threshold: f64,
    /// How long a latched high-severity decision masks a `Stable` one.
    pub hold_window: f64,
    /// How long a deep-analysis result overrides the fast path.
    pub freshness_window: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            critical_threshold: 0.8,
            rising_threshold: 0.5,
            hold_window: 5.0,
            freshness_window: 15.0,
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.rising_threshold)
            || !(0.0..=1.0).contains(&self.critical_threshold)
            || self.rising_threshold >= self.critical_threshold
        {
            return Err(VitalsError::InvalidConfig(format!(
                "thresholds must satisfy 0 <= rising ({}) < critical ({}) <= 1",
                self.rising_threshold, self.critical_threshold
            )));
        }
        if self.hold_window < 0.0 || self.freshness_window < 0.0 {
            return Err(VitalsError::InvalidConfig(
                "hold_window and freshness_window must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Deep analysis
// ---------------------------------------------------------------------------

/// Trigger policy for the deep-analysis coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Minimum time between two dispatches.
    pub debounce_window: f64,
    /// Dispatch automatically when risk crosses `auto_risk_threshold`.
    pub auto_analysis: bool,
    /// Risk above which an automatic dispatch is requested.
    pub auto_risk_threshold: f64,
    /// Maximum characters of a recommendation kept from the backend.
    pub max_recommendation_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            debounce_window: 8.0,
            auto_analysis: true,
            auto_risk_threshold: 0.6,
            max_recommendation_chars: 200,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.debounce_window < 0.0 {
            return Err(VitalsError::InvalidConfig(
                "debounce_window must be >= 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.auto_risk_threshold) {
            return Err(VitalsError::InvalidConfig(format!(
                "auto_risk_threshold must be in [0, 1], got {}",
                self.auto_risk_threshold
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Top-level configuration
// ---------------------------------------------------------------------------

/// Aggregated configuration for the full pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalsConfig {
    pub topology: TopologyConfig,
    pub physics: PhysicsConfig,
    pub fusion: FusionConfig,
    pub alert: AlertConfig,
    pub analysis: AnalysisConfig,
}

impl VitalsConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.topology.validate()?;
        self.physics.validate()?;
        self.fusion.validate()?;
        self.alert.validate()?;
        self.analysis.validate()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

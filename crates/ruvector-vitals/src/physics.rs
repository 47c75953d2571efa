//! Hemodynamic consistency checks.
//!
//! Two closed-form relations tie the channels together:
//!
//! ```text
//! CO  = HR × SV / 1000          (cardiac output, L/min)
//! SVR = 80 × MAP / CO           (systemic vascular resistance, dyn·s/cm⁵)
//! ```
//!
//! Readings outside the per-channel hard bounds, or whose derived resistance
//! leaves the (much wider) plausible band, are physically impossible and are
//! flagged invalid. Low-but-plausible resistance is a shock-like state, not a
//! sensor fault, and shows up as low severity instead.

use serde::{Deserialize, Serialize};

use crate::config::PhysicsConfig;
use crate::sample::VitalsSample;

/// Outcome of validating one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsResult {
    pub is_valid: bool,
    /// Hemodynamic health in [0, 1]: 1 healthy resistance, 0 shock-like.
    /// Always 0 when invalid.
    pub severity: f64,
    pub reason: String,
    /// Derived cardiac output, when it could be computed.
    pub cardiac_output: Option<f64>,
    /// Derived vascular resistance, when it could be computed.
    pub vascular_resistance: Option<f64>,
}

impl PhysicsResult {
    fn invalid(reason: String) -> Self {
        Self {
            is_valid: false,
            severity: 0.0,
            reason,
            cardiac_output: None,
            vascular_resistance: None,
        }
    }
}

/// Stateless validator; [`validate`](Self::validate) depends only on its argument.
#[derive(Debug, Clone, Default)]
pub struct PhysicsValidator {
    config: PhysicsConfig,
}

impl PhysicsValidator {
    pub fn new(config: PhysicsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn validate(&self, sample: &VitalsSample) -> PhysicsResult {
        let cfg = &self.config;
        let hr = sample.heart_rate();
        let map = sample.mean_arterial_pressure();

        if !within(map, cfg.map_bounds) {
            return PhysicsResult::invalid(format!(
                "impossible mean arterial pressure ({:.0} mmHg)",
                map
            ));
        }
        if !within(hr, cfg.heart_rate_bounds) {
            return PhysicsResult::invalid(format!("impossible heart rate ({:.0} bpm)", hr));
        }

        let cardiac_output = hr * cfg.stroke_volume_ml / 1000.0;
        if cardiac_output == 0.0 {
            return PhysicsResult::invalid("zero cardiac output".to_string());
        }

        let resistance = 80.0 * map / cardiac_output;
        if !within(resistance, cfg.resistance_band) {
            return PhysicsResult {
                cardiac_output: Some(cardiac_output),
                vascular_resistance: Some(resistance),
                ..PhysicsResult::invalid(format!(
                    "physics violation (SVR={:.0} impossible)",
                    resistance
                ))
            };
        }

        let severity = ((resistance - cfg.severity_floor) / cfg.severity_span).clamp(0.0, 1.0);
        PhysicsResult {
            is_valid: true,
            severity,
            reason: format!("valid (SVR={:.0})", resistance),
            cardiac_output: Some(cardiac_output),
            vascular_resistance: Some(resistance),
        }
    }
}

fn within(value: f64, (lo, hi): (f64, f64)) -> bool {
    value >= lo && value <= hi
}

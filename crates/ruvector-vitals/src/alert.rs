//! Alert decisions and display stabilization.
//!
//! [`FastPathPolicy`] maps one sample's physics and risk to a decision
//! deterministically. [`AlertStabilizer`] sits between that per-sample
//! decision and the display: it latches high-severity decisions for a short
//! hold window so a single quiet sample cannot make a critical alert flicker
//! off, and lets a fresh deep-analysis result take precedence.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::TriggerState;
use crate::config::AlertConfig;
use crate::fusion::RiskAssessment;
use crate::physics::PhysicsResult;

/// Displayed severity. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertLevel {
    Stable,
    SensorConcern,
    RisingConcern,
    Critical,
}

impl AlertLevel {
    /// Traffic-light colour used by the presentation layer.
    pub fn color(&self) -> &'static str {
        match self {
            AlertLevel::Stable => "GREEN",
            AlertLevel::SensorConcern => "YELLOW",
            AlertLevel::RisingConcern => "ORANGE",
            AlertLevel::Critical => "RED",
        }
    }

    /// Parse either a colour or a level name, case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match normalized.as_str() {
            "GREEN" | "STABLE" => Some(AlertLevel::Stable),
            "YELLOW" | "SENSORCONCERN" | "SENSOR" => Some(AlertLevel::SensorConcern),
            "ORANGE" | "RISINGCONCERN" | "RISING" | "WARNING" => Some(AlertLevel::RisingConcern),
            "RED" | "CRITICAL" => Some(AlertLevel::Critical),
            _ => None,
        }
    }

    /// Levels that are latched by the stabilizer.
    pub fn is_escalated(&self) -> bool {
        matches!(self, AlertLevel::RisingConcern | AlertLevel::Critical)
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AlertLevel::Stable => "Stable",
            AlertLevel::SensorConcern => "SensorConcern",
            AlertLevel::RisingConcern => "RisingConcern",
            AlertLevel::Critical => "Critical",
        };
        write!(f, "{} ({})", name, self.color())
    }
}

/// Where a decision came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
    /// Deterministic per-sample policy.
    FastPath,
    /// Parsed output of the inference backend.
    DeepAnalysis { model_id: String },
    /// The backend failed or answered unusably; the fast-path decision from
    /// trigger time is shown in its place.
    DeepAnalysisFallback { reason: String },
}

impl Provenance {
    pub fn is_deep_analysis(&self) -> bool {
        matches!(self, Provenance::DeepAnalysis { .. })
    }
}

/// A complete, displayable decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDecision {
    pub level: AlertLevel,
    /// Recommended action, always phrased for clinician verification.
    pub recommendation: String,
    pub rationale: String,
    pub suggested_checks: Vec<String>,
    pub provenance: Provenance,
    /// Verification notice carried by every decision, whatever its source.
    pub disclaimer: String,
}

impl AlertDecision {
    /// The same decision, re-attributed.
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }
}

/// Notice attached to every decision.
pub const DISCLAIMER: &str = "AI Decision Support Only. Clinician must verify.";

const SENSOR_RECOMMENDATION: &str = "Sensor calibration required. Check BP cuff.";
const CRITICAL_RECOMMENDATION: &str =
    "Flag: consider Sepsis Protocol A (clinician verification required).";
const RISING_RECOMMENDATION: &str = "Flag: consider vasopressor support to target MAP > 65.";
const STABLE_RECOMMENDATION: &str = "Continue vitals monitoring. Re-assess in 15 min.";

/// Deterministic decision for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastPathPolicy {
    critical_threshold: f64,
    rising_threshold: f64,
}

impl Default for FastPathPolicy {
    fn default() -> Self {
        Self::new(&AlertConfig::default())
    }
}

impl FastPathPolicy {
    pub fn new(config: &AlertConfig) -> Self {
        Self {
            critical_threshold: config.critical_threshold,
            rising_threshold: config.rising_threshold,
        }
    }

    pub fn critical_threshold(&self) -> f64 {
        self.critical_threshold
    }

    /// Physics veto first, then risk thresholds (strictly greater).
    pub fn decide(&self, physics: &PhysicsResult, risk: &RiskAssessment) -> AlertDecision {
        if !physics.is_valid {
            return AlertDecision {
                level: AlertLevel::SensorConcern,
                recommendation: SENSOR_RECOMMENDATION.to_string(),
                rationale: format!(
                    "Physics engine veto: {}. Formula '{}' rejected.",
                    physics.reason, risk.explanation
                ),
                suggested_checks: vec![
                    "Check BP cuff placement and size".to_string(),
                    "Re-zero arterial line transducer".to_string(),
                    "Confirm reading with a manual measurement".to_string(),
                ],
                provenance: Provenance::FastPath,
                disclaimer: DISCLAIMER.to_string(),
            };
        }

        let rationale = format!(
            "Analyzed hemodynamics: {}. Risk is {:.2}.",
            risk.explanation, risk.risk
        );
        let (level, recommendation, checks): (_, _, &[&str]) = if risk.risk > self.critical_threshold
        {
            (
                AlertLevel::Critical,
                CRITICAL_RECOMMENDATION,
                &[
                    "Draw lactate and blood cultures",
                    "Review fluid balance",
                    "Escalate to attending clinician",
                ],
            )
        } else if risk.risk > self.rising_threshold {
            (
                AlertLevel::RisingConcern,
                RISING_RECOMMENDATION,
                &["Repeat MAP in 5 min", "Assess perfusion (capillary refill, urine output)"],
            )
        } else {
            (
                AlertLevel::Stable,
                STABLE_RECOMMENDATION,
                &["Continue standard monitoring"],
            )
        };

        AlertDecision {
            level,
            recommendation: recommendation.to_string(),
            rationale,
            suggested_checks: checks.iter().map(|c| c.to_string()).collect(),
            provenance: Provenance::FastPath,
            disclaimer: DISCLAIMER.to_string(),
        }
    }
}

/// What the display should show for one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StableAlert {
    pub decision: AlertDecision,
    /// True when a latched decision is masking a quieter fast-path one.
    pub held: bool,
}

/// Hysteresis between per-sample decisions and the display.
#[derive(Debug, Clone)]
pub struct AlertStabilizer {
    hold_window: f64,
    freshness_window: f64,
    latched: Option<(AlertDecision, f64)>,
    current: AlertLevel,
}

impl Default for AlertStabilizer {
    fn default() -> Self {
        Self::new(&AlertConfig::default())
    }
}

impl AlertStabilizer {
    pub fn new(config: &AlertConfig) -> Self {
        Self {
            hold_window: config.hold_window,
            freshness_window: config.freshness_window,
            latched: None,
            current: AlertLevel::Stable,
        }
    }

    /// Choose what to display at stream time `now`.
    ///
    /// A `DeepAnalysis` result observed less than `freshness_window` ago wins.
    /// Otherwise the fast-path decision is shown, except that a `Stable` one
    /// is replaced by the latched escalation while it is younger than
    /// `hold_window`.
    pub fn update(
        &mut self,
        fast: &AlertDecision,
        trigger: Option<&TriggerState>,
        now: f64,
    ) -> StableAlert {
        if fast.level.is_escalated() {
            self.latched = Some((fast.clone(), now));
        }

        if let Some(deep) = trigger.and_then(|state| self.fresh_deep_result(state, now)) {
            return self.show(deep.clone(), false);
        }

        if fast.level == AlertLevel::Stable {
            if let Some((latched, at)) = &self.latched {
                if now - at < self.hold_window {
                    debug!(
                        level = %latched.level,
                        age = now - at,
                        "holding latched alert"
                    );
                    let latched = latched.clone();
                    return self.show(latched, true);
                }
            }
        }

        self.show(fast.clone(), false)
    }

    /// Level most recently displayed.
    pub fn current_level(&self) -> AlertLevel {
        self.current
    }

    fn fresh_deep_result<'a>(&self, state: &'a TriggerState, now: f64) -> Option<&'a AlertDecision> {
        let result = state.last_result.as_ref()?;
        let observed = state.last_result_time?;
        (result.provenance.is_deep_analysis() && now - observed < self.freshness_window)
            .then_some(result)
    }

    fn show(&mut self, decision: AlertDecision, held: bool) -> StableAlert {
        self.current = decision.level;
        StableAlert { decision, held }
    }
}

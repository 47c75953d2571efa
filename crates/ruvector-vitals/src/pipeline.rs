//! End-to-end triage pipeline for one monitored stream.
//!
//! [`TriagePipeline`] owns every stateful stage, so independent streams are
//! just independent pipelines. Feed it samples in timestamp order with
//! [`process`](TriagePipeline::process); each call returns the full
//! [`SampleOutcome`] and never waits on deep analysis.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::alert::{AlertDecision, AlertLevel, AlertStabilizer, FastPathPolicy, StableAlert};
use crate::analysis::{
    AnalysisRequest, DeepAnalysisCoordinator, DeepAnalysisResult, NoopBackend, SharedBackend,
    TriggerReason, TriggerState,
};
use crate::config::VitalsConfig;
use crate::error::{Result, VitalsError};
use crate::fusion::{RiskAssessment, RiskFusion};
use crate::physics::{PhysicsResult, PhysicsValidator};
use crate::sample::VitalsSample;
use crate::topology::{ShapeReading, TopologicalSensor};

/// Everything computed for one sample.
#[derive(Debug, Clone, Serialize)]
pub struct SampleOutcome {
    pub timestamp: f64,
    pub shape: ShapeReading,
    pub physics: PhysicsResult,
    pub risk: RiskAssessment,
    /// Undamped per-sample decision.
    pub fast_path: AlertDecision,
    /// What should be displayed.
    pub alert: StableAlert,
    /// Set when this sample dispatched a deep analysis.
    pub dispatched: Option<TriggerReason>,
    /// Deep analysis result picked up while processing this sample.
    pub deep_result: Option<DeepAnalysisResult>,
    pub analysis_in_flight: bool,
    /// Wall-clock processing time in microseconds.
    pub latency_us: u64,
}

/// Cumulative pipeline statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    /// Number of samples processed so far.
    pub samples_processed: u64,
    /// Samples that produced a full time-delay embedding.
    pub embeddings_produced: u64,
    /// Samples rejected by the physics validator.
    pub sensor_vetoes: u64,
    pub deep_analyses_dispatched: u64,
    /// Running average latency in microseconds.
    pub avg_latency_us: f64,
}

/// A stateful triage pipeline.
#[derive(Debug)]
pub struct TriagePipeline {
    sensor: TopologicalSensor,
    validator: PhysicsValidator,
    fusion: RiskFusion,
    policy: FastPathPolicy,
    stabilizer: AlertStabilizer,
    coordinator: DeepAnalysisCoordinator,
    manual_request: bool,
    last_timestamp: Option<f64>,
    stats: PipelineStats,
}

impl TriagePipeline {
    /// Pipeline with no inference backend; deep analyses always fall back.
    pub fn new(config: VitalsConfig) -> Result<Self> {
        Self::with_backend(config, Arc::new(NoopBackend))
    }

    pub fn with_backend(config: VitalsConfig, backend: SharedBackend) -> Result<Self> {
        config.validate()?;
        let pipeline = Self {
            sensor: TopologicalSensor::new(&config.topology)?,
            validator: PhysicsValidator::new(config.physics.clone()),
            fusion: RiskFusion::new(&config.fusion)?,
            policy: FastPathPolicy::new(&config.alert),
            stabilizer: AlertStabilizer::new(&config.alert),
            coordinator: DeepAnalysisCoordinator::new(
                backend,
                config.analysis.clone(),
                config.alert.critical_threshold,
            )?,
            manual_request: false,
            last_timestamp: None,
            stats: PipelineStats::default(),
        };
        info!(
            model = pipeline.coordinator.model_id(),
            window = config.topology.window_size,
            cloud = config.topology.cloud_capacity,
            "triage pipeline created"
        );
        Ok(pipeline)
    }

    /// Run one sample through every stage.
    ///
    /// # Errors
    ///
    /// [`VitalsError::OutOfOrder`] if `sample` is older than the previous one.
    /// Physiologically impossible readings are not errors; they come back as
    /// a `SensorConcern` outcome.
    pub fn process(&mut self, sample: &VitalsSample) -> Result<SampleOutcome> {
        let start = Instant::now();
        let now = sample.timestamp();
        if let Some(previous) = self.last_timestamp {
            if now < previous {
                return Err(VitalsError::OutOfOrder {
                    previous,
                    timestamp: now,
                });
            }
        }

        let deep_result = self.coordinator.poll(now);

        // -- 1. Shape ---------------------------------------------------------
        let shape = self.sensor.update(sample)?;
        if self.sensor.buffer().is_full() {
            self.stats.embeddings_produced += 1;
        }

        // -- 2. Physics -------------------------------------------------------
        let physics = self.validator.validate(sample);
        if !physics.is_valid {
            self.stats.sensor_vetoes += 1;
            warn!(at = now, reason = %physics.reason, "physics veto");
        }

        // -- 3. Risk and fast-path decision ------------------------------------
        let risk = self.fusion.predict(shape.score(), physics.severity);
        let fast_path = self.policy.decide(&physics, &risk);

        // -- 4. Deep analysis trigger -----------------------------------------
        let mut dispatched = None;
        if let Some(reason) = self
            .coordinator
            .auto_trigger_reason(risk.risk, self.manual_request)
        {
            let request = AnalysisRequest {
                timestamp: now,
                risk: risk.risk,
                physics_valid: physics.is_valid,
                physics_reason: physics.reason.clone(),
                explanation: risk.explanation.clone(),
                shape_description: shape.describe(),
                vitals_snapshot: sample.snapshot(),
                fast_path: fast_path.clone(),
            };
            if self.coordinator.maybe_trigger(request, reason, now) {
                dispatched = Some(reason);
                self.stats.deep_analyses_dispatched += 1;
                // A pending manual request survives refusals.
                if reason == TriggerReason::Manual {
                    self.manual_request = false;
                }
            }
        }

        // -- 5. Stabilize -----------------------------------------------------
        let trigger_state = self.coordinator.snapshot();
        let previous_level = self.stabilizer.current_level();
        let alert = self.stabilizer.update(&fast_path, Some(&trigger_state), now);
        if alert.decision.level != previous_level {
            info!(
                at = now,
                from = %previous_level,
                to = %alert.decision.level,
                held = alert.held,
                "alert level changed"
            );
        }

        // -- 6. Update stats --------------------------------------------------
        let latency_us = start.elapsed().as_micros() as u64;
        self.stats.samples_processed += 1;
        let n = self.stats.samples_processed as f64;
        self.stats.avg_latency_us =
            self.stats.avg_latency_us * ((n - 1.0) / n) + latency_us as f64 / n;
        self.last_timestamp = Some(now);

        debug!(
            at = now,
            shape = shape.score(),
            severity = physics.severity,
            risk = risk.risk,
            level = %alert.decision.level,
            "sample processed"
        );

        Ok(SampleOutcome {
            timestamp: now,
            shape,
            physics,
            risk,
            fast_path,
            alert,
            dispatched,
            deep_result,
            analysis_in_flight: trigger_state.in_flight,
            latency_us,
        })
    }

    /// Ask for a deep analysis on the next sample that can dispatch one.
    pub fn request_deep_analysis(&mut self) {
        self.manual_request = true;
    }

    pub fn set_auto_analysis(&mut self, enabled: bool) {
        self.coordinator.set_auto_analysis(enabled);
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn trigger_state(&self) -> TriggerState {
        self.coordinator.snapshot()
    }

    pub fn current_level(&self) -> AlertLevel {
        self.stabilizer.current_level()
    }

    pub fn sensor(&self) -> &TopologicalSensor {
        &self.sensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopologyConfig;

    fn small_config() -> VitalsConfig {
        VitalsConfig {
            topology: TopologyConfig {
                window_size: 4,
                projection_dim: 3,
                cloud_capacity: 10,
                calibration_min: 5,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn nominal(t: f64) -> VitalsSample {
        VitalsSample::new(t, 75.0, 90.0, 98.0, 37.0, 16.0).unwrap()
    }

    #[test]
    fn test_rejects_out_of_order() {
        let mut pipeline = TriagePipeline::new(small_config()).unwrap();
        pipeline.process(&nominal(5.0)).unwrap();
        pipeline.process(&nominal(5.0)).unwrap();
        let err = pipeline.process(&nominal(4.0)).unwrap_err();
        assert_eq!(
            err,
            VitalsError::OutOfOrder {
                previous: 5.0,
                timestamp: 4.0
            }
        );
        assert_eq!(pipeline.stats().samples_processed, 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config();
        config.fusion.shape_weight = 0.9;
        assert!(TriagePipeline::new(config).is_err());
    }

    #[test]
    fn test_stats_track_embeddings_and_vetoes() {
        let mut pipeline = TriagePipeline::new(small_config()).unwrap();
        for i in 0..10 {
            pipeline.process(&nominal(i as f64)).unwrap();
        }
        let bad = VitalsSample::new(10.0, 75.0, 350.0, 98.0, 37.0, 16.0).unwrap();
        let outcome = pipeline.process(&bad).unwrap();
        assert_eq!(outcome.alert.decision.level, AlertLevel::SensorConcern);

        let stats = pipeline.stats();
        assert_eq!(stats.samples_processed, 11);
        assert_eq!(stats.embeddings_produced, 8);
        assert_eq!(stats.sensor_vetoes, 1);
        assert!(stats.avg_latency_us >= 0.0);
    }

    #[test]
    fn test_manual_request_dispatches_once() {
        let mut pipeline = TriagePipeline::new(small_config()).unwrap();
        pipeline.request_deep_analysis();
        let outcome = pipeline.process(&nominal(0.0)).unwrap();
        assert_eq!(outcome.dispatched, Some(TriggerReason::Manual));
        let outcome = pipeline.process(&nominal(20.0)).unwrap();
        assert_eq!(outcome.dispatched, None);
        assert_eq!(pipeline.stats().deep_analyses_dispatched, 1);
    }

    #[test]
    fn test_outcome_serializes() {
        let mut pipeline = TriagePipeline::new(small_config()).unwrap();
        let outcome = pipeline.process(&nominal(0.0)).unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["alert"]["decision"]["provenance"]["source"], "fast_path");
        assert_eq!(json["physics"]["is_valid"], true);
    }
}

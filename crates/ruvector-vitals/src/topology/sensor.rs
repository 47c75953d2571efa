//! Topological sensor: embedding → projection → cloud → shape score.

use tracing::info;

use super::cloud::{PointCloudStore, ShapeReading};
use super::embedding::EmbeddingBuffer;
use super::persistence::TopologicalScorer;
use super::projection::Projector;
use crate::config::TopologyConfig;
use crate::error::Result;
use crate::sample::VitalsSample;

/// Stateful shape sensor. Call [`update`](Self::update) once per sample.
#[derive(Debug)]
pub struct TopologicalSensor {
    buffer: EmbeddingBuffer,
    projector: Projector,
    cloud: PointCloudStore,
    scorer: TopologicalScorer,
    calibrated_logged: bool,
}

impl TopologicalSensor {
    pub fn new(config: &TopologyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            buffer: EmbeddingBuffer::new(config.window_size)?,
            projector: Projector::new(
                config.projection_dim,
                config.projection_density,
                config.projection_seed,
            )?,
            cloud: PointCloudStore::new(config.cloud_capacity, config.calibration_min)?,
            scorer: TopologicalScorer::new(config.amplitude_order),
            calibrated_logged: false,
        })
    }

    /// Ingest one sample and return the current shape reading.
    pub fn update(&mut self, sample: &VitalsSample) -> Result<ShapeReading> {
        let embedding = match self.buffer.push(sample) {
            Some(embedding) => embedding,
            None => {
                return Ok(ShapeReading::Calibrating {
                    points: 0,
                    required: self.cloud.calibration_min(),
                })
            }
        };

        let point = self.projector.fit_once(&embedding)?;
        self.cloud.observe(point);

        let reading = self.cloud.score(&self.scorer);
        if !reading.is_calibrating() && !self.calibrated_logged {
            self.calibrated_logged = true;
            info!(
                points = self.cloud.len(),
                score = reading.score(),
                "topological sensor calibrated"
            );
        }
        Ok(reading)
    }

    pub fn buffer(&self) -> &EmbeddingBuffer {
        &self.buffer
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn cloud(&self) -> &PointCloudStore {
        &self.cloud
    }
}

//! Vitals sample type.

use serde::Serialize;

use crate::error::{Result, VitalsError};

/// Number of channels carried by every sample.
pub const CHANNELS: usize = 5;

/// Channel names in embedding order.
pub const CHANNEL_NAMES: [&str; CHANNELS] = ["HR", "MAP", "SpO2", "Temp", "RR"];

/// One reading from the monitor.
///
/// Fields are private so that every constructed sample is known to hold
/// finite values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VitalsSample {
    timestamp: f64,
    heart_rate: f64,
    mean_arterial_pressure: f64,
    spo2: f64,
    temperature: f64,
    respiratory_rate: f64,
}

impl VitalsSample {
    /// Build a sample, rejecting non-finite channel values.
    pub fn new(
        timestamp: f64,
        heart_rate: f64,
        mean_arterial_pressure: f64,
        spo2: f64,
        temperature: f64,
        respiratory_rate: f64,
    ) -> Result<Self> {
        let sample = Self {
            timestamp,
            heart_rate,
            mean_arterial_pressure,
            spo2,
            temperature,
            respiratory_rate,
        };
        if !timestamp.is_finite() {
            return Err(VitalsError::InvalidSample(format!(
                "timestamp is not finite ({})",
                timestamp
            )));
        }
        for (name, value) in CHANNEL_NAMES.iter().zip(sample.channels()) {
            if !value.is_finite() {
                return Err(VitalsError::InvalidSample(format!(
                    "{} is not finite ({})",
                    name, value
                )));
            }
        }
        Ok(sample)
    }

    /// Build a sample from channels in `[HR, MAP, SpO2, Temp, RR]` order.
    pub fn from_slice(timestamp: f64, values: &[f64]) -> Result<Self> {
        if values.len() != CHANNELS {
            return Err(VitalsError::DimensionMismatch {
                expected: CHANNELS,
                actual: values.len(),
            });
        }
        Self::new(
            timestamp, values[0], values[1], values[2], values[3], values[4],
        )
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn heart_rate(&self) -> f64 {
        self.heart_rate
    }

    pub fn mean_arterial_pressure(&self) -> f64 {
        self.mean_arterial_pressure
    }

    pub fn spo2(&self) -> f64 {
        self.spo2
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn respiratory_rate(&self) -> f64 {
        self.respiratory_rate
    }

    /// Channels in embedding order.
    pub fn channels(&self) -> [f64; CHANNELS] {
        [
            self.heart_rate,
            self.mean_arterial_pressure,
            self.spo2,
            self.temperature,
            self.respiratory_rate,
        ]
    }

    /// Short human-readable snapshot, e.g. `HR 75, MAP 90, SpO2 98, RR 16`.
    pub fn snapshot(&self) -> String {
        format!(
            "HR {:.0}, MAP {:.0}, SpO2 {:.0}, RR {:.0}",
            self.heart_rate, self.mean_arterial_pressure, self.spo2, self.respiratory_rate
        )
    }
}

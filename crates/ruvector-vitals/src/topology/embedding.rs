//! Sliding-window time-delay embedding of multichannel vitals.
//!
//! Φ(t) = [s(t-W+1), ..., s(t-1), s(t)], each `s` a full channel vector, so
//! one embedding has `W × CHANNELS` coordinates (oldest row first).

use std::collections::VecDeque;

use crate::error::{Result, VitalsError};
use crate::sample::{VitalsSample, CHANNELS};

/// Fixed-length FIFO of the most recent samples.
#[derive(Debug, Clone)]
pub struct EmbeddingBuffer {
    window: VecDeque<[f64; CHANNELS]>,
    capacity: usize,
}

impl EmbeddingBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(VitalsError::InvalidConfig(
                "embedding window must hold at least one sample".to_string(),
            ));
        }
        Ok(Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append a sample and return the flattened embedding once the window is
    /// full. `None` during warm-up.
    pub fn push(&mut self, sample: &VitalsSample) -> Option<Vec<f64>> {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample.channels());

        if self.window.len() < self.capacity {
            return None;
        }
        Some(self.window.iter().flat_map(|row| row.iter().copied()).collect())
    }

    /// Dimension of the embeddings this buffer produces.
    pub fn embedding_dim(&self) -> usize {
        self.capacity * CHANNELS
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.window.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

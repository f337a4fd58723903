//! Decoded sample type.

use serde::{Deserialize, Serialize};

/// One timestamped vector of channel values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Simulation time in seconds
    pub time: f64,
    /// One value per channel
    pub values: Vec<f64>,
}

impl Sample {
    pub fn new(time: f64, values: Vec<f64>) -> Self {
        Self { time, values }
    }

    /// Split a `[time, values..]` row. Returns `None` for an empty row.
    pub fn from_row(row: &[f64]) -> Option<Self> {
        let (&time, values) = row.split_first()?;
        Some(Self::new(time, values.to_vec()))
    }

    /// Flatten into the `[time, values..]` row the store ingests.
    pub fn to_row(&self) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.values.len() + 1);
        row.push(self.time);
        row.extend_from_slice(&self.values);
        row
    }

    pub fn dimensions(&self) -> usize {
        self.values.len()
    }
}

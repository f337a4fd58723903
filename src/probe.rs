//! Simulation-side value probe.
//!
//! A probe sits on a simulated object, packs every `(t, x)` it is handed
//! into a wire frame and queues it until the client connection drains the
//! queue.

use crate::wire::{FrameCodec, WireError};
use std::collections::VecDeque;

/// Queue of encoded frames for one probed object.
#[derive(Debug, Clone)]
pub struct ValueProbe {
    label: String,
    codec: FrameCodec,
    pending: VecDeque<Vec<u8>>,
}

impl ValueProbe {
    pub fn new(label: impl Into<String>, n_lines: usize) -> Self {
        Self {
            label: label.into(),
            codec: FrameCodec::new(n_lines),
            pending: VecDeque::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of probed values per sample.
    pub fn n_lines(&self) -> usize {
        self.codec.dimensions()
    }

    /// Record the probed values at simulation time `t`.
    pub fn gather(&mut self, t: f64, x: &[f64]) -> Result<(), WireError> {
        let frame = self.codec.encode(t, x)?;
        self.pending.push_back(frame);
        Ok(())
    }

    /// Frames waiting to be sent.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Take every queued frame, oldest first.
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        self.pending.drain(..).collect()
    }
}

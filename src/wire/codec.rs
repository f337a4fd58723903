//! Little-endian `f32` frame codec.

use crate::wire::types::Sample;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;
use thiserror::Error;

/// Size of one encoded value (time or channel value).
pub const BYTES_PER_VALUE: usize = 4;

/// Errors raised while encoding or decoding frames.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("message of {len} bytes is not a whole number of {frame_len}-byte frames")]
    Truncated { len: usize, frame_len: usize },
    #[error("sample has {actual} values, codec expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encoder/decoder for frames of a fixed channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    dimensions: usize,
}

impl FrameCodec {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Bytes per encoded sample.
    pub fn frame_len(&self) -> usize {
        BYTES_PER_VALUE * (self.dimensions + 1)
    }

    /// Pack one sample. Values are narrowed to `f32`.
    pub fn encode(&self, time: f64, values: &[f64]) -> Result<Vec<u8>, WireError> {
        if values.len() != self.dimensions {
            return Err(WireError::DimensionMismatch {
                expected: self.dimensions,
                actual: values.len(),
            });
        }
        let mut frame = Vec::with_capacity(self.frame_len());
        frame.write_f32::<LittleEndian>(time as f32)?;
        for &value in values {
            frame.write_f32::<LittleEndian>(value as f32)?;
        }
        Ok(frame)
    }

    /// Unpack a message holding zero or more whole frames.
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<Sample>, WireError> {
        let frame_len = self.frame_len();
        if bytes.len() % frame_len != 0 {
            return Err(WireError::Truncated {
                len: bytes.len(),
                frame_len,
            });
        }

        let count = bytes.len() / frame_len;
        let mut cursor = Cursor::new(bytes);
        let mut samples = Vec::with_capacity(count);
        for _ in 0..count {
            let time = cursor.read_f32::<LittleEndian>()? as f64;
            let mut values = Vec::with_capacity(self.dimensions);
            for _ in 0..self.dimensions {
                values.push(cursor.read_f32::<LittleEndian>()? as f64);
            }
            samples.push(Sample::new(time, values));
        }
        Ok(samples)
    }
}

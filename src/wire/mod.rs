//! Binary sample frames exchanged with the simulation backend.
//!
//! Each sample travels as `1 + n` little-endian `f32`s: the simulation time
//! followed by the `n` probed values.

pub mod codec;
pub mod types;

// Re-export commonly used types
pub use codec::{FrameCodec, WireError, BYTES_PER_VALUE};
pub use types::Sample;

//! Sample storage for live plots.
//!
//! This module contains:
//! - The streaming sample store with smoothing, rewind and retention trim
//! - The time-window accessor the store is queried through
//! - A mutex-guarded wrapper for split producer/consumer threads

pub mod data_store;
pub mod shared;
pub mod window;

// Re-export commonly used types
pub use data_store::{DataStore, IngestOutcome, StoreError, WindowSnapshot, WindowedView};
pub use shared::SharedDataStore;
pub use window::{TimeSlider, TimeWindow, WindowDescriptor};

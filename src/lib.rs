//! simviz-stream - streaming sample storage for live simulation plots.
//!
//! This library sits between a running neural simulation and the plots that
//! visualize it: probes pack simulated values into binary frames, and each
//! value component decodes them into a smoothed, time-ordered store that a
//! renderer reads one window at a time.
//!
//! # Store Guarantees
//!
//! - **Aligned channels**: every channel always has one value per timestamp
//! - **Ordered history**: a late sample rewinds history to its timestamp
//! - **Bounded memory**: trimming keeps only the configured trailing history
//! - **Read-only views**: window queries never modify the store
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       simviz-stream                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │ ValueProbe  │──▶│    Wire     │──▶│  DataStore  │       │
//! │  │(simulation) │   │ (f32 frames)│   │ (smoothing) │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                                             │               │
//! │                    ┌─────────────┐          ▼               │
//! │                    │ TimeSlider  │──▶ windowed_view /      │
//! │                    │  (window)   │    latest_in_window     │
//! │                    └─────────────┘                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use simviz_stream::store::{DataStore, WindowDescriptor};
//!
//! let mut store = DataStore::new(1, 0.0);
//! for (t, v) in [(0.0, 1.0), (1.0, 2.0), (2.0, 3.0), (3.0, 4.0)] {
//!     store.ingest(&[t, v]).unwrap();
//! }
//!
//! let window = WindowDescriptor::showing(1.0, 2.5);
//! assert_eq!(store.windowed_view(&window).channels[0], &[2.0, 3.0]);
//! assert_eq!(store.latest_in_window(&window), Some(vec![3.0]));
//! ```

pub mod colors;
pub mod component;
pub mod config;
pub mod probe;
pub mod stats;
pub mod store;
pub mod wire;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use component::{RedrawScheduler, Trace, ValueComponent, ValueFrame};
pub use config::{Config, ConfigError};
pub use probe::ValueProbe;
pub use stats::{ChannelSummary, SharedStreamStats, StatsSnapshot, StreamStats};
pub use store::{
    DataStore, IngestOutcome, SharedDataStore, StoreError, TimeSlider, TimeWindow,
    WindowDescriptor, WindowSnapshot, WindowedView,
};
pub use wire::{FrameCodec, Sample, WireError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Stream statistics.
//!
//! Counters describing what the stores have been fed and what they have
//! discarded, plus per-channel summaries of a shown window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Counters for one viewer session.
#[derive(Debug)]
pub struct StreamStats {
    /// Messages received from the transport
    frames_received: AtomicU64,
    /// Samples accepted into a store
    samples_ingested: AtomicU64,
    /// Out-of-order samples that rewound a store
    rewinds: AtomicU64,
    /// Samples dropped by rewinds
    samples_discarded: AtomicU64,
    /// Samples retired by retention trims
    samples_trimmed: AtomicU64,
    /// Messages or samples that could not be ingested
    malformed: AtomicU64,
    session_start: DateTime<Utc>,
    instance_id: Uuid,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl StreamStats {
    pub fn new() -> Self {
        Self {
            frames_received: AtomicU64::new(0),
            samples_ingested: AtomicU64::new(0),
            rewinds: AtomicU64::new(0),
            samples_discarded: AtomicU64::new(0),
            samples_trimmed: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            session_start: Utc::now(),
            instance_id: Uuid::new_v4(),
            persist_path: None,
        }
    }

    /// Create stats that resume from, and save to, `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!("Could not load previous stream stats: {e}");
        }

        stats
    }

    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_samples(&self, count: u64) {
        self.samples_ingested.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_rewind(&self, discarded: u64) {
        self.rewinds.fetch_add(1, Ordering::Relaxed);
        self.samples_discarded.fetch_add(discarded, Ordering::Relaxed);
    }

    pub fn record_trimmed(&self, count: u64) {
        self.samples_trimmed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            samples_ingested: self.samples_ingested.load(Ordering::Relaxed),
            rewinds: self.rewinds.load(Ordering::Relaxed),
            samples_discarded: self.samples_discarded.load(Ordering::Relaxed),
            samples_trimmed: self.samples_trimmed.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
            instance_id: self.instance_id.to_string(),
        }
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Stream Statistics:\n\
             - Frames received: {}\n\
             - Samples ingested: {}\n\
             - Rewinds: {} ({} samples discarded)\n\
             - Samples trimmed: {}\n\
             - Malformed input: {}\n\
             - Session duration: {} seconds",
            stats.frames_received,
            stats.samples_ingested,
            stats.rewinds,
            stats.samples_discarded,
            stats.samples_trimmed,
            stats.malformed,
            stats.session_duration_secs
        )
    }

    /// Save counters to disk (no-op without a persistence path).
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.snapshot();
            let persisted = PersistedStats {
                frames_received: stats.frames_received,
                samples_ingested: stats.samples_ingested,
                rewinds: stats.rewinds,
                samples_discarded: stats.samples_discarded,
                samples_trimmed: stats.samples_trimmed,
                malformed: stats.malformed,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.frames_received
                    .store(persisted.frames_received, Ordering::Relaxed);
                self.samples_ingested
                    .store(persisted.samples_ingested, Ordering::Relaxed);
                self.rewinds.store(persisted.rewinds, Ordering::Relaxed);
                self.samples_discarded
                    .store(persisted.samples_discarded, Ordering::Relaxed);
                self.samples_trimmed
                    .store(persisted.samples_trimmed, Ordering::Relaxed);
                self.malformed.store(persisted.malformed, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    pub fn reset(&self) {
        for counter in [
            &self.frames_received,
            &self.samples_ingested,
            &self.rewinds,
            &self.samples_discarded,
            &self.samples_trimmed,
            &self.malformed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for StreamStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`StreamStats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub frames_received: u64,
    pub samples_ingested: u64,
    pub rewinds: u64,
    pub samples_discarded: u64,
    pub samples_trimmed: u64,
    pub malformed: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
    pub instance_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    frames_received: u64,
    samples_ingested: u64,
    rewinds: u64,
    samples_discarded: u64,
    samples_trimmed: u64,
    malformed: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared stats.
pub type SharedStreamStats = Arc<StreamStats>;

pub fn create_shared_stats() -> SharedStreamStats {
    Arc::new(StreamStats::new())
}

pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedStreamStats {
    Arc::new(StreamStats::with_persistence(path))
}

/// Descriptive statistics of one channel over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (0 with fewer than two values)
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl ChannelSummary {
    /// Summarize `values`. An empty slice gives the all-zero summary.
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let std_dev = if values.len() > 1 {
            values.std_dev()
        } else {
            0.0
        };
        Self {
            count: values.len(),
            mean: values.mean(),
            std_dev,
            min: values.min(),
            max: values.max(),
        }
    }
}

//! Streaming sample store.
//!
//! Samples arrive as `[time, value_1, .., value_n]` rows from a mostly
//! monotonic transport. The store keeps one growing, time-ordered history:
//! a sample older than the newest one rewinds history to that point instead
//! of being inserted in place. Values pass through a first-order low-pass
//! filter on the way in, old samples are retired by [`DataStore::trim`], and
//! renderers read window slices through [`DataStore::windowed_view`] and
//! [`DataStore::latest_in_window`].

use crate::store::window::TimeWindow;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by [`DataStore::ingest`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The row did not contain `dimensions + 1` elements.
    #[error("sample has {actual} elements, expected {expected} (time first)")]
    DimensionMismatch { expected: usize, actual: usize },
    /// The timestamp was NaN or infinite.
    #[error("sample timestamp {0} is not finite")]
    NonFiniteTime(f64),
}

/// What [`DataStore::ingest`] did with a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The sample was appended after the existing history.
    Appended,
    /// The sample was older than the newest stored one; `discarded` samples
    /// at or after its timestamp were dropped before appending.
    Rewound { discarded: usize },
}

/// Time-ordered, index-aligned storage of smoothed sample channels.
#[derive(Debug, Clone)]
pub struct DataStore {
    smoothing_constant: f64,
    times: Vec<f64>,
    channels: Vec<Vec<f64>>,
}

impl DataStore {
    /// Create an empty store with `dimensions` channels.
    ///
    /// A `smoothing_constant` of zero (or a negative value) disables
    /// smoothing.
    pub fn new(dimensions: usize, smoothing_constant: f64) -> Self {
        Self {
            smoothing_constant: smoothing_constant.max(0.0),
            times: Vec::new(),
            channels: vec![Vec::new(); dimensions],
        }
    }

    /// Number of value channels per sample.
    pub fn dimensions(&self) -> usize {
        self.channels.len()
    }

    pub fn smoothing_constant(&self) -> f64 {
        self.smoothing_constant
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// All stored timestamps, oldest first.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// All stored (smoothed) values of one channel.
    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Timestamp of the newest stored sample.
    pub fn last_time(&self) -> Option<f64> {
        self.times.last().copied()
    }

    /// Add one `[time, values..]` row.
    pub fn ingest(&mut self, row: &[f64]) -> Result<IngestOutcome, StoreError> {
        let expected = self.dimensions() + 1;
        if row.len() != expected {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: row.len(),
            });
        }
        let time = row[0];
        if !time.is_finite() {
            return Err(StoreError::NonFiniteTime(time));
        }

        let mut outcome = IngestOutcome::Appended;
        if matches!(self.last_time(), Some(last) if time < last) {
            let branch = self.times.partition_point(|&t| t < time);
            let discarded = self.times.len() - branch;
            self.truncate(branch);
            tracing::debug!(time, discarded, "out-of-order sample, rewinding history");
            outcome = IngestOutcome::Rewound { discarded };
        }

        let decay = match self.last_time() {
            Some(last) if self.smoothing_constant > 0.0 => {
                (-(time - last) / self.smoothing_constant).exp()
            }
            _ => 0.0,
        };

        for (channel, &raw) in self.channels.iter_mut().zip(&row[1..]) {
            let value = match channel.last() {
                Some(&previous) if decay != 0.0 => raw * (1.0 - decay) + previous * decay,
                _ => raw,
            };
            channel.push(value);
        }
        self.times.push(time);

        Ok(outcome)
    }

    /// Drop samples older than `window.last_time() - window.kept_duration()`.
    ///
    /// Returns the number of samples removed.
    pub fn trim<W: TimeWindow + ?Sized>(&mut self, window: &W) -> usize {
        let limit = window.retention_limit();
        let extra = self.times.partition_point(|&t| t < limit);
        if extra > 0 {
            self.times.drain(..extra);
            for channel in &mut self.channels {
                channel.drain(..extra);
            }
            tracing::debug!(limit, removed = extra, remaining = self.times.len(), "trimmed history");
        }
        extra
    }

    /// Samples with `first_shown_time <= time < first_shown_time + shown_duration`.
    pub fn windowed_view<W: TimeWindow + ?Sized>(&self, window: &W) -> WindowedView<'_> {
        let t1 = window.first_shown_time();
        let t2 = window.window_end();

        let index = self.times.partition_point(|&t| t < t1);
        let last_index = self.times.partition_point(|&t| t < t2).max(index);

        WindowedView {
            first_shown_index: index,
            times: &self.times[index..last_index],
            channels: self
                .channels
                .iter()
                .map(|channel| &channel[index..last_index])
                .collect(),
        }
    }

    /// Per channel, the value of the newest sample strictly before the
    /// window's right edge.
    ///
    /// When every sample is at or after the right edge the oldest sample is
    /// used. Returns `None` for an empty store.
    pub fn latest_in_window<W: TimeWindow + ?Sized>(&self, window: &W) -> Option<Vec<f64>> {
        if self.is_empty() {
            return None;
        }
        let t2 = window.window_end();
        let index = self.times.partition_point(|&t| t < t2).saturating_sub(1);
        Some(self.channels.iter().map(|channel| channel[index]).collect())
    }

    /// Remove every sample, keeping the configuration.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    fn truncate(&mut self, len: usize) {
        self.times.truncate(len);
        for channel in &mut self.channels {
            channel.truncate(len);
        }
    }
}

/// Borrowed slice of the store covering one window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedView<'a> {
    /// Store index of the first sample in the window, for aligning per-sample
    /// annotations kept outside the store.
    pub first_shown_index: usize,
    pub times: &'a [f64],
    pub channels: Vec<&'a [f64]>,
}

impl WindowedView<'_> {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Copy the view out so it can outlive a lock on the store.
    pub fn to_snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            first_shown_index: self.first_shown_index,
            times: self.times.to_vec(),
            channels: self.channels.iter().map(|c| c.to_vec()).collect(),
        }
    }
}

/// Owned copy of a [`WindowedView`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub first_shown_index: usize,
    pub times: Vec<f64>,
    pub channels: Vec<Vec<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::window::WindowDescriptor;

    fn store_with_times(times: &[f64]) -> DataStore {
        let mut store = DataStore::new(1, 0.0);
        for &t in times {
            store.ingest(&[t, t * 10.0]).unwrap();
        }
        store
    }

    fn retention(last_time: f64, kept_duration: f64) -> WindowDescriptor {
        WindowDescriptor {
            first_shown_time: last_time - kept_duration,
            shown_duration: kept_duration,
            last_time,
            kept_duration,
        }
    }

    #[test]
    fn test_in_order_ingest_grows_by_one() {
        let mut store = DataStore::new(2, 0.0);
        for i in 0..20 {
            let outcome = store.ingest(&[i as f64 * 0.001, 1.0, 2.0]).unwrap();
            assert_eq!(outcome, IngestOutcome::Appended);
            assert_eq!(store.len(), i + 1);
            assert_eq!(store.channel(0).unwrap().len(), store.len());
            assert_eq!(store.channel(1).unwrap().len(), store.len());
        }
        assert!(store.times().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_out_of_order_rewinds_to_branch_point() {
        let mut store = store_with_times(&[0.0, 1.0, 2.0, 3.0]);

        let outcome = store.ingest(&[1.5, 15.0]).unwrap();

        assert_eq!(outcome, IngestOutcome::Rewound { discarded: 2 });
        assert_eq!(store.times(), &[0.0, 1.0, 1.5]);
        assert_eq!(store.channel(0).unwrap(), &[0.0, 10.0, 15.0]);
    }

    #[test]
    fn test_rewind_discards_equal_timestamp() {
        let mut store = store_with_times(&[0.0, 1.0, 2.0, 3.0]);

        let outcome = store.ingest(&[1.0, -1.0]).unwrap();

        assert_eq!(outcome, IngestOutcome::Rewound { discarded: 3 });
        assert_eq!(store.times(), &[0.0, 1.0]);
        assert_eq!(store.channel(0).unwrap(), &[0.0, -1.0]);
    }

    #[test]
    fn test_rewind_before_everything_restarts() {
        let mut store = DataStore::new(1, 0.1);
        store.ingest(&[1.0, 5.0]).unwrap();
        store.ingest(&[2.0, 5.0]).unwrap();

        store.ingest(&[0.5, 3.0]).unwrap();

        // Nothing left to blend with, so the raw value is stored.
        assert_eq!(store.times(), &[0.5]);
        assert_eq!(store.channel(0).unwrap(), &[3.0]);
    }

    #[test]
    fn test_equal_timestamp_is_appended() {
        let mut store = store_with_times(&[0.0, 1.0]);
        let outcome = store.ingest(&[1.0, 7.0]).unwrap();
        assert_eq!(outcome, IngestOutcome::Appended);
        assert_eq!(store.times(), &[0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_no_smoothing_stores_raw_values() {
        let mut store = DataStore::new(2, 0.0);
        let rows = [[0.0, 1.0, -1.0], [0.001, 5.0, 0.25], [0.002, -3.0, 9.0]];
        for row in &rows {
            store.ingest(row).unwrap();
        }
        assert_eq!(store.channel(0).unwrap(), &[1.0, 5.0, -3.0]);
        assert_eq!(store.channel(1).unwrap(), &[-1.0, 0.25, 9.0]);
    }

    #[test]
    fn test_smoothing_matches_exponential_filter() {
        let tau = 0.05;
        let dt = 0.01;
        let mut store = DataStore::new(1, tau);
        store.ingest(&[0.0, 1.0]).unwrap();
        store.ingest(&[dt, 3.0]).unwrap();

        let decay = (-dt / tau).exp();
        let expected = 3.0 * (1.0 - decay) + 1.0 * decay;
        let stored = store.channel(0).unwrap();
        assert_eq!(stored[0], 1.0);
        assert!((stored[1] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_smoothing_limits() {
        let mut store = DataStore::new(1, 0.01);
        store.ingest(&[0.0, 1.0]).unwrap();
        store.ingest(&[1000.0, 3.0]).unwrap();
        assert!((store.channel(0).unwrap()[1] - 3.0).abs() < 1e-9);

        let mut store = DataStore::new(1, 0.01);
        store.ingest(&[0.0, 1.0]).unwrap();
        store.ingest(&[1e-9, 3.0]).unwrap();
        assert!((store.channel(0).unwrap()[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch_leaves_store_untouched() {
        let mut store = DataStore::new(2, 0.0);
        store.ingest(&[0.0, 1.0, 2.0]).unwrap();

        let err = store.ingest(&[1.0, 1.0]).unwrap_err();

        assert_eq!(
            err,
            StoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        );
        assert!(err.to_string().contains("expected 3"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_non_finite_time_rejected() {
        let mut store = DataStore::new(1, 0.0);
        assert!(matches!(
            store.ingest(&[f64::NAN, 1.0]),
            Err(StoreError::NonFiniteTime(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_trim_removes_maximal_old_prefix() {
        let mut store = store_with_times(&[0.0, 1.0, 2.0, 3.0, 4.0]);

        let removed = store.trim(&retention(4.0, 1.5));

        assert_eq!(removed, 3);
        assert_eq!(store.times(), &[3.0, 4.0]);
        assert_eq!(store.channel(0).unwrap(), &[30.0, 40.0]);
    }

    #[test]
    fn test_trim_is_idempotent() {
        let mut store = store_with_times(&[0.0, 1.0, 2.0, 3.0]);
        let window = retention(3.0, 1.0);

        assert_eq!(store.trim(&window), 2);
        assert_eq!(store.trim(&window), 0);
        assert_eq!(store.times(), &[2.0, 3.0]);
    }

    #[test]
    fn test_trim_with_grown_kept_duration_removes_nothing() {
        let mut store = store_with_times(&[0.0, 1.0, 2.0]);
        assert_eq!(store.trim(&retention(2.0, 100.0)), 0);
        assert_eq!(store.len(), 3);

        // A limit past every sample empties the store, never more.
        assert_eq!(store.trim(&retention(50.0, 1.0)), 3);
        assert!(store.is_empty());
        assert_eq!(store.trim(&retention(50.0, 1.0)), 0);
    }

    #[test]
    fn test_window_outside_range_is_empty() {
        let store = store_with_times(&[0.0, 1.0, 2.0]);

        let after = store.windowed_view(&WindowDescriptor::showing(5.0, 6.0));
        assert!(after.is_empty());
        assert_eq!(after.channels.len(), 1);
        assert!(after.channels[0].is_empty());
        assert_eq!(after.first_shown_index, 3);

        let before = store.windowed_view(&WindowDescriptor::showing(-3.0, -1.0));
        assert!(before.channels[0].is_empty());
        assert_eq!(before.first_shown_index, 0);
    }

    #[test]
    fn test_empty_store_queries() {
        let store = DataStore::new(3, 0.0);
        let window = WindowDescriptor::showing(0.0, 1.0);

        let view = store.windowed_view(&window);
        assert_eq!(view.channels.len(), 3);
        assert!(view.channels.iter().all(|c| c.is_empty()));
        assert_eq!(store.latest_in_window(&window), None);
    }

    #[test]
    fn test_window_is_half_open() {
        let store = store_with_times(&[0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);

        let view = store.windowed_view(&WindowDescriptor::showing(1.0, 2.0));

        assert_eq!(view.first_shown_index, 2);
        assert_eq!(view.times, &[1.0, 1.5]);
        assert_eq!(view.channels[0], &[10.0, 15.0]);
        for (offset, &t) in view.times.iter().enumerate() {
            assert_eq!(store.times()[view.first_shown_index + offset], t);
            assert!((1.0..2.0).contains(&t));
        }
    }

    #[test]
    fn test_negative_shown_duration_yields_empty_view() {
        let store = store_with_times(&[0.0, 1.0, 2.0]);
        let window = WindowDescriptor {
            first_shown_time: 1.0,
            shown_duration: -0.5,
            last_time: 2.0,
            kept_duration: 2.0,
        };
        let view = store.windowed_view(&window);
        assert!(view.is_empty());
        assert_eq!(view.first_shown_index, 1);
    }

    #[test]
    fn test_latest_in_window() {
        let store = store_with_times(&[0.0, 1.0, 2.0, 3.0]);

        let latest = store.latest_in_window(&WindowDescriptor::showing(1.5, 2.5));
        assert_eq!(latest, Some(vec![20.0]));

        // A right edge equal to a stored time excludes that sample.
        let latest = store.latest_in_window(&WindowDescriptor::showing(1.0, 2.0));
        assert_eq!(latest, Some(vec![10.0]));

        // Right edge past the data clamps to the newest sample.
        let latest = store.latest_in_window(&WindowDescriptor::showing(9.0, 10.0));
        assert_eq!(latest, Some(vec![30.0]));

        // Right edge before the data clamps to the oldest sample.
        let latest = store.latest_in_window(&WindowDescriptor::showing(-2.0, -1.0));
        assert_eq!(latest, Some(vec![0.0]));
    }

    #[test]
    fn test_snapshot_copies_view() {
        let store = store_with_times(&[0.0, 1.0, 2.0]);
        let snapshot = store
            .windowed_view(&WindowDescriptor::showing(1.0, 3.0))
            .to_snapshot();

        assert_eq!(snapshot.first_shown_index, 1);
        assert_eq!(snapshot.times, vec![1.0, 2.0]);
        assert_eq!(snapshot.channels, vec![vec![10.0, 20.0]]);
    }
}

//! Value plot component.
//!
//! A component owns the store for one plotted object. Frames from the
//! transport go in through [`ValueComponent::on_message`]; each redraw tick
//! calls [`ValueComponent::update`], which trims the store and hands the
//! renderer a [`ValueFrame`].

use crate::colors::{make_colors, Rgb};
use crate::stats::{ChannelSummary, SharedStreamStats};
use crate::store::{DataStore, IngestOutcome, TimeWindow};
use crate::wire::{FrameCodec, WireError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay between a data arrival and the redraw it triggers.
pub const DEFAULT_REDRAW_DEBOUNCE: Duration = Duration::from_millis(10);

/// Coalesces redraw requests: at most one redraw is pending at a time.
#[derive(Debug, Clone)]
pub struct RedrawScheduler {
    pending: bool,
    debounce: Duration,
}

impl RedrawScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            pending: false,
            debounce,
        }
    }

    /// Request a redraw. Returns `true` if the caller should arm a timer
    /// for [`debounce`](Self::debounce); `false` if one is already pending.
    pub fn schedule(&mut self) -> bool {
        !std::mem::replace(&mut self.pending, true)
    }

    /// Consume the pending request, if any.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }
}

impl Default for RedrawScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REDRAW_DEBOUNCE)
    }
}

/// One line of a value plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub color: Rgb,
    /// `[time, value]` pairs, oldest first
    pub points: Vec<[f64; 2]>,
}

/// Everything a renderer needs for one redraw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueFrame {
    pub uid: u64,
    pub label: String,
    pub first_shown_index: usize,
    pub traces: Vec<Trace>,
    /// Newest value per line at or before the window's right edge
    pub latest: Option<Vec<f64>>,
    pub summaries: Vec<ChannelSummary>,
}

/// A plotted object: its store, codec, line colours and redraw state.
#[derive(Debug)]
pub struct ValueComponent {
    uid: u64,
    label: String,
    store: DataStore,
    codec: FrameCodec,
    colors: Vec<Rgb>,
    redraw: RedrawScheduler,
    stats: Option<SharedStreamStats>,
}

impl ValueComponent {
    pub fn new(uid: u64, label: impl Into<String>, n_lines: usize, smoothing_constant: f64) -> Self {
        Self {
            uid,
            label: label.into(),
            store: DataStore::new(n_lines, smoothing_constant),
            codec: FrameCodec::new(n_lines),
            colors: make_colors(n_lines),
            redraw: RedrawScheduler::default(),
            stats: None,
        }
    }

    /// Report ingest and trim activity to `stats`.
    pub fn with_stats(mut self, stats: SharedStreamStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_redraw_debounce(mut self, debounce: Duration) -> Self {
        self.redraw = RedrawScheduler::new(debounce);
        self
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn n_lines(&self) -> usize {
        self.store.dimensions()
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn redraw(&mut self) -> &mut RedrawScheduler {
        &mut self.redraw
    }

    /// Decode a transport message and ingest its samples.
    ///
    /// Returns the number of samples stored. Undecodable messages and
    /// samples the store rejects are logged and skipped.
    pub fn on_message(&mut self, bytes: &[u8]) -> usize {
        match self.try_on_message(bytes) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(uid = self.uid, "dropping message: {e}");
                0
            }
        }
    }

    /// Like [`on_message`](Self::on_message), but a message that is not a
    /// whole number of frames is returned as an error.
    pub fn try_on_message(&mut self, bytes: &[u8]) -> Result<usize, WireError> {
        if let Some(stats) = &self.stats {
            stats.record_frame();
        }

        let samples = self.codec.decode(bytes).map_err(|e| {
            self.record_malformed();
            e
        })?;

        let mut stored = 0;
        for sample in &samples {
            match self.store.ingest(&sample.to_row()) {
                Ok(IngestOutcome::Appended) => stored += 1,
                Ok(IngestOutcome::Rewound { discarded }) => {
                    stored += 1;
                    if let Some(stats) = &self.stats {
                        stats.record_rewind(discarded as u64);
                    }
                }
                Err(e) => {
                    tracing::warn!(uid = self.uid, "dropping sample: {e}");
                    self.record_malformed();
                }
            }
        }

        if let Some(stats) = &self.stats {
            stats.record_samples(stored as u64);
        }
        if stored > 0 {
            self.redraw.schedule();
        }
        Ok(stored)
    }

    /// Newest stored timestamp, for advancing the time controller.
    pub fn last_time(&self) -> Option<f64> {
        self.store.last_time()
    }

    /// Drop history older than the window's retention limit.
    pub fn trim<W: TimeWindow + ?Sized>(&mut self, window: &W) -> usize {
        let trimmed = self.store.trim(window);
        if trimmed > 0 {
            if let Some(stats) = &self.stats {
                stats.record_trimmed(trimmed as u64);
            }
        }
        trimmed
    }

    /// Trim retired history and build the frame for `window`.
    ///
    /// Clears any pending redraw request.
    pub fn update<W: TimeWindow + ?Sized>(&mut self, window: &W) -> ValueFrame {
        self.redraw.take();
        self.trim(window);

        let view = self.store.windowed_view(window);
        let traces = view
            .channels
            .iter()
            .zip(&self.colors)
            .map(|(values, &color)| Trace {
                color,
                points: view
                    .times
                    .iter()
                    .zip(values.iter())
                    .map(|(&t, &v)| [t, v])
                    .collect(),
            })
            .collect();
        let summaries = view.channels.iter().map(|c| ChannelSummary::of(c)).collect();

        ValueFrame {
            uid: self.uid,
            label: self.label.clone(),
            first_shown_index: view.first_shown_index,
            traces,
            latest: self.store.latest_in_window(window),
            summaries,
        }
    }

    fn record_malformed(&self) {
        if let Some(stats) = &self.stats {
            stats.record_malformed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::create_shared_stats;
    use crate::store::WindowDescriptor;

    fn frames(codec: &FrameCodec, rows: &[(f64, f64)]) -> Vec<u8> {
        rows.iter()
            .flat_map(|&(t, v)| codec.encode(t, &[v]).unwrap())
            .collect()
    }

    #[test]
    fn test_redraw_requests_coalesce() {
        let mut redraw = RedrawScheduler::default();
        assert!(redraw.schedule());
        assert!(!redraw.schedule());
        assert!(redraw.is_pending());
        assert!(redraw.take());
        assert!(!redraw.take());
        assert!(redraw.schedule());
        assert_eq!(redraw.debounce(), Duration::from_millis(10));
    }

    #[test]
    fn test_message_ingest_and_update() {
        let stats = create_shared_stats();
        let mut component = ValueComponent::new(7, "a", 1, 0.0).with_stats(stats.clone());
        let codec = FrameCodec::new(1);

        let stored = component.on_message(&frames(&codec, &[(0.0, 1.0), (0.5, 2.0), (1.0, 3.0)]));
        assert_eq!(stored, 3);
        assert!(component.redraw().is_pending());

        let frame = component.update(&WindowDescriptor::showing(0.5, 1.5));
        assert!(!component.redraw().is_pending());
        assert_eq!(frame.uid, 7);
        assert_eq!(frame.first_shown_index, 0);
        assert_eq!(frame.traces.len(), 1);
        assert_eq!(frame.traces[0].points, vec![[0.5, 2.0], [1.0, 3.0]]);
        assert_eq!(frame.latest, Some(vec![3.0]));
        assert_eq!(frame.summaries[0].count, 2);

        // The sample at 0.0 fell behind the retention limit of 0.5.
        assert_eq!(component.store().len(), 2);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.samples_ingested, 3);
        assert_eq!(snapshot.samples_trimmed, 1);
    }

    #[test]
    fn test_rewind_is_counted() {
        let stats = create_shared_stats();
        let mut component = ValueComponent::new(1, "b", 1, 0.0).with_stats(stats.clone());
        let codec = FrameCodec::new(1);

        component.on_message(&frames(&codec, &[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]));
        component.on_message(&frames(&codec, &[(0.5, 9.0)]));

        assert_eq!(component.store().times(), &[0.0, 0.5]);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.rewinds, 1);
        assert_eq!(snapshot.samples_discarded, 2);
    }

    #[test]
    fn test_malformed_message_is_skipped() {
        let stats = create_shared_stats();
        let mut component = ValueComponent::new(2, "c", 2, 0.0).with_stats(stats.clone());

        assert_eq!(component.on_message(&[0u8; 5]), 0);
        assert!(component.try_on_message(&[0u8; 7]).is_err());
        assert!(component.store().is_empty());
        assert!(!component.redraw().is_pending());
        assert_eq!(stats.snapshot().malformed, 2);
        assert_eq!(stats.snapshot().frames_received, 2);
    }

    #[test]
    fn test_one_color_per_line() {
        let component = ValueComponent::new(3, "d", 4, 0.01);
        assert_eq!(component.colors().len(), 4);
        assert_eq!(component.n_lines(), 4);
    }
}

//! Time-window accessors used to query a [`DataStore`](super::DataStore).
//!
//! The store never owns its window: every query receives something that
//! implements [`TimeWindow`], so one time-range controller can drive any
//! number of stores.

use serde::{Deserialize, Serialize};

/// Read-only view of the time range currently rendered and retained.
pub trait TimeWindow {
    /// Left edge of the shown window (seconds).
    fn first_shown_time(&self) -> f64;
    /// Width of the shown window (seconds).
    fn shown_duration(&self) -> f64;
    /// Most recent simulation time seen by the controller.
    fn last_time(&self) -> f64;
    /// Length of trailing history to keep before trimming.
    fn kept_duration(&self) -> f64;

    /// Right edge of the shown window, `first_shown_time + shown_duration`.
    fn window_end(&self) -> f64 {
        self.first_shown_time() + self.shown_duration()
    }

    /// Samples older than this are eligible for trimming.
    fn retention_limit(&self) -> f64 {
        self.last_time() - self.kept_duration()
    }
}

impl<T: TimeWindow + ?Sized> TimeWindow for &T {
    fn first_shown_time(&self) -> f64 {
        (**self).first_shown_time()
    }
    fn shown_duration(&self) -> f64 {
        (**self).shown_duration()
    }
    fn last_time(&self) -> f64 {
        (**self).last_time()
    }
    fn kept_duration(&self) -> f64 {
        (**self).kept_duration()
    }
}

/// Plain snapshot of the four window values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowDescriptor {
    pub first_shown_time: f64,
    pub shown_duration: f64,
    pub last_time: f64,
    pub kept_duration: f64,
}

impl WindowDescriptor {
    /// A window showing `[t1, t2)` that keeps everything from `t1` on.
    pub fn showing(t1: f64, t2: f64) -> Self {
        Self {
            first_shown_time: t1,
            shown_duration: t2 - t1,
            last_time: t2,
            kept_duration: t2 - t1,
        }
    }
}

impl TimeWindow for WindowDescriptor {
    fn first_shown_time(&self) -> f64 {
        self.first_shown_time
    }
    fn shown_duration(&self) -> f64 {
        self.shown_duration
    }
    fn last_time(&self) -> f64 {
        self.last_time
    }
    fn kept_duration(&self) -> f64 {
        self.kept_duration
    }
}

/// Time-range controller behind the visualizer's time slider.
///
/// Follows the live edge of the simulation by default. Scrubbing detaches
/// it; the shown window then stays put (within the kept history) until
/// [`follow_live`](Self::follow_live) is called.
#[derive(Debug, Clone)]
pub struct TimeSlider {
    last_time: f64,
    shown_duration: f64,
    kept_duration: f64,
    first_shown_time: f64,
    live: bool,
}

impl TimeSlider {
    /// Create a slider at time zero. `kept_duration` is raised to
    /// `shown_duration` if it is shorter.
    pub fn new(shown_duration: f64, kept_duration: f64) -> Self {
        let shown_duration = shown_duration.max(0.0);
        let mut slider = Self {
            last_time: 0.0,
            shown_duration,
            kept_duration: kept_duration.max(shown_duration),
            first_shown_time: 0.0,
            live: true,
        };
        slider.reposition();
        slider
    }

    /// Record a new simulation time from the data stream.
    ///
    /// A time earlier than the current one is treated as a restart from that
    /// point, matching the store's rewind rule.
    pub fn advance(&mut self, time: f64) {
        if !time.is_finite() {
            return;
        }
        self.last_time = time;
        self.reposition();
    }

    /// Move the left edge of the shown window, detaching from the live edge.
    pub fn scrub_to(&mut self, first_shown_time: f64) {
        self.live = false;
        self.first_shown_time = first_shown_time;
        self.reposition();
    }

    /// Re-attach the shown window to the live edge.
    pub fn follow_live(&mut self) {
        self.live = true;
        self.reposition();
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn set_shown_duration(&mut self, duration: f64) {
        self.shown_duration = duration.max(0.0);
        self.kept_duration = self.kept_duration.max(self.shown_duration);
        self.reposition();
    }

    pub fn set_kept_duration(&mut self, duration: f64) {
        self.kept_duration = duration.max(self.shown_duration);
        self.reposition();
    }

    /// Back to time zero, following live.
    pub fn reset(&mut self) {
        self.last_time = 0.0;
        self.live = true;
        self.reposition();
    }

    /// Copy of the current window values.
    pub fn descriptor(&self) -> WindowDescriptor {
        WindowDescriptor {
            first_shown_time: self.first_shown_time,
            shown_duration: self.shown_duration,
            last_time: self.last_time,
            kept_duration: self.kept_duration,
        }
    }

    fn reposition(&mut self) {
        let newest = self.last_time - self.shown_duration;
        if self.live {
            self.first_shown_time = newest;
        } else {
            let oldest = self.last_time - self.kept_duration;
            self.first_shown_time = self.first_shown_time.max(oldest).min(newest);
        }
    }
}

impl Default for TimeSlider {
    fn default() -> Self {
        Self::new(0.5, 4.0)
    }
}

impl TimeWindow for TimeSlider {
    fn first_shown_time(&self) -> f64 {
        self.first_shown_time
    }
    fn shown_duration(&self) -> f64 {
        self.shown_duration
    }
    fn last_time(&self) -> f64 {
        self.last_time
    }
    fn kept_duration(&self) -> f64 {
        self.kept_duration
    }
}

//! Mutex-guarded store for producer and consumer on separate threads.

use crate::store::data_store::{DataStore, IngestOutcome, StoreError, WindowSnapshot};
use crate::store::window::TimeWindow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A [`DataStore`] behind a single mutex.
///
/// Every operation takes the lock for its whole duration, so a reader never
/// sees a timestamp without its channel values. Reads return owned copies.
#[derive(Debug, Clone)]
pub struct SharedDataStore {
    inner: Arc<Mutex<DataStore>>,
}

impl SharedDataStore {
    pub fn new(store: DataStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn ingest(&self, row: &[f64]) -> Result<IngestOutcome, StoreError> {
        self.lock().ingest(row)
    }

    pub fn trim<W: TimeWindow + ?Sized>(&self, window: &W) -> usize {
        self.lock().trim(window)
    }

    pub fn windowed_view<W: TimeWindow + ?Sized>(&self, window: &W) -> WindowSnapshot {
        self.lock().windowed_view(window).to_snapshot()
    }

    pub fn latest_in_window<W: TimeWindow + ?Sized>(&self, window: &W) -> Option<Vec<f64>> {
        self.lock().latest_in_window(window)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run `f` with exclusive access to the store.
    pub fn with<R>(&self, f: impl FnOnce(&mut DataStore) -> R) -> R {
        f(&mut self.lock())
    }

    // Every mutation completes before the guard drops, so a poisoned lock
    // still holds a consistent store.
    fn lock(&self) -> MutexGuard<'_, DataStore> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<DataStore> for SharedDataStore {
    fn from(store: DataStore) -> Self {
        Self::new(store)
    }
}

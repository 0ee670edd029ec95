// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! View observers for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use ripple_core::{Change, ObserverError, ViewObserver};
use ripple_feed::Key;

/// Records every change it receives.
///
/// Clones share the log, so one clone can be moved into the store while the
/// test keeps the other.
///
/// # Example
///
/// ```
/// use ripple_core::{IdentityPolicy, MatchAll, Store, ViewSpec};
/// use ripple_dry_tests::{RecordingObserver, UpdateBuilder};
///
/// let mut store = Store::new(IdentityPolicy::PositionKeyed);
/// let (view, _cancel) = store.register_view(ViewSpec::new(MatchAll));
/// let recorder = RecordingObserver::new();
/// store.subscribe(view, recorder.clone()).unwrap();
///
/// store.apply(UpdateBuilder::slot(0).field("v", 1).event()).unwrap();
/// assert_eq!(recorder.diffs(), vec![(ripple_feed::Key::Int(0), -1, 0)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    log: Arc<Mutex<Vec<Change>>>,
}

impl RecordingObserver {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, in delivery order.
    pub fn changes(&self) -> Vec<Change> {
        self.lock().clone()
    }

    /// `(key, old, new)` triples in the `-1 = absent` convention.
    pub fn diffs(&self) -> Vec<(Key, i64, i64)> {
        self.lock()
            .iter()
            .map(|c| {
                let (old, new) = c.as_diff();
                (c.key.clone(), old, new)
            })
            .collect()
    }

    /// Number of recorded changes.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Change>> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ViewObserver for RecordingObserver {
    fn on_change(&mut self, change: &Change) -> Result<(), ObserverError> {
        self.lock().push(change.clone());
        Ok(())
    }
}

/// Fails on every call, or only from the n-th call on.
#[derive(Debug, Clone, Default)]
pub struct FailingObserver {
    calls: Arc<AtomicUsize>,
    fail_from: usize,
}

impl FailingObserver {
    /// Fails every call.
    pub fn always() -> Self {
        Self::default()
    }

    /// Succeeds `ok_calls` times, then fails.
    pub fn after(ok_calls: usize) -> Self {
        Self {
            calls: Arc::default(),
            fail_from: ok_calls,
        }
    }

    /// Calls received so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ViewObserver for FailingObserver {
    fn on_change(&mut self, change: &Change) -> Result<(), ObserverError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.fail_from {
            return Err(ObserverError::new(format!(
                "refused change of {} in {}",
                change.key, change.view
            )));
        }
        Ok(())
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Live views: a filter, an optional ordering, and the materialized sequence.
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use ripple_feed::Key;
use rustc_hash::FxHashMap;

use crate::filter::Filter;
use crate::object::StoredObject;
use crate::observer::ViewObserver;
use crate::sort::{SortError, SortSpec};

/// Identifier of a view within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(pub u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// Handle returned by registration; names the view in store calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle {
    id: ViewId,
}

impl ViewHandle {
    pub(crate) fn new(id: ViewId) -> Self {
        Self { id }
    }

    /// The view's identifier.
    pub fn id(&self) -> ViewId {
        self.id
    }
}

/// Cancellation capability for one view.
///
/// `cancel()` takes effect immediately: no notification for the view is
/// delivered after it returns, including for events that were already queued.
/// Cloning shares the same flag. Cancelling twice is a no-op.
#[derive(Debug, Clone)]
pub struct Cancel {
    id: ViewId,
    flag: Arc<AtomicBool>,
}

impl Cancel {
    pub(crate) fn new(id: ViewId, flag: Arc<AtomicBool>) -> Self {
        Self { id, flag }
    }

    /// The view this capability cancels.
    pub fn view(&self) -> ViewId {
        self.id
    }

    /// Stops the view.
    pub fn cancel(&self) {
        self.flag.store(true, AtomicOrdering::SeqCst);
    }

    /// True once cancelled (by this capability or by unregistration).
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(AtomicOrdering::SeqCst)
    }
}

/// Registration parameters of a view.
#[derive(Clone)]
pub struct ViewSpec {
    /// Membership predicate.
    pub filter: Arc<dyn Filter>,
    /// Optional ordering; `None` keeps natural arrival order.
    pub sort: Option<SortSpec>,
}

impl ViewSpec {
    /// Unsorted view over `filter`.
    pub fn new<F>(filter: F) -> Self
    where
        F: Filter + 'static,
    {
        Self {
            filter: Arc::new(filter),
            sort: None,
        }
    }

    /// Adds an ordering.
    pub fn sorted(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }
}

impl fmt::Debug for ViewSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewSpec")
            .field("sort", &self.sort)
            .finish_non_exhaustive()
    }
}

/// One materialized row of a view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewEntry {
    /// Cache key.
    pub key: Key,
    /// Same instance the cache holds (as of the last event that touched it).
    pub object: Arc<StoredObject>,
}

/// Materialized view state.
pub(crate) struct View {
    pub(crate) id: ViewId,
    pub(crate) filter: Arc<dyn Filter>,
    pub(crate) sort: Option<SortSpec>,
    pub(crate) observer: Option<Box<dyn ViewObserver + Send>>,
    cancelled: Arc<AtomicBool>,
    entries: Vec<ViewEntry>,
    /// Reverse index: key → current index in `entries`.
    positions: FxHashMap<Key, usize>,
}

impl View {
    pub(crate) fn new(id: ViewId, spec: ViewSpec, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            id,
            filter: spec.filter,
            sort: spec.sort,
            observer: None,
            cancelled,
            entries: Vec::new(),
            positions: FxHashMap::default(),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::SeqCst)
    }

    pub(crate) fn mark_cancelled(&self) {
        self.cancelled.store(true, AtomicOrdering::SeqCst);
    }

    pub(crate) fn entries(&self) -> &[ViewEntry] {
        &self.entries
    }

    pub(crate) fn position(&self, key: &Key) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// Re-points the entry at `index` to a newer instance of the same object.
    pub(crate) fn replace_at(&mut self, index: usize, object: Arc<StoredObject>) {
        self.entries[index].object = object;
    }

    pub(crate) fn push(&mut self, entry: ViewEntry) -> usize {
        let index = self.entries.len();
        self.positions.insert(entry.key.clone(), index);
        self.entries.push(entry);
        index
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> ViewEntry {
        let entry = self.entries.remove(index);
        self.positions.remove(&entry.key);
        self.reindex_from(index);
        entry
    }

    pub(crate) fn insert_at(&mut self, index: usize, entry: ViewEntry) {
        self.positions.insert(entry.key.clone(), index);
        self.entries.insert(index, entry);
        self.reindex_from(index + 1);
    }

    /// Upper-bound binary search: the index after every entry that does not
    /// compare greater than `object`. Unsorted views append.
    pub(crate) fn insertion_point(&self, object: &StoredObject) -> Result<usize, SortError> {
        let Some(sort) = &self.sort else {
            return Ok(self.entries.len());
        };
        let (mut lo, mut hi) = (0, self.entries.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if sort.compare(&self.entries[mid].object, object)? == std::cmp::Ordering::Greater {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        Ok(lo)
    }

    fn reindex_from(&mut self, start: usize) {
        for (offset, entry) in self.entries[start..].iter().enumerate() {
            if let Some(slot) = self.positions.get_mut(&entry.key) {
                *slot = start + offset;
            }
        }
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id)
            .field("sort", &self.sort)
            .field("len", &self.entries.len())
            .field("observed", &self.observer.is_some())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

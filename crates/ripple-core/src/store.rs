// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The store: cache, identity policy, and live views of one subscription.
use std::sync::Arc;

use ripple_feed::{FeedEvent, Fields, ItemUpdate, Key};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::ObjectCache;
use crate::filter::Filter;
use crate::identity::{derive_key, IdentityPolicy, InvalidEvent, SequenceState};
use crate::maintain::{maintain, maintain_and_notify, Delivery, Mutation};
use crate::object::StoredObject;
use crate::observer::{ObserverError, ViewObserver};
use crate::query::{self, QueryOptions};
use crate::registry::ViewRegistry;
use crate::sort::SortError;
use crate::view::{Cancel, ViewEntry, ViewHandle, ViewId, ViewSpec};

/// Errors raised by store calls that name a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The handle names a view that was unregistered or cancelled.
    #[error("unknown or cancelled view {0}")]
    UnknownView(ViewId),
}

/// Why one view could not be maintained or notified for an event.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    /// The view's observer returned an error. The view itself was updated.
    #[error(transparent)]
    Observer(#[from] ObserverError),
    /// The view's ordering failed. The view was left as it was before the event.
    #[error(transparent)]
    Sort(#[from] SortError),
}

/// A [`ViewError`] tagged with the view it happened in.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{view}: {error}")]
pub struct ViewFailure {
    /// Failing view.
    pub view: ViewId,
    /// What went wrong.
    pub error: ViewError,
}

/// Outcome of applying one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Key the event resolved to; `None` for lifecycle and end-of-snapshot
    /// events.
    pub key: Option<Key>,
    /// Cache state after an upsert, or the object as it was before a removal.
    pub object: Option<Arc<StoredObject>>,
    /// True when the event removed its key.
    pub removal: bool,
    /// Number of view changes the event produced.
    pub changes: usize,
    /// Per-view failures; other views were still maintained.
    pub failures: Vec<ViewFailure>,
}

impl ApplyReport {
    /// True when no view failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn absorb(&mut self, delivery: Delivery) {
        self.changes += delivery.changes;
        self.failures.extend(delivery.failures);
    }
}

/// Keyed object cache plus incrementally maintained views.
///
/// Single-writer: all mutation goes through `&mut self`, one event at a time.
/// Views and their observers are owned by the store.
#[derive(Debug, Default)]
pub struct Store {
    policy: IdentityPolicy,
    sequence: SequenceState,
    cache: ObjectCache,
    views: ViewRegistry,
    snapshot_complete: bool,
}

impl Store {
    /// Creates an empty store with a fixed identity policy.
    pub fn new(policy: IdentityPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Identity policy fixed at construction.
    pub fn policy(&self) -> IdentityPolicy {
        self.policy
    }

    /// Sequence counter state (meaningful for sequence-keyed stores).
    pub fn sequence(&self) -> &SequenceState {
        &self.sequence
    }

    /// Applies one feed event.
    ///
    /// # Errors
    ///
    /// [`InvalidEvent`] when an item update has no usable key. The store is
    /// unchanged in that case.
    pub fn apply(&mut self, event: FeedEvent) -> Result<ApplyReport, InvalidEvent> {
        match event {
            FeedEvent::ItemUpdate(update) => self.apply_update(update),
            FeedEvent::EndOfSnapshot => {
                debug!(objects = self.cache.len(), "end of snapshot");
                self.snapshot_complete = true;
                Ok(ApplyReport::default())
            }
            FeedEvent::SubscriptionState(state) => {
                info!(?state, "subscription lifecycle changed; resetting");
                Ok(self.reset())
            }
        }
    }

    /// Applies one item update.
    ///
    /// # Errors
    ///
    /// [`InvalidEvent`] when the update has no usable key.
    pub fn apply_update(&mut self, update: ItemUpdate) -> Result<ApplyReport, InvalidEvent> {
        let derived = derive_key(self.policy, &update, &mut self.sequence).inspect_err(|err| {
            warn!(%err, "dropping update");
        })?;
        if derived.is_removal {
            Ok(self.remove(&derived.key))
        } else {
            Ok(self.upsert(derived.key, update.fields))
        }
    }

    /// Merges `patch` into `key` and maintains every view.
    pub fn upsert(&mut self, key: Key, patch: Fields) -> ApplyReport {
        let object = self.cache.upsert(key.clone(), patch);
        debug!(key = %key, "upserted");
        let delivery = maintain(
            &mut self.views,
            &key,
            &Mutation::Upserted(Arc::clone(&object)),
            self.policy,
        );
        let mut report = ApplyReport {
            key: Some(key),
            object: Some(object),
            ..ApplyReport::default()
        };
        report.absorb(delivery);
        report
    }

    /// Deletes `key` and maintains every view. Unknown keys are a no-op.
    pub fn remove(&mut self, key: &Key) -> ApplyReport {
        let previous = self.cache.remove(key);
        debug!(key = %key, existed = previous.is_some(), "removed");
        let delivery = maintain(&mut self.views, key, &Mutation::Deleted, self.policy);
        let mut report = ApplyReport {
            key: Some(key.clone()),
            object: previous,
            removal: true,
            ..ApplyReport::default()
        };
        report.absorb(delivery);
        report
    }

    /// Empties the cache, notifying a removal for every object each view held.
    ///
    /// Views stay registered (now empty) and are refilled by later events.
    /// The end-of-snapshot flag is cleared; the sequence counter is not.
    pub fn reset(&mut self) -> ApplyReport {
        self.snapshot_complete = false;
        let mut report = ApplyReport {
            removal: true,
            ..ApplyReport::default()
        };
        for (key, object) in self.cache.drain() {
            let delivery = maintain(&mut self.views, &key, &Mutation::Evicted(object), self.policy);
            report.absorb(delivery);
        }
        debug!(changes = report.changes, "reset complete");
        report
    }

    /// Registers a view. It starts empty; see [`Store::seed_view`].
    pub fn register_view(&mut self, spec: ViewSpec) -> (ViewHandle, Cancel) {
        let registered = self.views.register(spec);
        debug!(view = %registered.0.id(), "view registered");
        registered
    }

    /// Attaches `observer` to a view, replacing any previous one.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownView`] if the view is gone.
    pub fn subscribe<O>(&mut self, view: ViewHandle, observer: O) -> Result<(), StoreError>
    where
        O: ViewObserver + Send + 'static,
    {
        self.subscribe_boxed(view, Box::new(observer))
    }

    /// [`Store::subscribe`] for an already boxed observer.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownView`] if the view is gone.
    pub fn subscribe_boxed(
        &mut self,
        view: ViewHandle,
        observer: Box<dyn ViewObserver + Send>,
    ) -> Result<(), StoreError> {
        let target = self
            .views
            .get_mut(view.id())
            .ok_or(StoreError::UnknownView(view.id()))?;
        target.observer = Some(observer);
        Ok(())
    }

    /// Removes a view. Returns false if it was already gone.
    pub fn unregister_view(&mut self, view: ViewHandle) -> bool {
        let removed = self.views.unregister(view.id());
        if removed {
            debug!(view = %view.id(), "view unregistered");
        }
        removed
    }

    /// Feeds every cached object through one view, as if each had just been
    /// upserted, notifying only that view's observer.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownView`] if the view is gone.
    pub fn seed_view(&mut self, view: ViewHandle) -> Result<ApplyReport, StoreError> {
        let target = self
            .views
            .get_mut(view.id())
            .ok_or(StoreError::UnknownView(view.id()))?;
        let mut delivery = Delivery::default();
        for (key, object) in self.cache.iter() {
            // The observer may cancel its own view mid-seed.
            if target.is_cancelled() {
                break;
            }
            let mutation = Mutation::Upserted(Arc::clone(object));
            maintain_and_notify(target, key, &mutation, self.policy, &mut delivery);
        }
        let mut report = ApplyReport::default();
        report.absorb(delivery);
        Ok(report)
    }

    /// Point lookup in the cache.
    pub fn get(&self, key: &Key) -> Option<&Arc<StoredObject>> {
        self.cache.get(key)
    }

    /// The cache itself, read-only.
    pub fn cache(&self) -> &ObjectCache {
        &self.cache
    }

    /// One-shot snapshot query; nothing is registered.
    ///
    /// Membership follows the same rule as views, so command delete markers
    /// never appear in the result.
    ///
    /// # Errors
    ///
    /// [`SortError`] if the requested ordering fails.
    pub fn query(
        &self,
        filter: &dyn Filter,
        options: &QueryOptions,
    ) -> Result<Vec<Arc<StoredObject>>, SortError> {
        query::run(&self.cache, filter, options, self.policy)
    }

    /// Current contents of a view, in view order.
    pub fn view_entries(&self, view: ViewHandle) -> Option<&[ViewEntry]> {
        self.views.get(view.id()).map(|v| v.entries())
    }

    /// Number of live views.
    pub fn view_count(&self) -> usize {
        self.views.live_count()
    }

    /// Number of cached objects.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// True if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// True once end-of-snapshot was seen since the last reset.
    pub fn snapshot_complete(&self) -> bool {
        self.snapshot_complete
    }
}

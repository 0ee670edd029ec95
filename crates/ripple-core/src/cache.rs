// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical key → object mapping.
use std::collections::BTreeMap;
use std::sync::Arc;

use ripple_feed::{Fields, Key};

use crate::object::StoredObject;

/// Single source of truth for object state.
///
/// Objects are shared with views through `Arc`. A patch on an object that a
/// view still references produces a new instance (copy-on-write); the
/// maintainer then re-points the views at it.
#[derive(Debug, Clone, Default)]
pub struct ObjectCache {
    /// `BTreeMap` for deterministic iteration (resets, queries, seeding).
    objects: BTreeMap<Key, Arc<StoredObject>>,
}

impl ObjectCache {
    /// Creates an empty cache.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `patch` into the object for `key`, creating it when absent.
    ///
    /// Returns the merged object; its `id` always equals `key`.
    pub fn upsert(&mut self, key: Key, patch: Fields) -> Arc<StoredObject> {
        let slot = self
            .objects
            .entry(key)
            .or_insert_with_key(|k| Arc::new(StoredObject::new(k.clone())));
        Arc::make_mut(slot).merge(patch);
        Arc::clone(slot)
    }

    /// Deletes `key`, returning the object as it was just before removal.
    pub fn remove(&mut self, key: &Key) -> Option<Arc<StoredObject>> {
        self.objects.remove(key)
    }

    /// Point lookup; unknown keys are `None`, never an error.
    #[inline]
    pub fn get(&self, key: &Key) -> Option<&Arc<StoredObject>> {
        self.objects.get(key)
    }

    /// True if `key` is present.
    #[inline]
    pub fn contains(&self, key: &Key) -> bool {
        self.objects.contains_key(key)
    }

    /// Number of cached objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if the cache holds nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterates objects in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Arc<StoredObject>)> {
        self.objects.iter()
    }

    /// Removes everything, yielding the removed entries in key order.
    ///
    /// Crate-private: only the store may clear the cache, because views must
    /// be emptied in the same step.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = (Key, Arc<StoredObject>)> {
        std::mem::take(&mut self.objects).into_iter()
    }
}

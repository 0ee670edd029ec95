// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Active views of one store, in registration order.
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::view::{Cancel, View, ViewHandle, ViewId, ViewSpec};

/// Owned by a [`Store`](crate::Store); never process-wide.
#[derive(Debug, Default)]
pub(crate) struct ViewRegistry {
    /// Registration order is visiting order. Ids are monotonic, so the vector
    /// is also sorted by id.
    views: Vec<View>,
    next_id: u64,
}

impl ViewRegistry {
    pub(crate) fn register(&mut self, spec: ViewSpec) -> (ViewHandle, Cancel) {
        let id = ViewId(self.next_id);
        self.next_id += 1;
        let flag = Arc::new(AtomicBool::new(false));
        self.views.push(View::new(id, spec, Arc::clone(&flag)));
        (ViewHandle::new(id), Cancel::new(id, flag))
    }

    /// Removes a view. Returns false if it was already gone.
    pub(crate) fn unregister(&mut self, id: ViewId) -> bool {
        match self.index_of(id) {
            Some(idx) => {
                let view = self.views.remove(idx);
                view.mark_cancelled();
                true
            }
            None => false,
        }
    }

    /// Drops views whose cancel capability fired.
    pub(crate) fn prune_cancelled(&mut self) {
        self.views.retain(|v| !v.is_cancelled());
    }

    pub(crate) fn get(&self, id: ViewId) -> Option<&View> {
        self.index_of(id).map(|idx| &self.views[idx])
    }

    pub(crate) fn get_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.index_of(id).map(move |idx| &mut self.views[idx])
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut View> {
        self.views.iter_mut()
    }

    /// Number of live (not cancelled) views.
    pub(crate) fn live_count(&self) -> usize {
        self.views.iter().filter(|v| !v.is_cancelled()).count()
    }

    /// Cancelled views are invisible even before pruning.
    fn index_of(&self, id: ViewId) -> Option<usize> {
        self.views
            .binary_search_by_key(&id, |v| v.id)
            .ok()
            .filter(|&idx| !self.views[idx].is_cancelled())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::filter::MatchAll;

    #[test]
    fn ids_are_monotonic_and_ordered() {
        let mut reg = ViewRegistry::default();
        let (a, _) = reg.register(ViewSpec::new(MatchAll));
        let (b, _) = reg.register(ViewSpec::new(MatchAll));
        assert!(a.id() < b.id());
        let order: Vec<_> = reg.iter_mut().map(|v| v.id).collect();
        assert_eq!(order, vec![a.id(), b.id()]);
    }

    #[test]
    fn unregister_is_idempotent_and_fires_cancel_flag() {
        let mut reg = ViewRegistry::default();
        let (h, cancel) = reg.register(ViewSpec::new(MatchAll));
        assert!(reg.unregister(h.id()));
        assert!(cancel.is_cancelled());
        assert!(!reg.unregister(h.id()));
        assert_eq!(reg.live_count(), 0);
    }

    #[test]
    fn cancelled_views_are_hidden_before_prune() {
        let mut reg = ViewRegistry::default();
        let (h, cancel) = reg.register(ViewSpec::new(MatchAll));
        cancel.cancel();
        assert!(reg.get(h.id()).is_none());
        assert!(!reg.unregister(h.id()));
        reg.prune_cancelled();
        assert_eq!(reg.iter_mut().count(), 0);
    }
}

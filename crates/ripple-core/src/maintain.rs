// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Incremental view maintenance.
//!
//! Invoked once per cache mutation. For each live view, in registration order:
//!
//! 1. **Locate** the key through the view's reverse index (`old`).
//! 2. **Classify**: the object matches if it still exists, is not a command
//!    feed's delete marker, and passes the view's filter.
//! 3. **Not matching**: splice out if present and report `(old, None)`.
//! 4. **Matching, unsorted**: append (`(None, last)`) or keep the slot and
//!    re-point the entry at the new instance (`(old, old)`).
//! 5. **Matching, sorted**: splice out if present, binary-search the new slot
//!    over the remaining entries, splice in, report `(old, new)` with the
//!    pre-removal `old`.
//!
//! A comparator failure restores the view to its pre-event state and is
//! reported as a [`ViewFailure`]; an observer failure is reported the same
//! way. Neither stops the remaining views from being maintained.

use std::sync::Arc;

use ripple_feed::Key;
use tracing::{debug, warn};

use crate::identity::IdentityPolicy;
use crate::object::StoredObject;
use crate::observer::Change;
use crate::registry::ViewRegistry;
use crate::sort::SortError;
use crate::store::{ViewError, ViewFailure};
use crate::view::{View, ViewEntry};

/// What happened to a key in the cache.
#[derive(Debug, Clone)]
pub(crate) enum Mutation {
    /// The key now maps to this merged object.
    Upserted(Arc<StoredObject>),
    /// The key was deleted; its data no longer exists.
    Deleted,
    /// The key was dropped by a lifecycle reset; this is its last state.
    Evicted(Arc<StoredObject>),
}

/// Outcome of maintaining one mutation across views.
#[derive(Debug, Default)]
pub(crate) struct Delivery {
    pub(crate) changes: usize,
    pub(crate) failures: Vec<ViewFailure>,
}

/// Applies `mutation` of `key` to every live view.
pub(crate) fn maintain(
    registry: &mut ViewRegistry,
    key: &Key,
    mutation: &Mutation,
    policy: IdentityPolicy,
) -> Delivery {
    registry.prune_cancelled();
    let mut delivery = Delivery::default();
    for view in registry.iter_mut() {
        // An observer earlier in this pass may have cancelled this view.
        if view.is_cancelled() {
            continue;
        }
        maintain_and_notify(view, key, mutation, policy, &mut delivery);
    }
    delivery
}

/// Maintains one view and delivers the resulting change, if any.
pub(crate) fn maintain_and_notify(
    view: &mut View,
    key: &Key,
    mutation: &Mutation,
    policy: IdentityPolicy,
    delivery: &mut Delivery,
) {
    match maintain_view(view, key, mutation, policy) {
        Ok(Some(change)) => {
            debug!(
                view = %view.id,
                key = %key,
                old = ?change.old_position,
                new = ?change.new_position,
                "view changed"
            );
            delivery.changes += 1;
            if let Some(observer) = view.observer.as_mut() {
                if let Err(err) = observer.on_change(&change) {
                    warn!(view = %view.id, key = %key, %err, "observer failed");
                    delivery.failures.push(ViewFailure {
                        view: view.id,
                        error: ViewError::Observer(err),
                    });
                }
            }
        }
        Ok(None) => {}
        Err(err) => {
            warn!(view = %view.id, key = %key, %err, "comparator failed; view left unchanged");
            delivery.failures.push(ViewFailure {
                view: view.id,
                error: ViewError::Sort(err),
            });
        }
    }
}

/// Computes and applies the structural change of one view.
///
/// Returns `Ok(None)` when the view is unaffected.
fn maintain_view(
    view: &mut View,
    key: &Key,
    mutation: &Mutation,
    policy: IdentityPolicy,
) -> Result<Option<Change>, SortError> {
    let old = view.position(key);

    let matching = match mutation {
        Mutation::Upserted(object) => Some(object),
        Mutation::Deleted | Mutation::Evicted(_) => None,
    }
    .filter(|object| {
        !(policy == IdentityPolicy::ExplicitKeyed && object.is_delete_marker())
            && view.filter.matches(object)
    });

    let id = view.id;
    let change = |object: Arc<StoredObject>, old_position, new_position| Change {
        view: id,
        key: key.clone(),
        object,
        old_position,
        new_position,
    };

    let Some(object) = matching else {
        let Some(old) = old else {
            return Ok(None);
        };
        let payload = match mutation {
            Mutation::Upserted(object) | Mutation::Evicted(object) => Arc::clone(object),
            Mutation::Deleted => Arc::new(StoredObject::placeholder(key.clone())),
        };
        let removed = change(payload, Some(old), None);
        view.remove_at(old);
        return Ok(Some(removed));
    };

    if view.sort.is_none() {
        let result = match old {
            Some(at) => {
                view.replace_at(at, Arc::clone(object));
                change(Arc::clone(object), Some(at), Some(at))
            }
            None => {
                let at = view.push(ViewEntry {
                    key: key.clone(),
                    object: Arc::clone(object),
                });
                change(Arc::clone(object), None, Some(at))
            }
        };
        return Ok(Some(result));
    }

    let displaced = old.map(|at| (at, view.remove_at(at)));
    let new = match view.insertion_point(object) {
        Ok(at) => at,
        Err(err) => {
            if let Some((at, entry)) = displaced {
                view.insert_at(at, entry);
            }
            return Err(err);
        }
    };
    view.insert_at(
        new,
        ViewEntry {
            key: key.clone(),
            object: Arc::clone(object),
        },
    );
    Ok(Some(change(Arc::clone(object), old, Some(new))))
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Position-diff notifications delivered to view observers.
use std::sync::Arc;

use ripple_feed::Key;
use thiserror::Error;

use crate::object::StoredObject;
use crate::view::ViewId;

/// One structural change to one view, caused by one event.
///
/// `old_position` is `None` when the key was not in the view before the event;
/// `new_position` is `None` when it is not in the view afterwards. Otherwise
/// each is a valid index into the view just before / just after the event.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// View that changed.
    pub view: ViewId,
    /// Key of the affected object.
    pub key: Key,
    /// Object state captured at notification time. For an object deleted
    /// from the cache this is the `{id: key}` placeholder.
    pub object: Arc<StoredObject>,
    /// Index before the event.
    pub old_position: Option<usize>,
    /// Index after the event.
    pub new_position: Option<usize>,
}

impl Change {
    /// Positions in the `-1 = absent` convention used by wire consumers.
    pub fn as_diff(&self) -> (i64, i64) {
        fn pos(p: Option<usize>) -> i64 {
            p.map_or(-1, |i| i64::try_from(i).unwrap_or(i64::MAX))
        }
        (pos(self.old_position), pos(self.new_position))
    }

    /// True if the object entered the view.
    pub fn is_insert(&self) -> bool {
        self.old_position.is_none() && self.new_position.is_some()
    }

    /// True if the object left the view.
    pub fn is_removal(&self) -> bool {
        self.old_position.is_some() && self.new_position.is_none()
    }
}

/// Failure reported by an observer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("observer failed: {message}")]
pub struct ObserverError {
    message: String,
}

impl ObserverError {
    /// Creates an error with a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Receiver of a view's changes. At most one per view.
///
/// Called synchronously while the event is processed; implementations must
/// return promptly. A returned error is reported to the caller of the store
/// and does not stop delivery to other views.
pub trait ViewObserver {
    /// Handles one change.
    fn on_change(&mut self, change: &Change) -> Result<(), ObserverError>;
}

impl<F> ViewObserver for F
where
    F: FnMut(&Change) -> Result<(), ObserverError>,
{
    fn on_change(&mut self, change: &Change) -> Result<(), ObserverError> {
        self(change)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn change(old: Option<usize>, new: Option<usize>) -> Change {
        Change {
            view: ViewId(1),
            key: Key::Int(0),
            object: Arc::new(StoredObject::new(Key::Int(0))),
            old_position: old,
            new_position: new,
        }
    }

    #[test]
    fn diff_uses_minus_one_for_absent() {
        assert_eq!(change(None, Some(0)).as_diff(), (-1, 0));
        assert_eq!(change(Some(2), None).as_diff(), (2, -1));
        assert_eq!(change(Some(1), Some(1)).as_diff(), (1, 1));
    }

    #[test]
    fn insert_and_removal_predicates() {
        assert!(change(None, Some(0)).is_insert());
        assert!(change(Some(0), None).is_removal());
        assert!(!change(Some(0), Some(0)).is_insert());
        assert!(!change(Some(0), Some(0)).is_removal());
    }

    #[test]
    fn closures_observe() {
        let mut seen = Vec::new();
        let mut obs = |c: &Change| {
            seen.push(c.as_diff());
            Ok::<(), ObserverError>(())
        };
        obs.on_change(&change(None, Some(0))).unwrap();
        assert_eq!(seen, vec![(-1, 0)]);
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Client-side mirror of a view, rebuilt only from position diffs.

use ripple_core::{Change, ViewEntry};
use ripple_feed::Key;

/// A plain key list that applies `(old, new)` diffs the way a UI would.
///
/// If a view's notifications are correct, replaying them onto an empty
/// mirror reproduces the view's key sequence exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorView {
    keys: Vec<Key>,
}

impl MirrorView {
    /// Empty mirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one change: remove at `old`, then insert at `new`.
    ///
    /// Returns a description of the first inconsistency (an `old` index that
    /// does not hold the key, or an index out of range).
    pub fn apply(&mut self, change: &Change) -> Result<(), String> {
        if let Some(old) = change.old_position {
            match self.keys.get(old) {
                Some(k) if *k == change.key => {
                    self.keys.remove(old);
                }
                Some(k) => {
                    return Err(format!(
                        "{}: old position {old} holds {k}, expected {}",
                        change.view, change.key
                    ))
                }
                None => {
                    return Err(format!(
                        "{}: old position {old} out of range (len {})",
                        change.view,
                        self.keys.len()
                    ))
                }
            }
        } else if self.keys.contains(&change.key) {
            return Err(format!("{}: {} inserted twice", change.view, change.key));
        }
        if let Some(new) = change.new_position {
            if new > self.keys.len() {
                return Err(format!(
                    "{}: new position {new} out of range (len {})",
                    change.view,
                    self.keys.len()
                ));
            }
            self.keys.insert(new, change.key.clone());
        }
        Ok(())
    }

    /// Applies every change in order, stopping at the first inconsistency.
    pub fn apply_all<'a, I>(&mut self, changes: I) -> Result<(), String>
    where
        I: IntoIterator<Item = &'a Change>,
    {
        changes.into_iter().try_for_each(|c| self.apply(c))
    }

    /// Current key sequence.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// True if the mirror holds exactly the keys of `entries`, in order.
    pub fn matches(&self, entries: &[ViewEntry]) -> bool {
        self.keys.len() == entries.len() && self.keys.iter().zip(entries).all(|(k, e)| *k == e.key)
    }
}

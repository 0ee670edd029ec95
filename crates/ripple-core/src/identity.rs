// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Key derivation: how an item update maps onto a cache key.

use ripple_feed::{ItemUpdate, Key, Value, COMMAND_FIELD, DELETE_COMMAND, KEY_FIELD};
use thiserror::Error;

/// Rule deciding the identity of the object an update mutates.
///
/// Fixed per store; it never changes for the life of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum IdentityPolicy {
    /// Key is the update's slot index: one logical row per slot, which may
    /// be reused. No deletions.
    #[default]
    PositionKeyed,
    /// Every update is a new, never-repeating object keyed by a counter.
    /// No deletions.
    SequenceKeyed,
    /// Key is carried in the `key` field; `command = "DELETE"` removes.
    ExplicitKeyed,
}

/// Counter backing [`IdentityPolicy::SequenceKeyed`].
///
/// Keys start at 1 and are never handed out twice, even across resets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceState {
    last: i64,
}

impl SequenceState {
    /// Creates a fresh counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently issued sequence number (0 before the first).
    pub fn last(&self) -> i64 {
        self.last
    }

    fn advance(&mut self) -> i64 {
        self.last += 1;
        self.last
    }
}

/// Result of key derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKey {
    /// Cache key of the mutated object.
    pub key: Key,
    /// True when the update removes the object instead of patching it.
    pub is_removal: bool,
}

/// Malformed update rejected before it touches the cache.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidEvent {
    /// Explicit-key update without a `key` field (or with a null one).
    #[error("update for slot {slot} carries no `key` field")]
    MissingKey {
        /// Slot of the rejected update.
        slot: u32,
    },
    /// Explicit-key update whose `key` is neither an integer nor a string.
    #[error("update for slot {slot} has unusable key {value}")]
    UnusableKey {
        /// Slot of the rejected update.
        slot: u32,
        /// Offending value.
        value: Value,
    },
}

/// Computes the key of the object `update` mutates.
///
/// Pure in `(policy, update, sequence)`; a rejected update leaves `sequence`
/// untouched.
///
/// # Errors
///
/// [`InvalidEvent`] when `policy` is [`IdentityPolicy::ExplicitKeyed`] and the
/// update has no usable `key` field.
pub fn derive_key(
    policy: IdentityPolicy,
    update: &ItemUpdate,
    sequence: &mut SequenceState,
) -> Result<DerivedKey, InvalidEvent> {
    match policy {
        IdentityPolicy::PositionKeyed => Ok(DerivedKey {
            key: Key::from(update.slot),
            is_removal: false,
        }),
        IdentityPolicy::SequenceKeyed => Ok(DerivedKey {
            key: Key::Int(sequence.advance()),
            is_removal: false,
        }),
        IdentityPolicy::ExplicitKeyed => {
            let raw = match update.field(KEY_FIELD) {
                None | Some(Value::Null) => {
                    return Err(InvalidEvent::MissingKey { slot: update.slot })
                }
                Some(v) => v,
            };
            let key = Key::from_value(raw).ok_or_else(|| InvalidEvent::UnusableKey {
                slot: update.slot,
                value: raw.clone(),
            })?;
            let is_removal =
                update.field(COMMAND_FIELD).and_then(Value::as_str) == Some(DELETE_COMMAND);
            Ok(DerivedKey { key, is_removal })
        }
    }
}

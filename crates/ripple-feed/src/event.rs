// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Raw events delivered by a feed.

use serde::{Deserialize, Serialize};

use crate::value::{Fields, Value};

/// Partial patch for one logical row of the subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemUpdate {
    /// Fixed slot index of the row within the subscription.
    pub slot: u32,
    /// Changed fields only; unmentioned fields keep their prior value.
    #[serde(default)]
    pub fields: Fields,
}

impl ItemUpdate {
    /// Creates an update for `slot` with no changed fields.
    pub fn new(slot: u32) -> Self {
        Self {
            slot,
            fields: Fields::new(),
        }
    }

    /// Adds (or overwrites) a changed field.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns a changed field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Subscription lifecycle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// The subscription (re)started; a fresh snapshot follows.
    Started,
    /// The subscription stopped; no further updates until restarted.
    Stopped,
}

/// One event from the feed.
///
/// JSON form (externally tagged): `{"update":{"slot":0,"fields":{..}}}`,
/// `"end_of_snapshot"`, `{"state":"started"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedEvent {
    /// Partial patch for one row.
    #[serde(rename = "update")]
    ItemUpdate(ItemUpdate),
    /// The initial bulk load is complete. Carries no data.
    EndOfSnapshot,
    /// Lifecycle change; triggers a reset of the store.
    #[serde(rename = "state")]
    SubscriptionState(SubscriptionState),
}

impl From<ItemUpdate> for FeedEvent {
    fn from(update: ItemUpdate) -> Self {
        Self::ItemUpdate(update)
    }
}

impl From<SubscriptionState> for FeedEvent {
    fn from(state: SubscriptionState) -> Self {
        Self::SubscriptionState(state)
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Item update and feed builders for tests.

use ripple_feed::{
    FeedEvent, ItemUpdate, Key, SubscriptionState, Value, COMMAND_FIELD, DELETE_COMMAND,
    KEY_FIELD,
};

/// Builder for one [`ItemUpdate`].
///
/// # Example
///
/// ```
/// use ripple_dry_tests::UpdateBuilder;
///
/// let update = UpdateBuilder::slot(2).key("AAPL").command("ADD").field("px", 10).build();
/// assert_eq!(update.slot, 2);
/// assert_eq!(update.fields.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    update: ItemUpdate,
}

impl UpdateBuilder {
    /// Starts an update for `slot` with no fields.
    pub fn slot(slot: u32) -> Self {
        Self {
            update: ItemUpdate::new(slot),
        }
    }

    /// Sets one field.
    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.update.fields.insert(name.to_owned(), value.into());
        self
    }

    /// Sets one field to `null`.
    pub fn null(self, name: &str) -> Self {
        self.field(name, Value::Null)
    }

    /// Sets the `key` field of a command feed.
    pub fn key(self, key: impl Into<Key>) -> Self {
        self.field(KEY_FIELD, key.into())
    }

    /// Sets the `command` field of a command feed.
    pub fn command(self, command: &str) -> Self {
        self.field(COMMAND_FIELD, command)
    }

    /// Shorthand for `command("DELETE")`.
    pub fn delete(self) -> Self {
        self.command(DELETE_COMMAND)
    }

    /// The update.
    pub fn build(self) -> ItemUpdate {
        self.update
    }

    /// The update wrapped as a feed event.
    pub fn event(self) -> FeedEvent {
        FeedEvent::ItemUpdate(self.update)
    }
}

/// Builder for a sequence of feed events.
///
/// # Example
///
/// ```
/// use ripple_dry_tests::{FeedBuilder, UpdateBuilder};
///
/// let feed = FeedBuilder::new()
///     .update(UpdateBuilder::slot(0).field("v", 1))
///     .end_of_snapshot()
///     .stopped()
///     .build();
/// assert_eq!(feed.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FeedBuilder {
    events: Vec<FeedEvent>,
}

impl FeedBuilder {
    /// Empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item update.
    pub fn update(mut self, update: UpdateBuilder) -> Self {
        self.events.push(update.event());
        self
    }

    /// Appends an end-of-snapshot marker.
    pub fn end_of_snapshot(mut self) -> Self {
        self.events.push(FeedEvent::EndOfSnapshot);
        self
    }

    /// Appends a subscription start.
    pub fn started(mut self) -> Self {
        self.events.push(FeedEvent::SubscriptionState(SubscriptionState::Started));
        self
    }

    /// Appends a subscription stop.
    pub fn stopped(mut self) -> Self {
        self.events.push(FeedEvent::SubscriptionState(SubscriptionState::Stopped));
        self
    }

    /// The events, in order.
    pub fn build(self) -> Vec<FeedEvent> {
        self.events
    }
}

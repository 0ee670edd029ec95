// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Feed event model shared across Ripple crates.
//!
//! Pure data (field values, object keys, item updates, lifecycle signals) plus
//! two encodings for recorded feeds:
//!
//! - [`wire`]: checksummed CBOR packets, the canonical log format.
//! - [`jsonl`]: one JSON event per line, for hand-written fixtures.
//!
//! The transport that produces these events is not part of Ripple; whatever
//! delivers a live feed only has to hand [`FeedEvent`]s to the store.

mod event;
mod value;

pub mod jsonl;
pub mod wire;

pub use event::{FeedEvent, ItemUpdate, SubscriptionState};
pub use value::{Fields, Key, Value, ValueKind};

/// Field carrying the explicit key of an object under command semantics.
pub const KEY_FIELD: &str = "key";
/// Field carrying the command of an update under command semantics.
pub const COMMAND_FIELD: &str = "command";
/// Command value that marks an update as a deletion.
pub const DELETE_COMMAND: &str = "DELETE";
/// Public identity field present on every stored object.
pub const ID_FIELD: &str = "id";

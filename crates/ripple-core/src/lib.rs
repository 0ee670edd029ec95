// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! ripple-core: keyed object cache with incrementally maintained views.
//!
//! A [`Store`] consumes [`FeedEvent`](ripple_feed::FeedEvent)s, merges each
//! item update into its canonical [`ObjectCache`], and keeps every registered
//! view (filter + optional ordering) in sync without recomputing it. Every
//! structural change to a view is reported to that view's observer as a
//! [`Change`]: the object plus its position before and after the event.
//!
//! # Pipeline
//!
//! ```text
//!   FeedEvent
//!       │
//!       ▼
//!   derive_key ── IdentityPolicy ──► (key, is_removal)
//!       │
//!       ▼
//!   ObjectCache ── upsert / remove ──► merged object | gone
//!       │
//!       ▼
//!   maintain ── for each live view, registration order
//!       │          locate → classify → splice / binary-search insert
//!       ▼
//!   ViewObserver::on_change(Change { old_position, new_position })
//! ```
//!
//! Sorted views are maintained by removing the object from its old slot and
//! binary-searching its new one, so an event costs `O(log n)` comparisons plus
//! the element shift.
//!
//! # Example
//!
//! ```
//! use ripple_core::{IdentityPolicy, MatchAll, SortRule, SortSpec, Store, ViewSpec};
//! use ripple_feed::{FeedEvent, ItemUpdate};
//!
//! let mut store = Store::new(IdentityPolicy::PositionKeyed);
//! let spec = ViewSpec::new(MatchAll).sorted(SortSpec::rules([SortRule::asc("price")]));
//! let (view, _cancel) = store.register_view(spec);
//!
//! store.apply(FeedEvent::from(ItemUpdate::new(0).with("price", 10))).unwrap();
//! store.apply(FeedEvent::from(ItemUpdate::new(1).with("price", 5))).unwrap();
//!
//! let prices: Vec<_> = store
//!     .view_entries(view)
//!     .unwrap()
//!     .iter()
//!     .map(|e| e.object.get("price").cloned())
//!     .collect();
//! assert_eq!(prices, vec![Some(5.into()), Some(10.into())]);
//! ```
#![forbid(unsafe_code)]

mod cache;
mod filter;
mod identity;
mod maintain;
mod object;
mod observer;
mod query;
mod registry;
mod sort;
mod store;
mod view;

pub use cache::ObjectCache;
pub use filter::{FieldQuery, Filter, MatchAll};
pub use identity::{derive_key, DerivedKey, IdentityPolicy, InvalidEvent, SequenceState};
pub use object::StoredObject;
pub use observer::{Change, ObserverError, ViewObserver};
pub use query::QueryOptions;
pub use sort::{compare_values, CompareFn, SortError, SortRule, SortSpec};
pub use store::{ApplyReport, Store, StoreError, ViewError, ViewFailure};
pub use view::{Cancel, ViewEntry, ViewHandle, ViewId, ViewSpec};

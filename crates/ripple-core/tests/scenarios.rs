// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end behaviour of a store with live views, one identity policy at a time.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use ripple_core::{
    FieldQuery, IdentityPolicy, MatchAll, QueryOptions, SortRule, SortSpec, Store, StoredObject,
    ViewHandle, ViewSpec,
};
use ripple_dry_tests::{FeedBuilder, MirrorView, RecordingObserver, UpdateBuilder};
use ripple_feed::{FeedEvent, Key, SubscriptionState, Value};

fn watch(store: &mut Store, spec: ViewSpec) -> (ViewHandle, RecordingObserver) {
    let (view, _cancel) = store.register_view(spec);
    let recorder = RecordingObserver::new();
    store.subscribe(view, recorder.clone()).unwrap();
    (view, recorder)
}

fn view_keys(store: &Store, view: ViewHandle) -> Vec<Key> {
    store
        .view_entries(view)
        .unwrap()
        .iter()
        .map(|e| e.key.clone())
        .collect()
}

fn price_events() -> Vec<FeedEvent> {
    FeedBuilder::new()
        .update(UpdateBuilder::slot(0).field("price", 10))
        .update(UpdateBuilder::slot(1).field("price", 5))
        .update(UpdateBuilder::slot(0).field("price", 7))
        .build()
}

#[test]
fn position_keyed_unsorted_view_appends_and_updates_in_place() {
    let mut store = Store::new(IdentityPolicy::PositionKeyed);
    let (view, recorder) = watch(&mut store, ViewSpec::new(MatchAll));

    for event in price_events() {
        assert!(store.apply(event).unwrap().is_clean());
    }

    assert_eq!(
        recorder.diffs(),
        vec![(Key::Int(0), -1, 0), (Key::Int(1), -1, 1), (Key::Int(0), 0, 0)]
    );
    let last = recorder.changes().pop().unwrap();
    assert_eq!(last.object.get("price"), Some(&Value::Int(7)));
    assert_eq!(last.object.get("id"), Some(&Value::Int(0)));
    assert_eq!(view_keys(&store, view), vec![Key::Int(0), Key::Int(1)]);
}

#[test]
fn position_keyed_sorted_view_moves_updated_rows() {
    let mut store = Store::new(IdentityPolicy::PositionKeyed);
    let spec = ViewSpec::new(MatchAll).sorted(SortSpec::rules([SortRule::asc("price")]));
    let (view, recorder) = watch(&mut store, spec);

    for event in price_events() {
        store.apply(event).unwrap();
    }

    let prices: Vec<_> = store
        .view_entries(view)
        .unwrap()
        .iter()
        .map(|e| (e.key.clone(), e.object.get("price").cloned()))
        .collect();
    assert_eq!(
        prices,
        vec![
            (Key::Int(1), Some(Value::Int(5))),
            (Key::Int(0), Some(Value::Int(7))),
        ]
    );
    // Key 0 sat at index 1 (behind price 5) before the third event and is
    // still at index 1 after it.
    assert_eq!(
        recorder.diffs(),
        vec![(Key::Int(0), -1, 0), (Key::Int(1), -1, 0), (Key::Int(0), 1, 1)]
    );
}

#[test]
fn explicit_keyed_delete_notifies_placeholder_and_evicts() {
    let mut store = Store::new(IdentityPolicy::ExplicitKeyed);
    let (view, recorder) = watch(&mut store, ViewSpec::new(MatchAll));

    let added = store
        .apply(UpdateBuilder::slot(0).key("AAPL").command("ADD").field("qty", 100).event())
        .unwrap();
    assert_eq!(added.key, Some(Key::from("AAPL")));
    let removed = store
        .apply(UpdateBuilder::slot(0).key("AAPL").delete().event())
        .unwrap();
    assert!(removed.removal);
    assert_eq!(
        removed.object.as_ref().and_then(|o| o.get("qty")).cloned(),
        Some(Value::Int(100))
    );

    assert_eq!(
        recorder.diffs(),
        vec![(Key::from("AAPL"), -1, 0), (Key::from("AAPL"), 0, -1)]
    );
    let placeholder = &recorder.changes()[1].object;
    assert_eq!(**placeholder, StoredObject::placeholder(Key::from("AAPL")));
    assert!(store.get(&Key::from("AAPL")).is_none());
    assert!(view_keys(&store, view).is_empty());
}

#[test]
fn delete_of_unknown_key_is_silent() {
    let mut store = Store::new(IdentityPolicy::ExplicitKeyed);
    let (_view, recorder) = watch(&mut store, ViewSpec::new(MatchAll));
    let report = store
        .apply(UpdateBuilder::slot(3).key(42_i64).delete().event())
        .unwrap();
    assert!(report.removal);
    assert!(report.object.is_none());
    assert_eq!(report.changes, 0);
    assert!(recorder.is_empty());
}

#[test]
fn command_delete_marker_written_directly_leaves_views() {
    let mut store = Store::new(IdentityPolicy::ExplicitKeyed);
    let (view, recorder) = watch(&mut store, ViewSpec::new(MatchAll));
    store.upsert(Key::from("X"), [("qty".to_owned(), Value::Int(1))].into());
    store.upsert(
        Key::from("X"),
        [("command".to_owned(), Value::from("DELETE"))].into(),
    );
    // The cache keeps the marker; no view shows it.
    assert!(store.get(&Key::from("X")).unwrap().is_delete_marker());
    assert!(view_keys(&store, view).is_empty());
    assert_eq!(
        recorder.diffs(),
        vec![(Key::from("X"), -1, 0), (Key::from("X"), 0, -1)]
    );
    // A snapshot query agrees with the view.
    let hits = store.query(&MatchAll, &QueryOptions::new()).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn lifecycle_reset_removes_every_row_with_notifications() {
    let mut store = Store::new(IdentityPolicy::PositionKeyed);
    let (view, recorder) = watch(&mut store, ViewSpec::new(MatchAll));
    for slot in 0..3 {
        store
            .apply(UpdateBuilder::slot(slot).field("v", i64::from(slot)).event())
            .unwrap();
    }
    store.apply(FeedEvent::EndOfSnapshot).unwrap();

    let report = store
        .apply(FeedEvent::SubscriptionState(SubscriptionState::Stopped))
        .unwrap();

    assert_eq!(report.changes, 3);
    let changes = recorder.changes();
    let removals = &changes[3..];
    assert_eq!(removals.len(), 3);
    assert!(removals.iter().all(|c| c.is_removal()));
    // Evicted objects carry their last real state, not a placeholder.
    assert_eq!(removals[2].object.get("v"), Some(&Value::Int(2)));

    let mut mirror = MirrorView::new();
    mirror.apply_all(&changes).unwrap();
    assert!(mirror.keys().is_empty());
    assert!(store.is_empty());
    assert!(!store.snapshot_complete());
    assert!(view_keys(&store, view).is_empty());
    assert_eq!(store.view_count(), 1, "views survive a reset");

    store
        .apply(UpdateBuilder::slot(0).field("v", 9).event())
        .unwrap();
    assert_eq!(view_keys(&store, view), vec![Key::Int(0)]);
}

#[test]
fn sequence_keyed_never_reuses_keys_even_after_reset() {
    let mut store = Store::new(IdentityPolicy::SequenceKeyed);
    let (view, _recorder) = watch(&mut store, ViewSpec::new(MatchAll));
    for _ in 0..2 {
        store
            .apply(UpdateBuilder::slot(0).field("headline", "x").event())
            .unwrap();
    }
    store.reset();
    store
        .apply(UpdateBuilder::slot(0).field("headline", "y").event())
        .unwrap();
    assert_eq!(view_keys(&store, view), vec![Key::Int(3)]);
    assert_eq!(store.sequence().last(), 3);
}

#[test]
fn filtered_view_tracks_entering_and_leaving_rows() {
    let mut store = Store::new(IdentityPolicy::PositionKeyed);
    let spec = ViewSpec::new(FieldQuery::new().eq("side", "buy"))
        .sorted(SortSpec::rules([SortRule::desc("qty")]));
    let (view, recorder) = watch(&mut store, spec);

    store.apply(UpdateBuilder::slot(0).field("side", "buy").field("qty", 5).event()).unwrap();
    store.apply(UpdateBuilder::slot(1).field("side", "sell").field("qty", 9).event()).unwrap();
    store.apply(UpdateBuilder::slot(1).field("side", "buy").event()).unwrap();
    store.apply(UpdateBuilder::slot(0).field("side", "sell").event()).unwrap();

    assert_eq!(
        recorder.diffs(),
        vec![(Key::Int(0), -1, 0), (Key::Int(1), -1, 0), (Key::Int(0), 1, -1)]
    );
    // A row leaving a view is reported with its current (non-matching) state.
    assert_eq!(
        recorder.changes()[2].object.get("side"),
        Some(&Value::from("sell"))
    );
    assert_eq!(view_keys(&store, view), vec![Key::Int(1)]);
}

#[test]
fn views_only_see_future_events_until_seeded() {
    let mut store = Store::new(IdentityPolicy::PositionKeyed);
    for event in price_events() {
        store.apply(event).unwrap();
    }
    let spec = ViewSpec::new(MatchAll).sorted(SortSpec::rules([SortRule::asc("price")]));
    let (view, recorder) = watch(&mut store, spec);
    assert!(view_keys(&store, view).is_empty());

    let seeded = store.seed_view(view).unwrap();
    assert_eq!(seeded.changes, 2);
    assert_eq!(view_keys(&store, view), vec![Key::Int(1), Key::Int(0)]);
    let mut mirror = MirrorView::new();
    mirror.apply_all(&recorder.changes()).unwrap();
    assert!(mirror.matches(store.view_entries(view).unwrap()));
}

#[test]
fn query_is_a_snapshot_with_paging() {
    let mut store = Store::new(IdentityPolicy::PositionKeyed);
    for (slot, price) in [(0, 30), (1, 10), (2, 20), (3, 40)] {
        store
            .apply(UpdateBuilder::slot(slot).field("price", price).event())
            .unwrap();
    }
    let options = QueryOptions::new()
        .sorted(SortSpec::rules([SortRule::asc("price")]))
        .start(1)
        .count(2);
    let page = store.query(&MatchAll, &options).unwrap();
    let ids: Vec<_> = page.iter().map(|o| o.id().clone()).collect();
    assert_eq!(ids, vec![Key::Int(2), Key::Int(0)]);

    let closure = |o: &StoredObject| o.get("price").and_then(Value::as_f64) > Some(25.0);
    let expensive = store.query(&closure, &QueryOptions::new()).unwrap();
    assert_eq!(expensive.len(), 2);
    assert_eq!(store.view_count(), 0, "queries register nothing");
}

#[test]
fn end_of_snapshot_changes_no_view() {
    let mut store = Store::new(IdentityPolicy::PositionKeyed);
    let (_view, recorder) = watch(&mut store, ViewSpec::new(MatchAll));
    let report = store.apply(FeedEvent::EndOfSnapshot).unwrap();
    assert_eq!(report.changes, 0);
    assert!(store.snapshot_complete());
    assert!(recorder.is_empty());
}

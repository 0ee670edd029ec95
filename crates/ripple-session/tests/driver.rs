// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Session driver behaviour over a real tokio runtime.
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use ripple_app_core::{SubscriptionConfig, SubscriptionMode, ValidationError};
use ripple_core::{FieldQuery, MatchAll, QueryOptions, SortRule, SortSpec, ViewError, ViewSpec};
use ripple_dry_tests::{FailingObserver, RecordingObserver, UpdateBuilder};
use ripple_feed::{FeedEvent, Key, SubscriptionState};
use ripple_session::{pump, Session, SessionError};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

fn merge_config() -> SubscriptionConfig {
    SubscriptionConfig::new(SubscriptionMode::Merge)
        .with_items(["item1", "item2", "item3"])
        .with_fields(["price"])
}

fn command_config() -> SubscriptionConfig {
    SubscriptionConfig::new(SubscriptionMode::Command)
        .with_item_group("portfolio")
        .with_fields(["key", "command", "qty"])
}

const WAIT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn invalid_config_never_starts() {
    let bad = SubscriptionConfig::new(SubscriptionMode::Merge).with_items(["i"]);
    match Session::spawn(bad) {
        Err(SessionError::Config(ValidationError::NoFields)) => {}
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn pushed_updates_reach_views_in_order() {
    let (session, driver, _errors) = Session::spawn(merge_config()).unwrap();
    let recorder = RecordingObserver::new();
    let spec = ViewSpec::new(MatchAll).sorted(SortSpec::rules([SortRule::asc("price")]));
    session.register_view(spec, recorder.clone()).await.unwrap();

    session.push(UpdateBuilder::slot(0).field("price", 10).event()).unwrap();
    session.push(UpdateBuilder::slot(1).field("price", 5).event()).unwrap();
    session.push(UpdateBuilder::slot(0).field("price", 1).event()).unwrap();

    let top = session.get(Key::Int(0)).await.unwrap().expect("cached");
    assert_eq!(top.get("price"), Some(&1.into()));
    assert_eq!(
        recorder.diffs(),
        vec![(Key::Int(0), -1, 0), (Key::Int(1), -1, 0), (Key::Int(0), 1, 0)]
    );

    session.shutdown().unwrap();
    timeout(WAIT, driver).await.unwrap().unwrap();
    assert!(session.is_closed());
    assert_eq!(
        session.push(FeedEvent::EndOfSnapshot),
        Err(SessionError::Closed)
    );
}

#[tokio::test]
async fn snapshot_ready_tracks_end_of_snapshot_and_resets() {
    let (session, _driver, _errors) = Session::spawn(merge_config()).unwrap();
    assert!(!session.is_snapshot_ready());

    session.push(UpdateBuilder::slot(0).field("price", 1).event()).unwrap();
    session.push(FeedEvent::EndOfSnapshot).unwrap();
    timeout(WAIT, session.snapshot_ready()).await.unwrap().unwrap();
    assert!(session.is_snapshot_ready());

    session
        .push(FeedEvent::SubscriptionState(SubscriptionState::Stopped))
        .unwrap();
    assert!(session.get(Key::Int(0)).await.unwrap().is_none());
    assert!(!session.is_snapshot_ready());
}

#[tokio::test]
async fn invalid_events_and_view_failures_go_to_error_channel() {
    let (session, _driver, mut errors) = Session::spawn(command_config()).unwrap();
    session
        .register_view(ViewSpec::new(MatchAll), FailingObserver::always())
        .await
        .unwrap();

    session.push(UpdateBuilder::slot(0).field("qty", 1).event()).unwrap();
    session
        .push(UpdateBuilder::slot(0).key("AAPL").command("ADD").field("qty", 1).event())
        .unwrap();

    let first = timeout(WAIT, errors.recv()).await.unwrap().unwrap();
    assert!(matches!(first, SessionError::Invalid(_)), "{first:?}");
    let second = timeout(WAIT, errors.recv()).await.unwrap().unwrap();
    match second {
        SessionError::View(failure) => {
            assert!(matches!(failure.error, ViewError::Observer(_)));
        }
        other => panic!("unexpected: {other:?}"),
    }

    // The driver kept going.
    let aapl = session.get(Key::from("AAPL")).await.unwrap().expect("cached");
    assert_eq!(aapl.get("qty"), Some(&1.into()));
}

#[tokio::test]
async fn cancel_stops_notifications_immediately() {
    let (session, _driver, _errors) = Session::spawn(merge_config()).unwrap();
    let recorder = RecordingObserver::new();
    let (view, cancel) = session
        .register_view(ViewSpec::new(MatchAll), recorder.clone())
        .await
        .unwrap();

    session.push(UpdateBuilder::slot(0).field("price", 1).event()).unwrap();
    session.get(Key::Int(0)).await.unwrap();
    assert_eq!(recorder.len(), 1);

    cancel.cancel();
    session.push(UpdateBuilder::slot(1).field("price", 2).event()).unwrap();
    session.get(Key::Int(1)).await.unwrap();
    assert_eq!(recorder.len(), 1);
    assert!(!session.unregister_view(view).await.unwrap());
}

#[tokio::test]
async fn query_and_seed_read_the_current_cache() {
    let (session, _driver, _errors) = Session::spawn(command_config()).unwrap();
    for (key, qty) in [("C", 3), ("A", 1), ("B", 2)] {
        session
            .push(UpdateBuilder::slot(0).key(key).command("ADD").field("qty", qty).event())
            .unwrap();
    }

    let hits = session
        .query(
            FieldQuery::new().eq("command", "ADD"),
            QueryOptions::new()
                .sorted(SortSpec::rules([SortRule::desc("qty")]))
                .count(2),
        )
        .await
        .unwrap();
    let keys: Vec<_> = hits.iter().map(|o| o.id().clone()).collect();
    assert_eq!(keys, vec![Key::from("C"), Key::from("B")]);

    let recorder = RecordingObserver::new();
    let (view, _cancel) = session
        .register_view(ViewSpec::new(MatchAll), recorder.clone())
        .await
        .unwrap();
    assert!(recorder.is_empty());
    let report = session.seed_view(view).await.unwrap();
    assert_eq!(report.changes, 3);
    assert_eq!(recorder.len(), 3);

    let rows: Vec<_> = session
        .view_entries(view)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.key)
        .collect();
    assert_eq!(rows, vec![Key::from("A"), Key::from("B"), Key::from("C")]);
    assert!(session.unregister_view(view).await.unwrap());
    assert!(matches!(
        session.view_entries(view).await,
        Err(SessionError::Store(_))
    ));
}

#[tokio::test]
async fn pump_forwards_until_source_closes() {
    let (session, _driver, _errors) = Session::spawn(merge_config()).unwrap();
    let (tx, rx) = mpsc::channel(4);
    let forwarder = tokio::spawn(pump(rx, session.clone()));

    for slot in 0..3 {
        tx.send(UpdateBuilder::slot(slot).field("price", 1).event())
            .await
            .unwrap();
    }
    drop(tx);

    let forwarded = timeout(WAIT, forwarder).await.unwrap().unwrap().unwrap();
    assert_eq!(forwarded, 3);
    assert!(session.get(Key::Int(2)).await.unwrap().is_some());
}

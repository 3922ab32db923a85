//! Connection manager lifecycle against an in-memory gateway.
//!
//! All tests run with paused time, so reconnect delays are exact.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{scalar_frame, settle, MockGateway};
use sensordash_ws_client::{
    ConnectionStatus, ReconnectPolicy, SensorClientConfig, SensorConnection, Snapshot,
};
use serde_json::json;

fn connection(gateway: &MockGateway) -> SensorConnection {
    connection_with(gateway, SensorClientConfig::default())
}

fn connection_with(gateway: &MockGateway, config: SensorClientConfig) -> SensorConnection {
    SensorConnection::with_dialer(config, gateway.clone())
}

#[tokio::test(start_paused = true)]
async fn open_sends_auth_then_subscribe() {
    let gateway = MockGateway::new();
    let conn = connection_with(
        &gateway,
        SensorClientConfig::default().with_token(Some("secret".into())),
    );

    conn.connect().unwrap();
    settle().await;

    assert_eq!(conn.status(), ConnectionStatus::Connected);
    assert_eq!(
        gateway.sent_json(),
        [
            json!({ "token": "secret" }),
            json!({ "action": "subscribe", "sensor": "#" }),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn missing_token_is_sent_as_null() {
    let gateway = MockGateway::new();
    let conn = connection(&gateway);

    conn.connect().unwrap();
    settle().await;

    assert_eq!(gateway.sent_json()[0], json!({ "token": null }));
}

#[tokio::test(start_paused = true)]
async fn frames_reach_state_and_observers() {
    let gateway = MockGateway::new();
    let conn = connection(&gateway);
    let seen: Arc<Mutex<Vec<Snapshot>>> = Arc::default();
    let sink = seen.clone();
    let _sub = conn.subscribe(move |s| sink.lock().unwrap().push(s.clone()));

    conn.connect().unwrap();
    settle().await;
    gateway.push(scalar_frame("c1", "t", 21.5));
    gateway.push(
        json!({
            "topic": "user/c1/dht",
            "values": "[{\"type\":\"t\",\"value\":20.1},{\"type\":\"h\",\"value\":44}]"
        })
        .to_string(),
    );
    settle().await;

    let snapshot = conn.client_sensors();
    assert_eq!(snapshot.sensor("c1", "t").and_then(|s| s.value()), Some(21.5));
    assert_eq!(
        snapshot.sensor("c1", "dht").and_then(|s| s.value_of("h")),
        Some(44.0)
    );
    // The empty replay on subscribe, then one per frame.
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen[0].is_empty());
    assert_eq!(conn.history("c1", "dht").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn legacy_frames_are_accepted() {
    let gateway = MockGateway::new();
    let conn = connection(&gateway);

    conn.connect().unwrap();
    settle().await;
    gateway.push(json!({ "type": "user/c9/pressure", "message": "{\"value\": 1001.5}" }).to_string());
    settle().await;

    assert_eq!(
        conn.client_sensors()
            .sensor("c9", "pressure")
            .and_then(|s| s.value()),
        Some(1001.5)
    );
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_leave_state_untouched() {
    let gateway = MockGateway::new();
    let conn = connection(&gateway);
    let notifications = Arc::new(AtomicUsize::new(0));
    let n = notifications.clone();
    let _sub = conn.subscribe(move |_| {
        n.fetch_add(1, Ordering::SeqCst);
    });

    conn.connect().unwrap();
    settle().await;
    gateway.push(scalar_frame("c1", "t", 21.5));
    settle().await;
    let before = conn.client_sensors();

    gateway.push("not json at all");
    gateway.push(r#"{"topic":"user/c1/t","values":"[{\"type\":\"t\",\"val"#);
    gateway.push(r#"{"topic":"user/c1","values":"1"}"#);
    gateway.push(r#"{"hello":"world"}"#);
    settle().await;

    assert_eq!(conn.client_sensors(), before);
    assert_eq!(notifications.load(Ordering::SeqCst), 2);
    assert_eq!(conn.status(), ConnectionStatus::Connected);

    // The session survives and keeps applying good frames.
    gateway.push(scalar_frame("c1", "t", 22.0));
    settle().await;
    assert_eq!(
        conn.client_sensors().sensor("c1", "t").and_then(|s| s.value()),
        Some(22.0)
    );
}

#[tokio::test(start_paused = true)]
async fn frames_outside_subscription_are_ignored() {
    let gateway = MockGateway::new();
    let conn = connection_with(
        &gateway,
        SensorClientConfig::default().with_subscribe_pattern("user/c1/#"),
    );

    conn.connect().unwrap();
    settle().await;
    gateway.push(scalar_frame("c1", "t", 1.0));
    gateway.push(scalar_frame("c2", "t", 2.0));
    settle().await;

    assert_eq!(
        gateway.sent_json()[1],
        json!({ "action": "subscribe", "sensor": "user/c1/#" })
    );
    let snapshot = conn.client_sensors();
    assert!(snapshot.client("c1").is_some());
    assert!(snapshot.client("c2").is_none());
}

#[tokio::test(start_paused = true)]
async fn close_triggers_exactly_one_reconnect_after_delay() {
    let gateway = MockGateway::new();
    let conn = connection(&gateway);

    conn.connect().unwrap();
    settle().await;
    assert_eq!(gateway.dials(), 1);

    gateway.close();
    settle().await;
    assert_eq!(conn.status(), ConnectionStatus::Reconnecting);

    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert_eq!(gateway.dials(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(gateway.dials(), 2);
    assert_eq!(conn.status(), ConnectionStatus::Connected);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(gateway.dials(), 2);

    // Auth and subscribe were repeated on the new session.
    assert_eq!(gateway.sent().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn state_survives_reconnect() {
    let gateway = MockGateway::new();
    let conn = connection(&gateway);

    conn.connect().unwrap();
    settle().await;
    gateway.push(scalar_frame("c1", "t", 21.5));
    settle().await;

    gateway.close();
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(conn.status(), ConnectionStatus::Connected);
    assert_eq!(
        conn.client_sensors().sensor("c1", "t").and_then(|s| s.value()),
        Some(21.5)
    );
}

#[tokio::test(start_paused = true)]
async fn refused_dial_retries_indefinitely() {
    let gateway = MockGateway::new();
    gateway.refuse(true);
    let conn = connection(&gateway);

    conn.connect().unwrap();
    settle().await;
    assert_eq!(conn.status(), ConnectionStatus::Reconnecting);

    tokio::time::sleep(Duration::from_millis(20_500)).await;
    assert_eq!(gateway.dials(), 5);

    gateway.refuse(false);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(conn.status(), ConnectionStatus::Connected);
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_reconnect() {
    let gateway = MockGateway::new();
    let conn = connection(&gateway);

    conn.connect().unwrap();
    settle().await;
    gateway.close();
    settle().await;
    assert_eq!(conn.status(), ConnectionStatus::Reconnecting);

    conn.disconnect();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(gateway.dials(), 1);
    assert_eq!(conn.status(), ConnectionStatus::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn disconnect_closes_session_and_clears_state() {
    let gateway = MockGateway::new();
    let conn = connection(&gateway);
    let last_len = Arc::new(AtomicUsize::new(usize::MAX));
    let l = last_len.clone();
    let _sub = conn.subscribe(move |s| l.store(s.len(), Ordering::SeqCst));

    conn.connect().unwrap();
    settle().await;
    gateway.push(scalar_frame("c1", "t", 21.5));
    settle().await;
    assert_eq!(last_len.load(Ordering::SeqCst), 1);

    conn.disconnect();
    settle().await;

    assert!(!gateway.has_live_session());
    assert!(conn.client_sensors().is_empty());
    assert_eq!(last_len.load(Ordering::SeqCst), 0);
    assert_eq!(conn.hub().observer_count(), 1);

    // A fresh cycle rebuilds from scratch and the observer is still wired.
    conn.connect().unwrap();
    settle().await;
    gateway.push(scalar_frame("c2", "h", 40.0));
    settle().await;
    assert_eq!(last_len.load(Ordering::SeqCst), 1);
    assert!(conn.client_sensors().client("c1").is_none());
}

#[tokio::test(start_paused = true)]
async fn observer_may_disconnect_from_its_callback() {
    let gateway = MockGateway::new();
    let conn = connection(&gateway);
    let handle = conn.clone();
    let sizes: Arc<Mutex<Vec<usize>>> = Arc::default();
    let sink = sizes.clone();
    let _sub = conn.subscribe(move |s| {
        sink.lock().unwrap().push(s.len());
        if s.sensor("c1", "alarm").is_some() {
            handle.disconnect();
        }
    });

    conn.connect().unwrap();
    settle().await;
    gateway.push(scalar_frame("c1", "t", 21.5));
    gateway.push(scalar_frame("c1", "alarm", 1.0));
    settle().await;

    assert_eq!(conn.status(), ConnectionStatus::Disconnected);
    assert!(conn.client_sensors().is_empty());
    assert!(!gateway.has_live_session());
    assert_eq!(*sizes.lock().unwrap(), [0, 1, 1, 0]);

    // No reconnect is scheduled after a disconnect from inside an observer.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(gateway.dials(), 1);
}

#[tokio::test(start_paused = true)]
async fn frames_of_superseded_session_are_refused() {
    let gateway = MockGateway::new();
    let conn = connection(&gateway);

    conn.connect().unwrap();
    settle().await;
    let old_epoch = conn.hub().epoch();

    conn.disconnect();
    conn.connect().unwrap();
    settle().await;
    assert_ne!(conn.hub().epoch(), old_epoch);

    // A merge tagged with the old session's epoch lands nowhere.
    let late = sensordash_core::SensorUpdate::scalar("c1", "t", 21.5);
    assert!(conn.hub().apply_in_epoch(old_epoch, late).is_none());
    assert!(conn.client_sensors().is_empty());

    gateway.push(scalar_frame("c2", "t", 19.0));
    settle().await;
    assert!(conn.client_sensors().client("c2").is_some());
}

#[tokio::test(start_paused = true)]
async fn connect_twice_keeps_single_transport() {
    let gateway = MockGateway::new();
    let conn = connection(&gateway);

    conn.connect().unwrap();
    conn.connect().unwrap();
    settle().await;
    conn.connect().unwrap();
    settle().await;

    assert_eq!(gateway.dials(), 1);
    assert_eq!(gateway.sent().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn late_subscriber_gets_replay_without_network() {
    let gateway = MockGateway::new();
    let conn = connection(&gateway);

    conn.connect().unwrap();
    settle().await;
    for i in 0..3 {
        gateway.push(scalar_frame(&format!("c{i}"), "t", i as f64));
    }
    settle().await;
    let sent_before = gateway.sent().len();

    let seen: Arc<Mutex<Vec<Snapshot>>> = Arc::default();
    let sink = seen.clone();
    let _sub = conn.subscribe(move |s| sink.lock().unwrap().push(s.clone()));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].len(), 3);
    assert_eq!(gateway.sent().len(), sent_before);
}

#[tokio::test(start_paused = true)]
async fn exponential_policy_spaces_out_attempts() {
    let gateway = MockGateway::new();
    gateway.refuse(true);
    let conn = connection_with(
        &gateway,
        SensorClientConfig::default().with_reconnect(ReconnectPolicy::Exponential {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(4),
        }),
    );

    conn.connect().unwrap();
    settle().await;
    // Attempts at t = 0, 1, 3, 7, 11.
    let mut counts = Vec::new();
    for _ in 0..12 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        counts.push(gateway.dials());
    }
    assert_eq!(counts, [2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5]);
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_max_attempts() {
    let gateway = MockGateway::new();
    gateway.refuse(true);
    let conn = connection_with(
        &gateway,
        SensorClientConfig::default()
            .with_reconnect(ReconnectPolicy::Fixed(Duration::from_secs(1)))
            .with_max_reconnect_attempts(2),
    );

    conn.connect().unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(gateway.dials(), 3);
    assert_eq!(conn.status(), ConnectionStatus::Disconnected);

    // connect() starts a new cycle once the old supervisor has given up.
    gateway.refuse(false);
    conn.connect().unwrap();
    settle().await;
    assert_eq!(conn.status(), ConnectionStatus::Connected);
}

#[tokio::test(start_paused = true)]
async fn token_is_fetched_on_every_open() {
    let gateway = MockGateway::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let c = counter.clone();
    let conn = connection_with(
        &gateway,
        SensorClientConfig::default()
            .with_token_source(move || Some(format!("t{}", c.fetch_add(1, Ordering::SeqCst)))),
    );

    conn.connect().unwrap();
    settle().await;
    gateway.close();
    tokio::time::sleep(Duration::from_secs(6)).await;

    let sent = gateway.sent_json();
    assert_eq!(sent[0], json!({ "token": "t0" }));
    assert_eq!(sent[2], json!({ "token": "t1" }));
}

#[tokio::test(start_paused = true)]
async fn status_transitions_are_observable() {
    let gateway = MockGateway::new();
    let conn = connection(&gateway);
    let mut changes = conn.status_changes();
    assert_eq!(*changes.borrow_and_update(), ConnectionStatus::Disconnected);

    conn.connect().unwrap();
    assert!(conn.wait_for(ConnectionStatus::Connected, Duration::from_secs(1)).await);

    gateway.close();
    assert!(conn.wait_for(ConnectionStatus::Reconnecting, Duration::from_secs(1)).await);
    assert!(conn.wait_for(ConnectionStatus::Connected, Duration::from_secs(6)).await);

    conn.disconnect();
    assert!(changes.has_changed().unwrap());
    assert_eq!(*changes.borrow_and_update(), ConnectionStatus::Disconnected);
}

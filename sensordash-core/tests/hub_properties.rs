//! Behavioural tests for SensorHub: merge semantics, isolation, replay and
//! unsubscribe.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sensordash_core::{SensorHub, SensorUpdate, SensorValue, Snapshot};

fn capture(hub: &SensorHub) -> (Arc<Mutex<Vec<Snapshot>>>, sensordash_core::Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let sub = hub.subscribe(move |s| sink.lock().unwrap().push(s.clone()));
    (seen, sub)
}

#[test]
fn duplicate_update_leaves_content_unchanged() {
    let hub = SensorHub::new();
    let update = SensorUpdate::new(
        "c1",
        "dht",
        vec![SensorValue::new("t", 21.5), SensorValue::new("h", 40.0)],
    );

    let once = hub.apply(update.clone());
    let twice = hub.apply(update);
    assert_eq!(once, twice);
    assert_eq!(twice.sensor_count(), 1);
}

#[test]
fn update_touches_only_its_own_sensor() {
    let hub = SensorHub::new();
    hub.apply(SensorUpdate::scalar("c1", "s1", 1.0));
    hub.apply(SensorUpdate::scalar("c1", "s2", 2.0));
    let before = hub.apply(SensorUpdate::scalar("c2", "s1", 3.0));

    let after = hub.apply(SensorUpdate::scalar("c1", "s1", 10.0));

    assert_eq!(after.sensor("c1", "s1").and_then(|s| s.value()), Some(10.0));
    assert_eq!(after.sensor("c1", "s2"), before.sensor("c1", "s2"));
    assert!(Arc::ptr_eq(
        before.client("c2").unwrap(),
        after.client("c2").unwrap()
    ));
}

#[test]
fn late_subscriber_receives_current_state_immediately() {
    let hub = SensorHub::new();
    for i in 0..5 {
        hub.apply(SensorUpdate::scalar(format!("c{i}"), "t", i as f64));
    }

    let (seen, _sub) = capture(&hub);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].len(), 5);
    assert!(seen[0].ptr_eq(&hub.client_sensors()));
}

#[test]
fn unsubscribed_observer_gets_nothing_more() {
    let hub = SensorHub::new();
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let sub = hub.subscribe(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    hub.apply(SensorUpdate::scalar("c1", "t", 1.0));
    sub.unsubscribe();
    hub.apply(SensorUpdate::scalar("c1", "t", 2.0));
    hub.apply(SensorUpdate::scalar("c1", "h", 3.0));

    // The initial (empty) replay and the first update.
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(hub.observer_count(), 0);
}

#[test]
fn first_report_creates_client() {
    let hub = SensorHub::new();
    hub.apply(SensorUpdate::scalar("c1", "t", 21.5));

    let snapshot = hub.client_sensors();
    assert_eq!(snapshot.len(), 1);
    let client = snapshot.client("c1").unwrap();
    assert_eq!(client.sensors.len(), 1);
    assert_eq!(client.sensors[0].sensor_id, "t");
    assert_eq!(client.sensors[0].value(), Some(21.5));
}

#[test]
fn second_sensor_update_keeps_sibling() {
    let hub = SensorHub::new();
    hub.apply(SensorUpdate::scalar("c1", "t", 21.5));
    hub.apply(SensorUpdate::scalar("c1", "h", 40.0));
    hub.apply(SensorUpdate::scalar("c1", "h", 45.0));

    let snapshot = hub.client_sensors();
    let client = snapshot.client("c1").unwrap();
    let values: Vec<_> = client
        .sensors
        .iter()
        .map(|s| (s.sensor_id.as_str(), s.value()))
        .collect();
    assert_eq!(values, [("t", Some(21.5)), ("h", Some(45.0))]);
}

#[test]
fn only_remaining_observer_is_notified() {
    let hub = SensorHub::new();
    let (first, first_sub) = capture(&hub);
    let (second, _second_sub) = capture(&hub);

    drop(first_sub);
    hub.apply(SensorUpdate::scalar("c1", "t", 1.0));

    let first = first.lock().unwrap();
    assert_eq!(first.len(), 1);
    assert!(first[0].is_empty());

    let second = second.lock().unwrap();
    assert_eq!(second.len(), 2);
    assert!(second[1].client("c1").is_some());
}

#[test]
fn every_observer_sees_the_same_snapshot() {
    let hub = SensorHub::new();
    let (a, _a) = capture(&hub);
    let (b, _b) = capture(&hub);

    let published = hub.apply(SensorUpdate::scalar("c1", "t", 1.0));

    assert!(a.lock().unwrap()[1].ptr_eq(&published));
    assert!(b.lock().unwrap()[1].ptr_eq(&published));
}

#[test]
fn concurrent_updates_are_all_applied() {
    let hub = SensorHub::new();
    let (seen, _sub) = capture(&hub);

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let hub = hub.clone();
            std::thread::spawn(move || {
                for i in 0..25 {
                    hub.apply(SensorUpdate::scalar(format!("c{worker}"), format!("s{i}"), i as f64));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(hub.revision(), 100);
    assert_eq!(hub.client_sensors().sensor_count(), 100);

    // Notifications may interleave across threads but never go backwards;
    // the first one is the replay of the empty hub.
    let sizes: Vec<_> = seen
        .lock()
        .unwrap()
        .iter()
        .map(|s| s.sensor_count())
        .collect();
    assert!(sizes.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(sizes.first(), Some(&0));
    assert_eq!(sizes.last(), Some(&100));
}

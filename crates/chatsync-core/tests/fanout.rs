//! Multiplexer and lifecycle controller behaviour, standalone and bound to a
//! store.

use chatsync_core::{
    Action, Consumer, Emitter, LifecycleController, LifecyclePhase, Multiplexer, PresenceState,
    Snapshot, Store, SubscriptionHandle, UpstreamError, UserRecord,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn test_two_consumers_share_one_upstream_cancelled_once() {
    let created = Arc::new(AtomicUsize::new(0));
    let cancelled = Arc::new(AtomicUsize::new(0));

    let mux = {
        let created = Arc::clone(&created);
        let cancelled = Arc::clone(&cancelled);
        Multiplexer::new("cursors", move |_emitter: Emitter<u64>| {
            created.fetch_add(1, Ordering::SeqCst);
            let cancelled = Arc::clone(&cancelled);
            SubscriptionHandle::from_fn("cursors", move || {
                cancelled.fetch_add(1, Ordering::SeqCst);
            })
        })
    };

    let first = mux.attach();
    let second = mux.attach();
    assert_eq!(created.load(Ordering::SeqCst), 1);

    first.unsubscribe();
    assert!(mux.is_upstream_active());
    assert_eq!(cancelled.load(Ordering::SeqCst), 0);

    second.unsubscribe();
    assert!(!mux.is_upstream_active());
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
}

#[test]
fn test_lifecycle_teardown_and_fresh_upstream() {
    let emitters: Arc<Mutex<Vec<Emitter<&'static str>>>> = Arc::default();
    let cancelled = Arc::new(AtomicUsize::new(0));

    let controller = {
        let emitters = Arc::clone(&emitters);
        let cancelled = Arc::clone(&cancelled);
        LifecycleController::new("rooms", move |emitter: Emitter<&'static str>| {
            emitters.lock().unwrap().push(emitter);
            let cancelled = Arc::clone(&cancelled);
            SubscriptionHandle::from_fn("rooms", move || {
                cancelled.fetch_add(1, Ordering::SeqCst);
            })
        })
    };
    let mut consumer = controller.attach();

    controller.activate();
    emitters.lock().unwrap()[0].emit("v1");
    assert_eq!(consumer.try_recv(), Some("v1"));

    controller.deactivate();
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);

    controller.activate();
    let emitters = emitters.lock().unwrap();
    assert_eq!(emitters.len(), 2);
    assert!(!emitters[0].is_current());
    assert!(emitters[1].is_current());
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
}

#[test]
fn test_conflation_delivers_latest() {
    let emitter: Arc<Mutex<Option<Emitter<u32>>>> = Arc::default();
    let mux = {
        let emitter = Arc::clone(&emitter);
        Multiplexer::new("presence", move |e: Emitter<u32>| {
            *emitter.lock().unwrap() = Some(e);
            SubscriptionHandle::noop("presence")
        })
    };
    let mut consumer = mux.attach();

    let upstream = emitter.lock().unwrap().clone().unwrap();
    for value in [1, 2, 3] {
        upstream.emit(value);
    }

    assert_eq!(consumer.try_recv(), Some(3));
    assert_eq!(consumer.try_recv(), None);
}

async fn wait_for<F>(consumer: &mut Consumer<Arc<Snapshot>>, predicate: F) -> Arc<Snapshot>
where
    F: Fn(&Snapshot) -> bool,
{
    timeout(WAIT, async {
        loop {
            let snapshot = consumer.recv().await.unwrap();
            if predicate(&snapshot) {
                return snapshot;
            }
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_store_multiplexer_forwards_commits() {
    let store = Arc::new(Store::new());
    let mux = store.multiplexer();

    let mut a = mux.attach();
    let mut b = mux.attach();
    assert_eq!(mux.stats().upstreams_created, 1);

    store
        .dispatch(Action::CurrentUserReceived {
            user: UserRecord::new("danielle", 1),
        })
        .unwrap();

    let has_user = |s: &Snapshot| s.current_user().is_some_and(|u| u.id == "danielle");
    wait_for(&mut a, has_user).await;
    wait_for(&mut b, has_user).await;

    drop(a);
    drop(b);
    assert!(!mux.is_upstream_active());
}

#[tokio::test]
async fn test_store_lifecycle_controller_follows_signal() {
    let store = Arc::new(Store::new());
    let controller = store.lifecycle_controller();
    let mut consumer = controller.attach();

    assert!(controller.activate());
    store
        .dispatch(Action::presence("bob", PresenceState::Online))
        .unwrap();
    wait_for(&mut consumer, |s| s.presence_of("bob").is_online()).await;

    assert!(controller.deactivate());
    assert_eq!(controller.phase(), LifecyclePhase::Inactive);

    // Commits made while inactive are not delivered
    store
        .dispatch(Action::presence("carol", PresenceState::Online))
        .unwrap();
    tokio::task::yield_now().await;
    assert!(consumer.try_recv().is_none());

    // A late consumer still gets the last value
    let mut late = controller.attach();
    let replayed = late.try_recv().unwrap();
    assert_eq!(replayed.presence_of("carol"), PresenceState::Unknown);

    assert!(controller.activate());
    wait_for(&mut consumer, |s| s.presence_of("carol").is_online()).await;
}

#[tokio::test]
async fn test_store_dropped_fails_lifecycle_upstream() {
    let store = Arc::new(Store::new());
    let controller = store.lifecycle_controller();
    let mut consumer = controller.attach();
    controller.activate();
    assert!(timeout(WAIT, consumer.recv()).await.unwrap().is_some());

    drop(store);
    timeout(WAIT, async {
        while controller.phase() == LifecyclePhase::Active {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert!(controller.last_failure().is_some());
}

#[tokio::test]
async fn test_store_dropped_ends_multiplexer_consumers() {
    let store = Arc::new(Store::new());
    let mux = store.multiplexer();
    let mut consumer = mux.attach();
    assert!(timeout(WAIT, consumer.recv()).await.unwrap().is_some());

    drop(store);
    assert_eq!(timeout(WAIT, consumer.recv()).await.unwrap(), None);
    assert!(consumer.is_ended());
    assert_eq!(mux.last_failure(), Some(UpstreamError::Closed));
    assert!(!mux.is_upstream_active());
}

#[tokio::test]
async fn test_closed_controller_ends_waiting_consumers() {
    let store = Arc::new(Store::new());
    let controller = store.lifecycle_controller();
    let mut consumer = controller.attach();
    controller.activate();
    assert!(timeout(WAIT, consumer.recv()).await.unwrap().is_some());

    let waiter = tokio::spawn(async move { while consumer.recv().await.is_some() {} });
    tokio::task::yield_now().await;
    assert!(controller.close());

    timeout(WAIT, waiter).await.unwrap().unwrap();
    assert_eq!(controller.phase(), LifecyclePhase::Closed);

    // The store keeps committing, nobody is listening
    store
        .dispatch(Action::presence("bob", PresenceState::Online))
        .unwrap();
    assert!(!controller.activate());
}

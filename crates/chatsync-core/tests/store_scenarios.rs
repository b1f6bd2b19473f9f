//! End-to-end behaviour of the store with the default reducers.

use chatsync_core::{
    joined_rooms_actions, Action, CursorRecord, PresenceState, RoomRecord, Snapshot, Store,
    UnreadCounts, UserRecord,
};
use std::sync::Arc;
use std::thread;

fn room(id: &str) -> RoomRecord {
    RoomRecord::new(id, id, "danielle", 1)
}

#[test]
fn test_current_user_last_writer_wins() {
    let store = Store::new();

    store
        .dispatch(Action::CurrentUserReceived {
            user: UserRecord::new("danielle", 1),
        })
        .unwrap();
    assert_eq!(store.current_snapshot().current_user().unwrap().id, "danielle");

    store
        .dispatch(Action::CurrentUserReceived {
            user: UserRecord::new("danielle2", 2),
        })
        .unwrap();
    assert_eq!(store.current_snapshot().current_user().unwrap().id, "danielle2");
}

#[test]
fn test_unrecognized_action_is_a_no_op() {
    let store = Store::new();
    store
        .dispatch(Action::JoinedRoom {
            room: room("r1"),
            unread_count: 2,
        })
        .unwrap();
    let before = store.current_snapshot();

    let after = store
        .dispatch(Action::Unrecognized {
            name: "room_typing_indicator".to_string(),
        })
        .unwrap();
    assert_eq!(*after, *before);
}

#[test]
fn test_concurrent_dispatch_loses_no_update() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 200;

    let store = Arc::new(Store::new());
    store
        .dispatch(Action::JoinedRoom {
            room: room("lobby"),
            unread_count: 0,
        })
        .unwrap();

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let user_id = format!("user-{t}-{i}");
                    store
                        .dispatch(Action::UserJoinedRoom {
                            room_id: "lobby".to_string(),
                            user_id: user_id.clone(),
                        })
                        .unwrap();
                    store
                        .dispatch(Action::presence(user_id, PresenceState::Online))
                        .unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let snapshot = store.current_snapshot();
    assert_eq!(
        snapshot.room("lobby").unwrap().member_user_ids.len(),
        THREADS * PER_THREAD
    );
    assert_eq!(snapshot.presence().count(), THREADS * PER_THREAD);
    assert_eq!(store.version(), (1 + 2 * THREADS * PER_THREAD) as u64);
}

#[test]
fn test_initial_cursor_does_not_regress_live_cursor() {
    let store = Store::new();
    store
        .dispatch(Action::JoinedRoom {
            room: room("r1"),
            unread_count: 0,
        })
        .unwrap();

    store
        .dispatch(Action::cursor_set(CursorRecord::read("r1", "bob", 9, 20)))
        .unwrap();
    store
        .dispatch(Action::initial_cursor(CursorRecord::read("r1", "bob", 5, 10)))
        .unwrap();

    assert_eq!(store.current_snapshot().cursor("r1", "bob").unwrap().position, 9);
}

#[test]
fn test_observe_after_dispatch_sees_that_snapshot_first() {
    let store = Store::new();
    let committed = store
        .dispatch(Action::presence("bob", PresenceState::Online))
        .unwrap();

    let mut stream = store.observe();
    let first = stream.try_next().unwrap();
    assert!(Arc::ptr_eq(&first, &committed));
}

#[test]
fn test_reconnect_diff_converges_to_fresh_state() {
    let store = Store::new();
    let unread = UnreadCounts::from([("a".to_string(), 1), ("b".to_string(), 2)]);
    for action in joined_rooms_actions(&store.current_snapshot(), vec![room("a"), room("b")], unread)
    {
        store.dispatch(action).unwrap();
    }
    store
        .dispatch(Action::cursor_set(CursorRecord::read("b", "bob", 3, 1)))
        .unwrap();

    // After a reconnect the server reports b left and c joined
    let unread = UnreadCounts::from([("a".to_string(), 1), ("c".to_string(), 4)]);
    let actions = joined_rooms_actions(&store.current_snapshot(), vec![room("a"), room("c")], unread);
    assert_eq!(actions.len(), 2);
    store.dispatch_all(actions).unwrap();

    let snapshot = store.current_snapshot();
    assert_eq!(snapshot.joined_room_ids(), vec!["a", "c"]);
    assert_eq!(snapshot.unread_count("c"), Some(4));
    assert_eq!(snapshot.unread_count("b"), None);
    assert!(snapshot.cursor("b", "bob").is_none());
}

#[test]
fn test_snapshots_share_untouched_tables() {
    let store = Store::new();
    store
        .dispatch(Action::JoinedRoom {
            room: room("r1"),
            unread_count: 0,
        })
        .unwrap();
    let before: Arc<Snapshot> = store.current_snapshot();

    let after = store
        .dispatch(Action::presence("bob", PresenceState::Offline))
        .unwrap();

    assert_eq!(before.rooms(), after.rooms());
    assert_eq!(before.presence_of("bob"), PresenceState::Unknown);
    assert_eq!(after.presence_of("bob"), PresenceState::Offline);
}

#[test]
fn test_cursors_and_room_list_commute() {
    let cursors = vec![
        Action::cursor_set(CursorRecord::read("r1", "bob", 3, 1)),
        Action::cursor_set(CursorRecord::read("rx", "bob", 3, 1)),
    ];
    let rooms = Action::JoinedRoomsReceived {
        rooms: vec![room("r1")],
        unread_counts: UnreadCounts::from([("r1".to_string(), 1)]),
    };

    let cursors_first = Store::new();
    cursors_first.dispatch_all(cursors.clone()).unwrap();
    cursors_first.dispatch(rooms.clone()).unwrap();

    let rooms_first = Store::new();
    rooms_first.dispatch(rooms).unwrap();
    rooms_first.dispatch_all(cursors).unwrap();

    let a = cursors_first.current_snapshot();
    let b = rooms_first.current_snapshot();
    assert_eq!(*a, *b);
    assert!(a.cursor("r1", "bob").is_some());
    assert!(a.cursor("rx", "bob").is_none());
}

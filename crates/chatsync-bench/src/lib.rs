//! Shared fixtures for the chatsync benchmarks.

use chatsync_core::{
    Action, CursorRecord, PresenceState, RoomRecord, Snapshot, Store, UnreadCounts, UserRecord,
};

/// Joined rooms `room-0 .. room-{count}` with one member each.
#[must_use]
pub fn rooms(count: usize) -> (Vec<RoomRecord>, UnreadCounts) {
    let rooms: Vec<RoomRecord> = (0..count)
        .map(|i| {
            RoomRecord::new(format!("room-{i}"), format!("Room {i}"), "bench", 1)
                .with_members(["bench"])
        })
        .collect();
    let unread = rooms.iter().map(|r| (r.id.clone(), 1)).collect();
    (rooms, unread)
}

/// A store that has received `room_count` rooms, a current user, and one
/// cursor per room.
#[must_use]
pub fn populated_store(room_count: usize) -> Store {
    let store = Store::new();
    let (rooms, unread_counts) = rooms(room_count);
    let mut actions = vec![
        Action::CurrentUserReceived {
            user: UserRecord::new("bench", 1),
        },
        Action::JoinedRoomsReceived {
            rooms,
            unread_counts,
        },
    ];
    actions.extend((0..room_count).map(|i| {
        Action::initial_cursor(CursorRecord::read(format!("room-{i}"), "bench", 0, 1))
    }));
    store
        .dispatch_all(actions)
        .expect("fixture actions use default reducers");
    store
}

/// The snapshot of [`populated_store`].
#[must_use]
pub fn populated_snapshot(room_count: usize) -> Snapshot {
    (*populated_store(room_count).current_snapshot()).clone()
}

/// A representative mix of live actions against [`populated_store`].
#[must_use]
pub fn live_mix(room_count: usize, step: usize) -> Action {
    let room_id = format!("room-{}", step % room_count.max(1));
    match step % 4 {
        0 => Action::cursor_set(CursorRecord::read(room_id, "bench", step as i64, step as u64)),
        1 => Action::presence(
            format!("user-{}", step % 64),
            if step % 8 < 4 {
                PresenceState::Online
            } else {
                PresenceState::Offline
            },
        ),
        2 => Action::UnreadCountReceived {
            room_id,
            unread_count: (step % 10) as u32,
        },
        _ => Action::UserJoinedRoom {
            room_id,
            user_id: format!("user-{}", step % 64),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_populated_store() {
        let store = populated_store(10);
        let snapshot = store.current_snapshot();
        assert_eq!(snapshot.rooms().len(), 10);
        assert_eq!(snapshot.cursors().len(), 10);
        assert_eq!(store.version(), 12);
    }

    #[test]
    fn test_live_mix_commits() {
        let store = populated_store(4);
        for step in 0..16 {
            store.dispatch(live_mix(4, step)).unwrap();
        }
        assert_eq!(store.version(), 6 + 16);
    }
}

//! Joined-rooms differ.
//!
//! When a subscription restarts it sends the full joined-room list again.
//! Replacing the table wholesale would look like every room changed, so
//! the list is turned into the minimal set of incremental actions against
//! the current snapshot instead.

use crate::action::Action;
use crate::model::RoomRecord;
use crate::snapshot::{Snapshot, UnreadCounts};
use std::collections::HashSet;

/// Actions that move `snapshot` to the given joined-room list.
///
/// Order: joins, then updates, then leaves. A new room without an unread
/// count is skipped. If no joined-room list has been applied yet, the
/// result is a single [`Action::JoinedRoomsReceived`].
#[must_use]
pub fn joined_rooms_actions(
    snapshot: &Snapshot,
    rooms: Vec<RoomRecord>,
    unread_counts: UnreadCounts,
) -> Vec<Action> {
    if !snapshot.rooms_received() {
        return vec![Action::JoinedRoomsReceived {
            rooms,
            unread_counts,
        }];
    }

    let current = snapshot.rooms();
    let incoming: HashSet<&str> = rooms.iter().map(|room| room.id.as_str()).collect();

    let mut joined = Vec::new();
    let mut updated = Vec::new();
    for room in &rooms {
        match current.get(&room.id) {
            None => {
                if let Some(&unread_count) = unread_counts.get(&room.id) {
                    joined.push(Action::JoinedRoom {
                        room: room.clone(),
                        unread_count,
                    });
                }
            }
            Some(existing) if !existing.same_metadata(room) => {
                updated.push(Action::RoomUpdated { room: room.clone() });
            }
            Some(_) => {}
        }
    }

    let mut left: Vec<&String> = current
        .keys()
        .filter(|id| !incoming.contains(id.as_str()))
        .collect();
    left.sort();

    joined
        .into_iter()
        .chain(updated)
        .chain(left.into_iter().map(|room_id| Action::LeftRoom {
            room_id: room_id.clone(),
        }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;

    fn room(id: &str) -> RoomRecord {
        RoomRecord::new(id, id, "alice", 1)
    }

    fn received(ids: &[&str]) -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.replace_rooms(ids.iter().map(|id| room(id)).collect(), &UnreadCounts::new());
        snapshot
    }

    #[test]
    fn test_first_list_is_received_wholesale() {
        let actions = joined_rooms_actions(&Snapshot::new(), vec![room("a")], UnreadCounts::new());
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind(), ActionKind::JoinedRoomsReceived);
    }

    #[test]
    fn test_unchanged_list_yields_nothing() {
        let snapshot = received(&["a", "b"]);
        let actions = joined_rooms_actions(&snapshot, vec![room("a"), room("b")], UnreadCounts::new());
        assert!(actions.is_empty());
    }

    #[test]
    fn test_join_update_leave() {
        let snapshot = received(&["a", "b", "c"]);

        let mut renamed = room("b");
        renamed.name = "bee".to_string();
        let unread = UnreadCounts::from([("d".to_string(), 5), ("e".to_string(), 1)]);
        let actions = joined_rooms_actions(
            &snapshot,
            vec![room("a"), renamed.clone(), room("d"), room("e")],
            unread,
        );

        let kinds: Vec<ActionKind> = actions.iter().map(Action::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::JoinedRoom,
                ActionKind::JoinedRoom,
                ActionKind::RoomUpdated,
                ActionKind::LeftRoom,
            ]
        );
        assert!(actions.contains(&Action::JoinedRoom {
            room: room("d"),
            unread_count: 5,
        }));
        assert!(actions.contains(&Action::RoomUpdated { room: renamed }));
        assert!(actions.contains(&Action::LeftRoom {
            room_id: "c".to_string(),
        }));
    }

    #[test]
    fn test_new_room_without_unread_is_skipped() {
        let snapshot = received(&[]);
        let actions = joined_rooms_actions(&snapshot, vec![room("x")], UnreadCounts::new());
        assert!(actions.is_empty());
    }

    #[test]
    fn test_members_do_not_count_as_update() {
        let mut snapshot = received(&["a"]);
        if let Some(existing) = snapshot.room_mut("a") {
            existing.member_user_ids.insert("bob".to_string());
        }
        let actions = joined_rooms_actions(&snapshot, vec![room("a")], UnreadCounts::new());
        assert!(actions.is_empty());
    }
}

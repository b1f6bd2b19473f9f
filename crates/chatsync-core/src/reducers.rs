//! Built-in reducers, one per modelled [`Action`] variant.
//!
//! Every reducer is total over its variant: an action that refers to a room
//! the snapshot does not hold yields the snapshot unchanged.

use crate::action::{Action, ActionKind, CursorOrigin};
use crate::config::CursorReplayPolicy;
use crate::model::CursorRecord;
use crate::reducer::ReduceError;
use crate::snapshot::Snapshot;

/// Replace the current user. Last writer wins.
pub fn current_user_received(state: &Snapshot, action: &Action) -> Result<Snapshot, ReduceError> {
    let Action::CurrentUserReceived { user } = action else {
        return Err(ReduceError::unexpected(ActionKind::CurrentUserReceived, action));
    };
    let mut next = state.clone();
    next.set_current_user(user.clone());
    Ok(next)
}

/// Replace the room and unread tables with a subscription's initial state.
pub fn joined_rooms_received(state: &Snapshot, action: &Action) -> Result<Snapshot, ReduceError> {
    let Action::JoinedRoomsReceived {
        rooms,
        unread_counts,
    } = action
    else {
        return Err(ReduceError::unexpected(ActionKind::JoinedRoomsReceived, action));
    };
    let mut next = state.clone();
    next.replace_rooms(rooms.clone(), unread_counts);
    Ok(next)
}

/// Insert a newly joined room and its unread count.
pub fn joined_room(state: &Snapshot, action: &Action) -> Result<Snapshot, ReduceError> {
    let Action::JoinedRoom { room, unread_count } = action else {
        return Err(ReduceError::unexpected(ActionKind::JoinedRoom, action));
    };
    let mut next = state.clone();
    next.insert_room(room.clone(), *unread_count);
    Ok(next)
}

/// Replace a joined room's metadata, keeping its members and unread count.
pub fn room_updated(state: &Snapshot, action: &Action) -> Result<Snapshot, ReduceError> {
    let Action::RoomUpdated { room } = action else {
        return Err(ReduceError::unexpected(ActionKind::RoomUpdated, action));
    };
    let mut next = state.clone();
    if let Some(existing) = next.room_mut(&room.id) {
        let members = std::mem::take(&mut existing.member_user_ids);
        let unread_count = existing.unread_count;
        *existing = room.clone();
        existing.member_user_ids = members;
        existing.unread_count = unread_count;
    }
    Ok(next)
}

/// Remove a room the current user left.
pub fn left_room(state: &Snapshot, action: &Action) -> Result<Snapshot, ReduceError> {
    let Action::LeftRoom { room_id } = action else {
        return Err(ReduceError::unexpected(ActionKind::LeftRoom, action));
    };
    let mut next = state.clone();
    next.remove_room(room_id);
    Ok(next)
}

/// Remove a deleted room.
pub fn room_deleted(state: &Snapshot, action: &Action) -> Result<Snapshot, ReduceError> {
    let Action::RoomDeleted { room_id } = action else {
        return Err(ReduceError::unexpected(ActionKind::RoomDeleted, action));
    };
    let mut next = state.clone();
    next.remove_room(room_id);
    Ok(next)
}

/// Set a joined room's unread count.
pub fn unread_count_received(state: &Snapshot, action: &Action) -> Result<Snapshot, ReduceError> {
    let Action::UnreadCountReceived {
        room_id,
        unread_count,
    } = action
    else {
        return Err(ReduceError::unexpected(ActionKind::UnreadCountReceived, action));
    };
    let mut next = state.clone();
    next.set_unread_count(room_id, *unread_count);
    Ok(next)
}

/// Set a room's unread count and move the attached cursor in one step.
pub fn read_state_updated(state: &Snapshot, action: &Action) -> Result<Snapshot, ReduceError> {
    let Action::ReadStateUpdated {
        room_id,
        unread_count,
        cursor,
    } = action
    else {
        return Err(ReduceError::unexpected(ActionKind::ReadStateUpdated, action));
    };
    let mut next = state.clone();
    next.set_unread_count(room_id, *unread_count);
    if let Some(cursor) = cursor {
        put_cursor(&mut next, cursor, CursorOrigin::Live, CursorReplayPolicy::KeepHigher);
    }
    Ok(next)
}

/// Replace the member set of a joined room.
pub fn memberships_received(state: &Snapshot, action: &Action) -> Result<Snapshot, ReduceError> {
    let Action::MembershipsReceived { room_id, user_ids } = action else {
        return Err(ReduceError::unexpected(ActionKind::MembershipsReceived, action));
    };
    let mut next = state.clone();
    if let Some(room) = next.room_mut(room_id) {
        room.member_user_ids = user_ids.iter().cloned().collect();
    }
    Ok(next)
}

/// Add a member to a joined room.
pub fn user_joined_room(state: &Snapshot, action: &Action) -> Result<Snapshot, ReduceError> {
    let Action::UserJoinedRoom { room_id, user_id } = action else {
        return Err(ReduceError::unexpected(ActionKind::UserJoinedRoom, action));
    };
    if state.room(room_id).map_or(true, |room| room.has_member(user_id)) {
        return Ok(state.clone());
    }
    let mut next = state.clone();
    if let Some(room) = next.room_mut(room_id) {
        room.member_user_ids.insert(user_id.clone());
    }
    Ok(next)
}

/// Remove a member from a joined room.
pub fn user_left_room(state: &Snapshot, action: &Action) -> Result<Snapshot, ReduceError> {
    let Action::UserLeftRoom { room_id, user_id } = action else {
        return Err(ReduceError::unexpected(ActionKind::UserLeftRoom, action));
    };
    if !state.room(room_id).is_some_and(|room| room.has_member(user_id)) {
        return Ok(state.clone());
    }
    let mut next = state.clone();
    if let Some(room) = next.room_mut(room_id) {
        room.member_user_ids.remove(user_id.as_str());
    }
    Ok(next)
}

/// Upsert one cursor.
pub fn cursor_set(
    state: &Snapshot,
    action: &Action,
    policy: CursorReplayPolicy,
) -> Result<Snapshot, ReduceError> {
    let Action::CursorSet { cursor, origin } = action else {
        return Err(ReduceError::unexpected(ActionKind::CursorSet, action));
    };
    let mut next = state.clone();
    put_cursor(&mut next, cursor, *origin, policy);
    Ok(next)
}

/// Upsert a batch of initial-state cursors.
pub fn cursors_received(
    state: &Snapshot,
    action: &Action,
    policy: CursorReplayPolicy,
) -> Result<Snapshot, ReduceError> {
    let Action::CursorsReceived { cursors } = action else {
        return Err(ReduceError::unexpected(ActionKind::CursorsReceived, action));
    };
    let mut next = state.clone();
    for cursor in cursors {
        put_cursor(&mut next, cursor, CursorOrigin::InitialState, policy);
    }
    Ok(next)
}

/// Record a user's presence.
pub fn presence_changed(state: &Snapshot, action: &Action) -> Result<Snapshot, ReduceError> {
    let Action::PresenceChanged { user_id, presence } = action else {
        return Err(ReduceError::unexpected(ActionKind::PresenceChanged, action));
    };
    let mut next = state.clone();
    next.set_presence(user_id.clone(), *presence);
    Ok(next)
}

fn put_cursor(
    next: &mut Snapshot,
    cursor: &CursorRecord,
    origin: CursorOrigin,
    policy: CursorReplayPolicy,
) {
    // Once the joined rooms are known, cursors only exist for joined rooms.
    if next.rooms_received() && next.room(&cursor.room_id).is_none() {
        return;
    }
    let keep_existing = origin == CursorOrigin::InitialState
        && policy == CursorReplayPolicy::KeepHigher
        && next
            .cursor(&cursor.room_id, &cursor.user_id)
            .is_some_and(|existing| existing.position > cursor.position);
    if !keep_existing {
        next.put_cursor(cursor.clone());
    }
}

//! Synthetic event streams.
//!
//! Each producer stands in for one remote subscription and turns a step
//! number into the actions that subscription would have decoded. Apart from
//! timestamps, steps are deterministic so runs are reproducible.

use crate::config::SimulationConfig;
use chatsync_core::{
    joined_rooms_actions, model::now_millis, Action, CursorRecord, PresenceState, RoomRecord,
    Snapshot, UnreadCounts, UserRecord,
};

/// Number of other users the simulation knows about.
const OTHER_USERS: usize = 7;

/// Steps between membership reconnects.
const RECONNECT_EVERY: usize = 50;

/// Steps between stale initial-state cursor replays.
const REPLAY_EVERY: usize = 10;

/// Turns a step into actions. Reads the committed snapshot where the stream
/// needs to diff against it.
pub type Step = fn(&SimulationConfig, &Snapshot, usize) -> Vec<Action>;

/// The simulated subscriptions.
pub const PRODUCERS: [(&str, Step); 4] = [
    ("user", user_step),
    ("memberships", membership_step),
    ("cursors", cursor_step),
    ("presence", presence_step),
];

fn room_id(index: usize) -> String {
    format!("room-{index}")
}

fn other_user(index: usize) -> String {
    format!("user-{}", index % OTHER_USERS)
}

/// Joined rooms after `epoch` reconnects: a window of `count` rooms that
/// slides by one room per reconnect.
#[must_use]
pub fn room_window(user_id: &str, count: usize, epoch: usize) -> (Vec<RoomRecord>, UnreadCounts) {
    let mut rooms = Vec::with_capacity(count);
    let mut unread = UnreadCounts::with_capacity(count);
    for index in epoch..epoch + count {
        let id = room_id(index);
        unread.insert(id.clone(), (index % 5) as u32);
        let room = RoomRecord::new(id, format!("Room {index}"), user_id, index as u64);
        rooms.push(room.with_members([user_id]));
    }
    (rooms, unread)
}

/// Profile updates for the signed-in user.
pub fn user_step(sim: &SimulationConfig, _snapshot: &Snapshot, step: usize) -> Vec<Action> {
    let user = UserRecord::new(sim.user_id.clone(), now_millis())
        .with_name(format!("{} #{step}", sim.user_id));
    vec![Action::CurrentUserReceived { user }]
}

/// Joined rooms and their members. Every [`RECONNECT_EVERY`] steps the
/// subscription restarts and its fresh room list is diffed in.
pub fn membership_step(sim: &SimulationConfig, snapshot: &Snapshot, step: usize) -> Vec<Action> {
    if step % RECONNECT_EVERY == 0 {
        let (rooms, unread) = room_window(&sim.user_id, sim.rooms, step / RECONNECT_EVERY);
        return joined_rooms_actions(snapshot, rooms, unread);
    }

    let joined = snapshot.joined_room_ids();
    let Some(room_id) = joined.get(step % joined.len().max(1)) else {
        return Vec::new();
    };
    let room_id = (*room_id).to_string();
    let user_id = other_user(step);
    if snapshot.room(&room_id).is_some_and(|room| room.has_member(&user_id)) {
        vec![Action::UserLeftRoom { room_id, user_id }]
    } else {
        vec![Action::UserJoinedRoom { room_id, user_id }]
    }
}

/// The signed-in user's read cursors. Starts with an initial-state batch,
/// then moves one cursor per step, now and then interleaving a stale replay.
pub fn cursor_step(sim: &SimulationConfig, snapshot: &Snapshot, step: usize) -> Vec<Action> {
    let at = now_millis();
    if step == 0 {
        let cursors = snapshot
            .joined_room_ids()
            .into_iter()
            .map(|room_id| CursorRecord::read(room_id, sim.user_id.clone(), 0, at))
            .collect();
        return vec![Action::CursorsReceived { cursors }];
    }

    let joined = snapshot.joined_room_ids();
    let Some(room_id) = joined.get(step % joined.len().max(1)) else {
        return Vec::new();
    };
    let position = step as i64;
    let mut actions = vec![Action::cursor_set(CursorRecord::read(
        *room_id,
        sim.user_id.clone(),
        position,
        at,
    ))];
    if step % REPLAY_EVERY == 0 {
        actions.push(Action::initial_cursor(CursorRecord::read(
            *room_id,
            sim.user_id.clone(),
            position - REPLAY_EVERY as i64,
            at,
        )));
    }
    actions
}

/// Other users coming online and going offline.
pub fn presence_step(_sim: &SimulationConfig, _snapshot: &Snapshot, step: usize) -> Vec<Action> {
    let state = if (step / OTHER_USERS) % 2 == 0 {
        PresenceState::Online
    } else {
        PresenceState::Offline
    };
    vec![Action::presence(other_user(step), state)]
}

//! Immutable view of the chat state at one instant.
//!
//! Each table sits behind its own `Arc`, so a reducer that edits one table
//! copies only that table; the others are shared with the previous snapshot.

use crate::model::{CursorKey, CursorRecord, RoomId, RoomRecord, UserId, UserRecord};
use crate::presence::{Presence, PresenceState};
use std::collections::HashMap;
use std::sync::Arc;

/// Room table.
pub type Rooms = HashMap<RoomId, RoomRecord>;

/// Cursor table.
pub type Cursors = HashMap<CursorKey, CursorRecord>;

/// Unread count table.
pub type UnreadCounts = HashMap<RoomId, u32>;

/// The complete known chat state.
///
/// A snapshot is a value: editing methods take `&mut self` on an owned copy
/// and never touch snapshots already handed out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    current_user: Option<Arc<UserRecord>>,
    rooms: Arc<Rooms>,
    cursors: Arc<Cursors>,
    presence: Arc<Presence>,
    unread_counts: Arc<UnreadCounts>,
    rooms_received: bool,
}

impl Snapshot {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The signed-in user, once received.
    #[must_use]
    pub fn current_user(&self) -> Option<&UserRecord> {
        self.current_user.as_deref()
    }

    /// All joined rooms.
    #[must_use]
    pub fn rooms(&self) -> &Rooms {
        &self.rooms
    }

    /// All known cursors.
    #[must_use]
    pub fn cursors(&self) -> &Cursors {
        &self.cursors
    }

    /// Presence of all observed users.
    #[must_use]
    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    /// Unread counts of joined rooms.
    #[must_use]
    pub fn unread_counts(&self) -> &UnreadCounts {
        &self.unread_counts
    }

    /// Whether an initial joined-rooms list has been applied.
    #[must_use]
    pub fn rooms_received(&self) -> bool {
        self.rooms_received
    }

    /// Look up a joined room.
    #[must_use]
    pub fn room(&self, room_id: &str) -> Option<&RoomRecord> {
        self.rooms.get(room_id)
    }

    /// Unread count of a joined room.
    #[must_use]
    pub fn unread_count(&self, room_id: &str) -> Option<u32> {
        self.unread_counts.get(room_id).copied()
    }

    /// Look up the cursor of a user in a room.
    #[must_use]
    pub fn cursor(&self, room_id: &str, user_id: &str) -> Option<&CursorRecord> {
        self.cursors.get(&(room_id.to_string(), user_id.to_string()))
    }

    /// Presence of a user. Users never observed are `Unknown`.
    #[must_use]
    pub fn presence_of(&self, user_id: &str) -> PresenceState {
        self.presence.get(user_id)
    }

    /// IDs of joined rooms, sorted.
    #[must_use]
    pub fn joined_room_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.rooms.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Replace the signed-in user.
    pub fn set_current_user(&mut self, user: UserRecord) {
        self.current_user = Some(Arc::new(user));
    }

    /// Replace the whole room and unread tables.
    ///
    /// Each room's `unread_count` is taken from `unread_counts` (0 when
    /// absent) so both stay in step. Only cursors of rooms in the new table
    /// survive, including cursors that arrived before any room list.
    pub fn replace_rooms(&mut self, rooms: Vec<RoomRecord>, unread_counts: &UnreadCounts) {
        let mut table = Rooms::with_capacity(rooms.len());
        let mut unread = UnreadCounts::with_capacity(rooms.len());
        for mut room in rooms {
            room.unread_count = unread_counts.get(&room.id).copied().unwrap_or(0);
            unread.insert(room.id.clone(), room.unread_count);
            table.insert(room.id.clone(), room);
        }

        if self.cursors.keys().any(|(room, _)| !table.contains_key(room)) {
            Arc::make_mut(&mut self.cursors).retain(|(room, _), _| table.contains_key(room));
        }

        self.rooms = Arc::new(table);
        self.unread_counts = Arc::new(unread);
        self.rooms_received = true;
    }

    /// Insert or replace a room together with its unread count.
    pub fn insert_room(&mut self, mut room: RoomRecord, unread_count: u32) {
        room.unread_count = unread_count;
        Arc::make_mut(&mut self.unread_counts).insert(room.id.clone(), unread_count);
        Arc::make_mut(&mut self.rooms).insert(room.id.clone(), room);
    }

    /// Remove a room, its unread count, and its cursors.
    ///
    /// Returns the removed room, if it was joined.
    pub fn remove_room(&mut self, room_id: &str) -> Option<RoomRecord> {
        if !self.rooms.contains_key(room_id) {
            return None;
        }
        let removed = Arc::make_mut(&mut self.rooms).remove(room_id);
        Arc::make_mut(&mut self.unread_counts).remove(room_id);
        self.drop_cursors_for(room_id);
        removed
    }

    /// Mutable access to a joined room.
    pub fn room_mut(&mut self, room_id: &str) -> Option<&mut RoomRecord> {
        if !self.rooms.contains_key(room_id) {
            return None;
        }
        Arc::make_mut(&mut self.rooms).get_mut(room_id)
    }

    /// Set the unread count of a joined room in both places it is kept.
    ///
    /// Returns `false` if the room is not joined.
    pub fn set_unread_count(&mut self, room_id: &str, unread_count: u32) -> bool {
        let Some(room) = self.room_mut(room_id) else {
            return false;
        };
        room.unread_count = unread_count;
        Arc::make_mut(&mut self.unread_counts).insert(room_id.to_string(), unread_count);
        true
    }

    /// Insert or replace a cursor.
    pub fn put_cursor(&mut self, cursor: CursorRecord) {
        Arc::make_mut(&mut self.cursors).insert(cursor.key(), cursor);
    }

    /// Record a user's presence.
    pub fn set_presence(&mut self, user_id: impl Into<UserId>, state: PresenceState) {
        Arc::make_mut(&mut self.presence).set(user_id, state);
    }

    fn drop_cursors_for(&mut self, room_id: &str) {
        if self.cursors.keys().any(|(room, _)| room == room_id) {
            Arc::make_mut(&mut self.cursors).retain(|(room, _), _| room != room_id);
        }
    }
}

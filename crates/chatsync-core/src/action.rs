//! State-affecting events.
//!
//! Actions are built by the decoding layer, one per logical update, and
//! consumed exactly once by [`Store::dispatch`](crate::store::Store::dispatch).

use crate::model::{CursorRecord, RoomId, RoomRecord, UserId, UserRecord};
use crate::presence::PresenceState;
use crate::snapshot::UnreadCounts;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a cursor update came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorOrigin {
    /// A live `cursor set` event.
    #[default]
    Live,
    /// Part of a subscription's initial state, possibly older than what is
    /// already committed.
    InitialState,
}

/// A typed description of one state-affecting event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// The signed-in user's profile was received.
    CurrentUserReceived {
        /// The user.
        user: UserRecord,
    },
    /// The full list of joined rooms was received.
    JoinedRoomsReceived {
        /// Joined rooms.
        rooms: Vec<RoomRecord>,
        /// Unread counts by room.
        unread_counts: UnreadCounts,
    },
    /// The current user joined a room.
    JoinedRoom {
        /// The room.
        room: RoomRecord,
        /// Unread count at the time of joining.
        unread_count: u32,
    },
    /// A joined room's metadata changed.
    RoomUpdated {
        /// The room with its new metadata.
        room: RoomRecord,
    },
    /// The current user left or was removed from a room.
    LeftRoom {
        /// Room ID.
        room_id: RoomId,
    },
    /// A joined room was deleted.
    RoomDeleted {
        /// Room ID.
        room_id: RoomId,
    },
    /// A room's unread count changed.
    UnreadCountReceived {
        /// Room ID.
        room_id: RoomId,
        /// New unread count.
        unread_count: u32,
    },
    /// A room's read state changed: unread count and, optionally, the
    /// current user's cursor.
    ReadStateUpdated {
        /// Room ID.
        room_id: RoomId,
        /// New unread count.
        unread_count: u32,
        /// The cursor that moved, if any.
        cursor: Option<CursorRecord>,
    },
    /// The full member list of a room was received.
    MembershipsReceived {
        /// Room ID.
        room_id: RoomId,
        /// Member IDs.
        user_ids: Vec<UserId>,
    },
    /// A user joined a room.
    UserJoinedRoom {
        /// Room ID.
        room_id: RoomId,
        /// User ID.
        user_id: UserId,
    },
    /// A user left a room.
    UserLeftRoom {
        /// Room ID.
        room_id: RoomId,
        /// User ID.
        user_id: UserId,
    },
    /// A cursor was set.
    CursorSet {
        /// The cursor.
        cursor: CursorRecord,
        /// Live event or initial-state replay.
        #[serde(default)]
        origin: CursorOrigin,
    },
    /// A subscription's initial cursors were received.
    CursorsReceived {
        /// The cursors.
        cursors: Vec<CursorRecord>,
    },
    /// A user's presence changed.
    PresenceChanged {
        /// User ID.
        user_id: UserId,
        /// New presence.
        presence: PresenceState,
    },
    /// An event the decoder recognised as well-formed but has no model for.
    Unrecognized {
        /// Event name as sent by the server.
        name: String,
    },
}

/// Tag of an [`Action`] variant, used as the reducer registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    /// [`Action::CurrentUserReceived`].
    CurrentUserReceived,
    /// [`Action::JoinedRoomsReceived`].
    JoinedRoomsReceived,
    /// [`Action::JoinedRoom`].
    JoinedRoom,
    /// [`Action::RoomUpdated`].
    RoomUpdated,
    /// [`Action::LeftRoom`].
    LeftRoom,
    /// [`Action::RoomDeleted`].
    RoomDeleted,
    /// [`Action::UnreadCountReceived`].
    UnreadCountReceived,
    /// [`Action::ReadStateUpdated`].
    ReadStateUpdated,
    /// [`Action::MembershipsReceived`].
    MembershipsReceived,
    /// [`Action::UserJoinedRoom`].
    UserJoinedRoom,
    /// [`Action::UserLeftRoom`].
    UserLeftRoom,
    /// [`Action::CursorSet`].
    CursorSet,
    /// [`Action::CursorsReceived`].
    CursorsReceived,
    /// [`Action::PresenceChanged`].
    PresenceChanged,
    /// [`Action::Unrecognized`].
    Unrecognized,
}

impl ActionKind {
    /// Every kind, in declaration order.
    pub const ALL: [ActionKind; 15] = [
        Self::CurrentUserReceived,
        Self::JoinedRoomsReceived,
        Self::JoinedRoom,
        Self::RoomUpdated,
        Self::LeftRoom,
        Self::RoomDeleted,
        Self::UnreadCountReceived,
        Self::ReadStateUpdated,
        Self::MembershipsReceived,
        Self::UserJoinedRoom,
        Self::UserLeftRoom,
        Self::CursorSet,
        Self::CursorsReceived,
        Self::PresenceChanged,
        Self::Unrecognized,
    ];

    /// Stable snake-case name, used for logs and metric labels.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CurrentUserReceived => "current_user_received",
            Self::JoinedRoomsReceived => "joined_rooms_received",
            Self::JoinedRoom => "joined_room",
            Self::RoomUpdated => "room_updated",
            Self::LeftRoom => "left_room",
            Self::RoomDeleted => "room_deleted",
            Self::UnreadCountReceived => "unread_count_received",
            Self::ReadStateUpdated => "read_state_updated",
            Self::MembershipsReceived => "memberships_received",
            Self::UserJoinedRoom => "user_joined_room",
            Self::UserLeftRoom => "user_left_room",
            Self::CursorSet => "cursor_set",
            Self::CursorsReceived => "cursors_received",
            Self::PresenceChanged => "presence_changed",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Action {
    /// The variant tag.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::CurrentUserReceived { .. } => ActionKind::CurrentUserReceived,
            Self::JoinedRoomsReceived { .. } => ActionKind::JoinedRoomsReceived,
            Self::JoinedRoom { .. } => ActionKind::JoinedRoom,
            Self::RoomUpdated { .. } => ActionKind::RoomUpdated,
            Self::LeftRoom { .. } => ActionKind::LeftRoom,
            Self::RoomDeleted { .. } => ActionKind::RoomDeleted,
            Self::UnreadCountReceived { .. } => ActionKind::UnreadCountReceived,
            Self::ReadStateUpdated { .. } => ActionKind::ReadStateUpdated,
            Self::MembershipsReceived { .. } => ActionKind::MembershipsReceived,
            Self::UserJoinedRoom { .. } => ActionKind::UserJoinedRoom,
            Self::UserLeftRoom { .. } => ActionKind::UserLeftRoom,
            Self::CursorSet { .. } => ActionKind::CursorSet,
            Self::CursorsReceived { .. } => ActionKind::CursorsReceived,
            Self::PresenceChanged { .. } => ActionKind::PresenceChanged,
            Self::Unrecognized { .. } => ActionKind::Unrecognized,
        }
    }

    /// A live cursor update.
    #[must_use]
    pub fn cursor_set(cursor: CursorRecord) -> Self {
        Self::CursorSet {
            cursor,
            origin: CursorOrigin::Live,
        }
    }

    /// A cursor replayed from a subscription's initial state.
    #[must_use]
    pub fn initial_cursor(cursor: CursorRecord) -> Self {
        Self::CursorSet {
            cursor,
            origin: CursorOrigin::InitialState,
        }
    }

    /// A presence change.
    #[must_use]
    pub fn presence(user_id: impl Into<UserId>, presence: PresenceState) -> Self {
        Self::PresenceChanged {
            user_id: user_id.into(),
            presence,
        }
    }
}

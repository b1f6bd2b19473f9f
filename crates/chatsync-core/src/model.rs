//! Domain records held inside a [`Snapshot`](crate::snapshot::Snapshot).
//!
//! Records are plain values. They are produced by the decoding layer and
//! only ever change by being replaced inside a new snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

/// A room identifier.
pub type RoomId = String;

/// A user identifier.
pub type UserId = String;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Current wall-clock time in milliseconds.
#[must_use]
pub fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// The user this client is signed in as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User ID.
    pub id: UserId,
    /// Display name.
    pub name: Option<String>,
    /// Avatar URL.
    pub avatar_url: Option<String>,
    /// User-defined metadata.
    pub custom_data: Option<serde_json::Value>,
    /// When the user was created.
    pub created_at: Timestamp,
    /// When the user was last updated.
    pub updated_at: Timestamp,
}

impl UserRecord {
    /// Create a user record with only an ID and timestamps.
    #[must_use]
    pub fn new(id: impl Into<UserId>, updated_at: Timestamp) -> Self {
        Self {
            id: id.into(),
            name: None,
            avatar_url: None,
            custom_data: None,
            created_at: updated_at,
            updated_at,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A room the current user has joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRecord {
    /// Room ID.
    pub id: RoomId,
    /// Room name.
    pub name: String,
    /// ID of the user who created the room.
    pub created_by_id: UserId,
    /// Whether the room is private.
    pub is_private: bool,
    /// User-defined metadata.
    pub custom_data: Option<serde_json::Value>,
    /// Push notification title override.
    pub push_notification_title_override: Option<String>,
    /// When the room was created.
    pub created_at: Timestamp,
    /// When the room was last updated.
    pub updated_at: Timestamp,
    /// When the room was deleted, if it was.
    pub deleted_at: Option<Timestamp>,
    /// When the last message was sent.
    pub last_message_at: Option<Timestamp>,
    /// IDs of the room's members.
    pub member_user_ids: BTreeSet<UserId>,
    /// Unread message count for the current user.
    ///
    /// Mirrors the snapshot's unread table; reducers keep both in step.
    pub unread_count: u32,
}

impl RoomRecord {
    /// Create a room record with empty membership and no metadata.
    #[must_use]
    pub fn new(
        id: impl Into<RoomId>,
        name: impl Into<String>,
        created_by_id: impl Into<UserId>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_by_id: created_by_id.into(),
            is_private: false,
            custom_data: None,
            push_notification_title_override: None,
            created_at,
            updated_at: created_at,
            deleted_at: None,
            last_message_at: None,
            member_user_ids: BTreeSet::new(),
            unread_count: 0,
        }
    }

    /// Mark the room private.
    #[must_use]
    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    /// Set the member set.
    #[must_use]
    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<UserId>,
    {
        self.member_user_ids = members.into_iter().map(Into::into).collect();
        self
    }

    /// Check whether a user is a member.
    #[must_use]
    pub fn has_member(&self, user_id: &str) -> bool {
        self.member_user_ids.contains(user_id)
    }

    /// Compare the server-owned metadata of two records, ignoring the
    /// member set and unread count that other actions maintain.
    #[must_use]
    pub fn same_metadata(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.created_by_id == other.created_by_id
            && self.is_private == other.is_private
            && self.custom_data == other.custom_data
            && self.push_notification_title_override == other.push_notification_title_override
            && self.created_at == other.created_at
            && self.updated_at == other.updated_at
            && self.deleted_at == other.deleted_at
            && self.last_message_at == other.last_message_at
    }
}

/// Kind of cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorKind {
    /// Read cursor (wire value 0).
    #[default]
    Read,
}

impl CursorKind {
    /// Wire value of the kind.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Read => 0,
        }
    }
}

/// Key of the cursor table.
pub type CursorKey = (RoomId, UserId);

/// A user's position in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorRecord {
    /// Room ID.
    pub room_id: RoomId,
    /// User ID.
    pub user_id: UserId,
    /// Message position.
    pub position: i64,
    /// When the cursor was last moved.
    pub updated_at: Timestamp,
    /// Cursor kind.
    pub kind: CursorKind,
}

impl CursorRecord {
    /// Create a read cursor.
    #[must_use]
    pub fn read(
        room_id: impl Into<RoomId>,
        user_id: impl Into<UserId>,
        position: i64,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            user_id: user_id.into(),
            position,
            updated_at,
            kind: CursorKind::Read,
        }
    }

    /// The table key for this cursor.
    #[must_use]
    pub fn key(&self) -> CursorKey {
        (self.room_id.clone(), self.user_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_builder() {
        let room = RoomRecord::new("r1", "general", "alice", 10)
            .private()
            .with_members(["alice", "bob"]);

        assert!(room.is_private);
        assert!(room.has_member("bob"));
        assert!(!room.has_member("carol"));
        assert_eq!(room.updated_at, 10);
    }

    #[test]
    fn test_same_metadata_ignores_members_and_unread() {
        let a = RoomRecord::new("r1", "general", "alice", 10);
        let mut b = a.clone().with_members(["bob"]);
        b.unread_count = 4;
        assert!(a.same_metadata(&b));

        b.name = "random".to_string();
        assert!(!a.same_metadata(&b));
    }

    #[test]
    fn test_cursor_key() {
        let cursor = CursorRecord::read("r1", "alice", 3, 0);
        assert_eq!(cursor.key(), ("r1".to_string(), "alice".to_string()));
        assert_eq!(cursor.kind.as_u8(), 0);
    }
}

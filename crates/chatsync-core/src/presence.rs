//! Presence tracking for chatsync.
//!
//! Presence records whether other users are online. Entries are never
//! removed; the table is bounded by the number of users ever observed.

use crate::model::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Presence state for a single user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    /// The user has at least one live connection.
    Online,
    /// The user has no live connection.
    Offline,
    /// The user has never been observed.
    #[default]
    Unknown,
}

impl PresenceState {
    /// Parse the server's state string. Unrecognised values map to `Unknown`.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "online" => Self::Online,
            "offline" => Self::Offline,
            _ => Self::Unknown,
        }
    }

    /// Check if the user is online.
    #[must_use]
    pub fn is_online(self) -> bool {
        self == Self::Online
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Presence table keyed by user ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    members: HashMap<UserId, PresenceState>,
}

impl Presence {
    /// Create an empty presence table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of observed users.
    #[must_use]
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Get a user's presence. Users never observed are `Unknown`.
    #[must_use]
    pub fn get(&self, user_id: &str) -> PresenceState {
        self.members.get(user_id).copied().unwrap_or_default()
    }

    /// Record a user's presence.
    ///
    /// Returns `true` if the stored state changed.
    pub fn set(&mut self, user_id: impl Into<UserId>, state: PresenceState) -> bool {
        let user_id = user_id.into();
        self.members.insert(user_id, state) != Some(state)
    }

    /// IDs of users currently online.
    #[must_use]
    pub fn online(&self) -> Vec<&str> {
        self.members
            .iter()
            .filter(|(_, state)| state.is_online())
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Check if no user has been observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

//! Reducer registry.
//!
//! Maps each [`ActionKind`] to exactly one pure function
//! `(&Snapshot, &Action) -> Snapshot`. The registry is an ordinary value
//! handed to the [`Store`](crate::store::Store) at construction.

use crate::action::{Action, ActionKind};
use crate::config::EngineConfig;
use crate::reducers;
use crate::snapshot::Snapshot;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A reducer was handed an action it is not written for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReduceError {
    /// The action's variant does not match the reducer.
    #[error("Reducer for {expected} received {actual} action")]
    UnexpectedAction {
        /// Variant the reducer handles.
        expected: ActionKind,
        /// Variant it received.
        actual: ActionKind,
    },
}

impl ReduceError {
    /// Build an [`ReduceError::UnexpectedAction`] for `action`.
    #[must_use]
    pub fn unexpected(expected: ActionKind, action: &Action) -> Self {
        Self::UnexpectedAction {
            expected,
            actual: action.kind(),
        }
    }
}

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A reducer is already registered for this variant.
    #[error("Reducer already registered for {0}")]
    AlreadyRegistered(ActionKind),
}

/// A pure state transition for one action variant.
///
/// Reducers must not block, perform I/O, or touch anything but their
/// arguments.
pub type Reducer = Arc<dyn Fn(&Snapshot, &Action) -> Result<Snapshot, ReduceError> + Send + Sync>;

/// Mapping from action variant to reducer.
#[derive(Clone, Default)]
pub struct ReducerRegistry {
    reducers: HashMap<ActionKind, Reducer>,
}

impl ReducerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in reducer for every modelled
    /// variant. [`ActionKind::Unrecognized`] is left unregistered.
    #[must_use]
    pub fn with_defaults(config: &EngineConfig) -> Self {
        let policy = config.cursor_replay;
        let defaults: [(ActionKind, Reducer); 14] = [
            (ActionKind::CurrentUserReceived, Arc::new(reducers::current_user_received)),
            (ActionKind::JoinedRoomsReceived, Arc::new(reducers::joined_rooms_received)),
            (ActionKind::JoinedRoom, Arc::new(reducers::joined_room)),
            (ActionKind::RoomUpdated, Arc::new(reducers::room_updated)),
            (ActionKind::LeftRoom, Arc::new(reducers::left_room)),
            (ActionKind::RoomDeleted, Arc::new(reducers::room_deleted)),
            (ActionKind::UnreadCountReceived, Arc::new(reducers::unread_count_received)),
            (ActionKind::ReadStateUpdated, Arc::new(reducers::read_state_updated)),
            (ActionKind::MembershipsReceived, Arc::new(reducers::memberships_received)),
            (ActionKind::UserJoinedRoom, Arc::new(reducers::user_joined_room)),
            (ActionKind::UserLeftRoom, Arc::new(reducers::user_left_room)),
            (
                ActionKind::CursorSet,
                Arc::new(move |s: &Snapshot, a: &Action| reducers::cursor_set(s, a, policy)),
            ),
            (
                ActionKind::CursorsReceived,
                Arc::new(move |s: &Snapshot, a: &Action| reducers::cursors_received(s, a, policy)),
            ),
            (ActionKind::PresenceChanged, Arc::new(reducers::presence_changed)),
        ];

        Self {
            reducers: defaults.into_iter().collect(),
        }
    }

    /// Register the reducer for a variant.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyRegistered`] if the variant already
    /// has a reducer.
    pub fn register<F>(&mut self, kind: ActionKind, reducer: F) -> Result<(), RegistryError>
    where
        F: Fn(&Snapshot, &Action) -> Result<Snapshot, ReduceError> + Send + Sync + 'static,
    {
        if self.reducers.contains_key(&kind) {
            return Err(RegistryError::AlreadyRegistered(kind));
        }
        self.reducers.insert(kind, Arc::new(reducer));
        Ok(())
    }

    /// Remove the reducer for a variant, returning it.
    pub fn unregister(&mut self, kind: ActionKind) -> Option<Reducer> {
        self.reducers.remove(&kind)
    }

    /// Check whether a variant has a reducer.
    #[must_use]
    pub fn is_registered(&self, kind: ActionKind) -> bool {
        self.reducers.contains_key(&kind)
    }

    /// Get the number of registered reducers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    /// Check if no reducer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }

    /// Apply an action to a snapshot.
    ///
    /// Actions without a registered reducer leave the snapshot unchanged.
    ///
    /// # Errors
    ///
    /// Propagates a [`ReduceError`] raised by the reducer.
    pub fn apply(&self, snapshot: &Snapshot, action: &Action) -> Result<Snapshot, ReduceError> {
        match self.reducers.get(&action.kind()) {
            Some(reducer) => reducer(snapshot, action),
            None => Ok(snapshot.clone()),
        }
    }
}

impl fmt::Debug for ReducerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&ActionKind> = self.reducers.keys().collect();
        kinds.sort();
        f.debug_struct("ReducerRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

//! # chatsync-core
//!
//! Client-side state synchronisation for a chat SDK.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **Snapshot** - Immutable client state: current user, joined rooms, read
//!   cursors, presence, unread counts
//! - **Action** - Discrete events that describe a state change
//! - **Reducer** - Pure functions turning `(snapshot, action)` into the next
//!   snapshot, looked up in a registry by action kind
//! - **Store** - Serialised dispatch and snapshot publication
//! - **Multiplexer** - One upstream registration shared by many consumers
//! - **LifecycleController** - An upstream bound to an activation signal
//! - **Differ** - Turns a fresh joined-rooms list into incremental actions
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Producers  │────▶│    Store    │────▶│  Snapshots  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │                   │
//!                            ▼                   ▼
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │  Reducers   │     │ Multiplexer │
//!                     └─────────────┘     │ / Lifecycle │
//!                                         └─────────────┘
//! ```

pub mod action;
pub mod config;
pub mod differ;
mod hub;
pub mod lifecycle;
pub mod model;
pub mod multiplexer;
pub mod presence;
pub mod reducer;
pub mod reducers;
pub mod snapshot;
pub mod store;
pub mod subscription;

pub use action::{Action, ActionKind, CursorOrigin};
pub use config::{CursorReplayPolicy, EngineConfig};
pub use differ::joined_rooms_actions;
pub use hub::{Consumer, ConsumerId, Emitter, HubStats, UpstreamError, UpstreamFactory};
pub use lifecycle::{LifecycleController, LifecycleObserver, LifecyclePhase, LifecycleSignal};
pub use model::{
    CursorKey, CursorKind, CursorRecord, RoomId, RoomRecord, Timestamp, UserId, UserRecord,
};
pub use multiplexer::Multiplexer;
pub use presence::{Presence, PresenceState};
pub use reducer::{ReduceError, Reducer, ReducerRegistry, RegistryError};
pub use snapshot::{Snapshot, UnreadCounts};
pub use store::{SnapshotStream, Store, StoreError, StoreStats};
pub use subscription::SubscriptionHandle;

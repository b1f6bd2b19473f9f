//! Engine configuration.

use serde::{Deserialize, Serialize};

/// How an initial-state cursor reconciles with one already committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorReplayPolicy {
    /// Keep the committed cursor when its position is strictly greater.
    #[default]
    KeepHigher,
    /// Always take the replayed cursor.
    Overwrite,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Initial-state cursor policy.
    #[serde(default)]
    pub cursor_replay: CursorReplayPolicy,
    /// Whether lifecycle controllers replay the last value to new consumers.
    #[serde(default = "default_true")]
    pub replay_last_value: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cursor_replay: CursorReplayPolicy::default(),
            replay_last_value: true,
        }
    }
}

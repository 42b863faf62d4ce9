//! Versioned save state and the debounced write queue.
//!
//! Persistence itself is an external collaborator behind [`SaveSink`]; the
//! simulation only produces snapshots. Writes are fire-and-forget and
//! trailing-edge debounced: rapid successive changes coalesce into a single
//! write once the board has been quiet for the debounce window. Teardown
//! must call `flush` to push the final snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::artifacts::ArtifactInstance;
use crate::craft::CraftBoard;

pub const SAVE_VERSION: u32 = 3;

/// The single persisted blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    pub version: u32,
    pub balance: f64,
    pub lifetime_earned: f64,
    pub level: u32,
    pub prestige_count: u32,
    /// Permanent production multiplier from prestige + boss victories.
    pub perm_multiplier: f64,
    pub farm_multiplier: f64,
    /// Upgrade key -> purchased level.
    pub upgrades: BTreeMap<String, u32>,
    pub artifacts: Vec<ArtifactInstance>,
    /// Equipped artifact ids (at most 3 contribute).
    pub equipped: Vec<String>,
    pub craft_board: CraftBoard,
    pub cosmetic_id: Option<String>,
    /// Checkpoint for offline accrual.
    pub last_seen_unix: u64,
}

impl Default for SaveState {
    fn default() -> Self {
        Self {
            version: SAVE_VERSION,
            balance: 0.0,
            lifetime_earned: 0.0,
            level: 1,
            prestige_count: 0,
            perm_multiplier: 1.0,
            farm_multiplier: 1.0,
            upgrades: BTreeMap::new(),
            artifacts: Vec::new(),
            equipped: Vec::new(),
            craft_board: CraftBoard::default(),
            cosmetic_id: None,
            last_seen_unix: 0,
        }
    }
}

/// External key-value blob store (load/save/wipe).
pub trait SaveSink {
    fn save(&mut self, blob: &SaveState);
    fn load(&self) -> Option<SaveState>;
    fn wipe(&mut self);
}

/// Trailing-edge debounce over save snapshots. Not a timer itself: the
/// owner polls `take_due` from its tick loop and hands the snapshot to the
/// sink.
#[derive(Debug, Default)]
pub struct SaveQueue {
    pending: Option<SaveState>,
    due_at_unix: u64,
}

/// Quiet period before a pending snapshot is flushed.
pub const SAVE_DEBOUNCE_SECS: u64 = 2;

impl SaveQueue {
    /// Record the latest snapshot and re-arm the quiet period.
    pub fn schedule(&mut self, snapshot: SaveState, now_unix: u64) {
        self.pending = Some(snapshot);
        self.due_at_unix = now_unix + SAVE_DEBOUNCE_SECS;
    }

    /// Yield the snapshot once the quiet period has elapsed.
    pub fn take_due(&mut self, now_unix: u64) -> Option<SaveState> {
        if self.pending.is_some() && now_unix >= self.due_at_unix {
            return self.pending.take();
        }
        None
    }

    /// Force out whatever is pending (process teardown).
    pub fn flush(&mut self) -> Option<SaveState> {
        self.pending.take()
    }
}

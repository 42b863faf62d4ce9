//! Craft board: a fixed grid of 20 slots holding item levels.
//!
//! Level 0 means empty; levels 1..=50 are populated. Two equal-level items
//! merge into one item a level higher. Every operation validates before
//! mutating, so a failed call leaves the board unchanged.

use serde::{Deserialize, Serialize};

use crate::catalog::{CRAFT_MAX_LEVEL, CRAFT_SLOT_COUNT};
use crate::pricing::{craft_income_per_hour, craft_item_price};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CraftError {
    #[error("slot index {0} out of range")]
    OutOfRange(usize),
    #[error("slot {0} is empty")]
    EmptySlot(usize),
    #[error("slot {0} is occupied")]
    OccupiedSlot(usize),
    #[error("board is full")]
    BoardFull,
    #[error("cannot merge levels {0} and {1}")]
    MergeMismatch(u32, u32),
    #[error("item is already at max level")]
    MaxLevel,
}

/// Fraction of the purchase price refunded on sell.
const SELL_REFUND_RATIO: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftBoard {
    slots: [u32; CRAFT_SLOT_COUNT],
}

impl Default for CraftBoard {
    fn default() -> Self {
        Self { slots: [0; CRAFT_SLOT_COUNT] }
    }
}

impl CraftBoard {
    pub fn slots(&self) -> &[u32; CRAFT_SLOT_COUNT] {
        &self.slots
    }

    pub fn level_at(&self, idx: usize) -> Option<u32> {
        self.slots.get(idx).copied().filter(|&l| l > 0)
    }

    /// Place a bought item of `level` into the first free slot.
    pub fn place(&mut self, level: u32) -> Result<usize, CraftError> {
        let level = level.clamp(1, CRAFT_MAX_LEVEL);
        let idx = self
            .slots
            .iter()
            .position(|&l| l == 0)
            .ok_or(CraftError::BoardFull)?;
        self.slots[idx] = level;
        Ok(idx)
    }

    /// Merge `src` into `dst`: both must hold the same level below max.
    /// `dst` gains a level, `src` is cleared.
    pub fn merge(&mut self, src: usize, dst: usize) -> Result<u32, CraftError> {
        if src == dst {
            return Err(CraftError::MergeMismatch(0, 0));
        }
        let a = self.level_at(src).ok_or(CraftError::EmptySlot(src))?;
        let b = self.level_at(dst).ok_or(CraftError::EmptySlot(dst))?;
        if a != b {
            return Err(CraftError::MergeMismatch(a, b));
        }
        if a >= CRAFT_MAX_LEVEL {
            return Err(CraftError::MaxLevel);
        }
        self.slots[src] = 0;
        self.slots[dst] = a + 1;
        Ok(a + 1)
    }

    /// Move an item to an empty slot.
    pub fn move_item(&mut self, src: usize, dst: usize) -> Result<(), CraftError> {
        if dst >= CRAFT_SLOT_COUNT {
            return Err(CraftError::OutOfRange(dst));
        }
        let level = self.level_at(src).ok_or(CraftError::EmptySlot(src))?;
        if self.slots[dst] != 0 {
            return Err(CraftError::OccupiedSlot(dst));
        }
        self.slots[src] = 0;
        self.slots[dst] = level;
        Ok(())
    }

    /// Sell the item in `idx`, returning the refund amount.
    pub fn sell(&mut self, idx: usize) -> Result<u64, CraftError> {
        let level = self.level_at(idx).ok_or(CraftError::EmptySlot(idx))?;
        self.slots[idx] = 0;
        Ok((craft_item_price(level) as f64 * SELL_REFUND_RATIO) as u64)
    }

    /// Total passive income per hour over all populated slots.
    pub fn income_per_hour(&self) -> f64 {
        self.slots
            .iter()
            .filter(|&&l| l > 0)
            .map(|&l| craft_income_per_hour(l))
            .sum()
    }
}

//! Boss encounters.
//!
//! The encounter is a tagged state machine with a single transition
//! function; there is no way to observe an "active flag" that disagrees
//! with the HP pool or the timer.

use serde::{Deserialize, Serialize};

use crate::catalog::BOSSES;

/// Resolved parameters for a boss tier. Tiers past the predefined catalog
/// grow geometrically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BossSpec {
    pub tier: u32,
    pub base_hp: f64,
    pub duration_secs: u32,
    pub cooldown_secs: u32,
}

const PROCEDURAL_HP_GROWTH: f64 = 1.6;
const PROCEDURAL_DURATION_STEP: u32 = 5;
const PROCEDURAL_COOLDOWN_STEP: u32 = 60;

/// Parameters for boss `tier` (1-based). Tier 0 clamps to 1.
pub fn boss_spec(tier: u32) -> BossSpec {
    let tier = tier.max(1);
    let last = BOSSES.len() as u32;
    if tier <= last {
        let entry = &BOSSES[tier as usize - 1];
        return BossSpec {
            tier,
            base_hp: entry.base_hp,
            duration_secs: entry.duration_secs,
            cooldown_secs: entry.cooldown_secs,
        };
    }
    let beyond = tier - last;
    let tail = &BOSSES[BOSSES.len() - 1];
    BossSpec {
        tier,
        base_hp: tail.base_hp * PROCEDURAL_HP_GROWTH.powi(beyond as i32),
        duration_secs: tail.duration_secs + PROCEDURAL_DURATION_STEP * beyond,
        cooldown_secs: tail.cooldown_secs + PROCEDURAL_COOLDOWN_STEP * beyond,
    }
}

/// Rewards emitted on victory. The caller applies them (permanent
/// multiplier, balance credit, artifact roll) and advances the level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BossRewards {
    pub multiplier_gain: f64,
    pub currency: u64,
    pub artifact_chance: f64,
}

fn rewards_for(tier: u32, prestige_count: u32) -> BossRewards {
    let spec = boss_spec(tier);
    BossRewards {
        multiplier_gain: 0.05 * tier as f64,
        currency: (spec.base_hp * 0.4 * (1.0 + 0.25 * prestige_count as f64)) as u64,
        artifact_chance: (0.05 + 0.02 * tier as f64 + 0.01 * prestige_count as f64).min(0.5),
    }
}

/// Encounter state. `Victory`/`Fled` are terminal; the next tick returns
/// the machine to `Idle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Encounter {
    Idle,
    Active {
        tier: u32,
        hp: f64,
        max_hp: f64,
        time_left: u32,
        prestige_count: u32,
    },
    Victory { tier: u32, rewards: BossRewards },
    Fled { tier: u32, cooldown_secs: u32 },
}

/// Boss fights unlock every 10th level starting at 10.
pub fn is_boss_level(level: u32) -> bool {
    level >= 10 && level % 10 == 0
}

impl Encounter {
    /// Start a fight. HP scales with the epoch bonus and prestige count.
    pub fn start(tier: u32, epoch_bonus: f64, prestige_count: u32) -> Self {
        let spec = boss_spec(tier);
        let hp = (spec.base_hp * epoch_bonus * 1.25f64.powi(prestige_count as i32)).floor();
        tracing::debug!(tier, hp, duration = spec.duration_secs, "boss encounter started");
        Self::Active {
            tier,
            hp,
            max_hp: hp,
            time_left: spec.duration_secs,
            prestige_count,
        }
    }

    /// Advance one tick with the damage dealt during it. The only
    /// transition function: defeat wins the race when HP and the timer
    /// reach zero in the same tick.
    pub fn tick(self, damage: f64) -> Self {
        match self {
            Self::Active { tier, hp, max_hp, time_left, prestige_count } => {
                let hp = hp - damage;
                let time_left = time_left.saturating_sub(1);
                if hp <= 0.0 {
                    return Self::Victory { tier, rewards: rewards_for(tier, prestige_count) };
                }
                if time_left == 0 {
                    return Self::Fled {
                        tier,
                        cooldown_secs: boss_spec(tier).cooldown_secs,
                    };
                }
                Self::Active { tier, hp, max_hp, time_left, prestige_count }
            }
            // Terminal states drain back to idle once observed.
            Self::Victory { .. } | Self::Fled { .. } => Self::Idle,
            Self::Idle => Self::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

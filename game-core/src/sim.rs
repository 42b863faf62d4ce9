//! Cooperative simulation driver.
//!
//! A single 1 Hz tick advances auto production, the boss encounter, the
//! retry cooldown and the meteor countdown, in that order. Player actions
//! (tap, buy, fuse, equip) apply synchronously between ticks; there are no
//! other suspension points.

use rand::Rng;

use crate::accrual::offline_grant;
use crate::artifacts::{
    add_drop, aggregate_bonuses, opened_tier, ArtifactInstance, ChannelBonuses, Rarity,
};
use crate::boss::{is_boss_level, Encounter};
use crate::catalog::{epoch_multiplier, ARTIFACTS};
use crate::loot::pick_weighted;
use crate::pricing::upgrade_cost;
use crate::save::SaveState;

pub const TICK_SECS: u64 = 1;

/// Seconds between meteor spawns, and how long one stays collectable.
pub const METEOR_SPAWN_SECS: u32 = 120;
pub const METEOR_WINDOW_SECS: u32 = 12;
/// A collected meteor pays out this many seconds of auto income.
const METEOR_REWARD_SECS: f64 = 90.0;

const UPGRADE_TAP: &str = "tap";
const UPGRADE_AUTO: &str = "auto";

fn rarity_drop_weight(rarity: Rarity) -> f64 {
    match rarity {
        Rarity::Common => 100.0,
        Rarity::Rare => 40.0,
        Rarity::Epic => 10.0,
        Rarity::Legendary => 1.0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Meteor {
    Counting { secs_left: u32 },
    Active { secs_left: u32 },
}

/// Things a tick produced, for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum TickEvent {
    BossDefeated { tier: u32, currency: u64 },
    BossFled { tier: u32, cooldown_secs: u32 },
    ArtifactDropped { id: String },
    MeteorSpawned,
    MeteorExpired,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("not enough currency")]
    InsufficientFunds,
    #[error("no boss fight available at this level")]
    NotBossLevel,
    #[error("boss retry cooldown: {0}s left")]
    CooldownPending(u32),
    #[error("a fight is already running")]
    AlreadyFighting,
    #[error("no meteor to collect")]
    NoMeteor,
    #[error("equip slots are full")]
    EquipFull,
    #[error("artifact not owned")]
    NotOwned,
}

pub struct GameSim<R: Rng> {
    pub state: SaveState,
    pub encounter: Encounter,
    boss_cooldown_secs: u32,
    meteor: Meteor,
    /// Damage dealt since the last tick; consumed by the encounter tick.
    damage_buffer: f64,
    rng: R,
}

impl<R: Rng> GameSim<R> {
    pub fn new(state: SaveState, rng: R) -> Self {
        Self {
            state,
            encounter: Encounter::Idle,
            boss_cooldown_secs: 0,
            meteor: Meteor::Counting { secs_left: METEOR_SPAWN_SECS },
            damage_buffer: 0.0,
            rng,
        }
    }

    // ========================================================================
    // Rates
    // ========================================================================

    fn equipped_instances(&self) -> Vec<ArtifactInstance> {
        self.state
            .equipped
            .iter()
            .filter_map(|id| self.state.artifacts.iter().find(|a| &a.id == id))
            .cloned()
            .collect()
    }

    pub fn bonuses(&self) -> ChannelBonuses {
        aggregate_bonuses(&self.equipped_instances())
    }

    fn epoch(&self) -> f64 {
        epoch_multiplier(self.state.level)
    }

    /// Currency per tap.
    pub fn click_power(&self) -> f64 {
        let tap_level = self.state.upgrades.get(UPGRADE_TAP).copied().unwrap_or(0);
        (1.0 + tap_level as f64)
            * self.epoch()
            * self.state.perm_multiplier
            * (1.0 + self.bonuses().click)
    }

    /// Per-channel production before the epoch and farm multipliers.
    fn production_channels(&self) -> (f64, f64) {
        let bonuses = self.bonuses();
        let auto_level = self.state.upgrades.get(UPGRADE_AUTO).copied().unwrap_or(0);
        let auto = auto_level as f64 * (1.0 + bonuses.auto);
        let farm = self.state.craft_board.income_per_hour() / 3600.0 * (1.0 + bonuses.farm);
        (auto, farm)
    }

    /// Passive currency per second (auto upgrades + craft board farm).
    pub fn auto_per_sec(&self) -> f64 {
        let (auto, farm) = self.production_channels();
        (auto + farm * self.state.farm_multiplier) * self.epoch() * self.state.perm_multiplier
    }

    fn credit(&mut self, amount: f64) {
        self.state.balance += amount;
        self.state.lifetime_earned += amount;
    }

    // ========================================================================
    // Player actions (synchronous, between ticks)
    // ========================================================================

    /// A tap: deals boss damage during a fight, earns currency otherwise.
    pub fn tap(&mut self) {
        let power = self.click_power();
        if self.encounter.is_active() {
            self.damage_buffer += power;
        } else {
            self.credit(power);
        }
    }

    pub fn buy_upgrade(&mut self, key: &str) -> Result<u32, ActionError> {
        let current = self.state.upgrades.get(key).copied().unwrap_or(0);
        let cost = upgrade_cost(current + 1) as f64;
        if self.state.balance < cost {
            return Err(ActionError::InsufficientFunds);
        }
        self.state.balance -= cost;
        let next = current + 1;
        self.state.upgrades.insert(key.to_string(), next);
        Ok(next)
    }

    pub fn equip(&mut self, id: &str) -> Result<(), ActionError> {
        if !self.state.artifacts.iter().any(|a| a.id == id) {
            return Err(ActionError::NotOwned);
        }
        if self.state.equipped.iter().any(|e| e == id) {
            return Ok(());
        }
        if self.state.equipped.len() >= crate::artifacts::MAX_EQUIPPED {
            return Err(ActionError::EquipFull);
        }
        self.state.equipped.push(id.to_string());
        Ok(())
    }

    pub fn try_start_boss(&mut self) -> Result<(), ActionError> {
        if self.encounter.is_active() {
            return Err(ActionError::AlreadyFighting);
        }
        if !is_boss_level(self.state.level) {
            return Err(ActionError::NotBossLevel);
        }
        if self.boss_cooldown_secs > 0 {
            return Err(ActionError::CooldownPending(self.boss_cooldown_secs));
        }
        let tier = self.state.level / 10;
        self.damage_buffer = 0.0;
        self.encounter = Encounter::start(tier, self.epoch(), self.state.prestige_count);
        Ok(())
    }

    pub fn collect_meteor(&mut self) -> Result<f64, ActionError> {
        match self.meteor {
            Meteor::Active { .. } => {
                let reward = (self.auto_per_sec() * METEOR_REWARD_SECS).max(self.click_power());
                self.credit(reward);
                self.meteor = Meteor::Counting { secs_left: METEOR_SPAWN_SECS };
                Ok(reward)
            }
            Meteor::Counting { .. } => Err(ActionError::NoMeteor),
        }
    }

    /// Convert cumulative earnings into permanent multiplier and reset the
    /// run (artifacts and craft board survive).
    pub fn prestige(&mut self) {
        let gain = (self.state.lifetime_earned / 1_000_000.0).sqrt().floor() * 0.1;
        self.state.prestige_count += 1;
        self.state.perm_multiplier += gain;
        self.state.balance = 0.0;
        self.state.level = 1;
        self.state.upgrades.clear();
        self.encounter = Encounter::Idle;
        self.boss_cooldown_secs = 0;
        self.damage_buffer = 0.0;
        tracing::info!(
            prestige = self.state.prestige_count,
            multiplier = self.state.perm_multiplier,
            "prestige reset"
        );
    }

    /// Session resume: apply the capped offline grant once and move the
    /// checkpoint forward. The grant itself applies the epoch and farm
    /// multipliers from the checkpoint state, so the rate passed in must
    /// not already carry them.
    pub fn resume(&mut self, now_unix: u64) -> f64 {
        let (auto, farm) = self.production_channels();
        let rate = (auto + farm) * self.state.perm_multiplier;
        let grant = offline_grant(
            self.state.last_seen_unix,
            now_unix,
            rate,
            self.state.level,
            self.state.farm_multiplier,
        );
        self.credit(grant);
        self.state.last_seen_unix = now_unix;
        grant
    }

    // ========================================================================
    // Tick
    // ========================================================================

    pub fn tick(&mut self, now_unix: u64) -> Vec<TickEvent> {
        let mut events = Vec::new();

        // Passive production.
        let income = self.auto_per_sec() * TICK_SECS as f64;
        self.credit(income);

        // During a fight auto damage also lands on the boss.
        if self.encounter.is_active() {
            self.damage_buffer += self.auto_per_sec();
        }

        self.boss_cooldown_secs = self.boss_cooldown_secs.saturating_sub(1);

        let damage = std::mem::take(&mut self.damage_buffer);
        match std::mem::replace(&mut self.encounter, Encounter::Idle).tick(damage) {
            Encounter::Victory { tier, rewards } => {
                self.state.perm_multiplier += rewards.multiplier_gain;
                self.credit(rewards.currency as f64);
                self.state.level += 1;
                events.push(TickEvent::BossDefeated { tier, currency: rewards.currency });
                if self.rng.gen::<f64>() < rewards.artifact_chance {
                    if let Some(id) = self.roll_artifact() {
                        add_drop(&mut self.state.artifacts, &id);
                        events.push(TickEvent::ArtifactDropped { id });
                    }
                }
            }
            Encounter::Fled { tier, cooldown_secs } => {
                self.boss_cooldown_secs = cooldown_secs;
                events.push(TickEvent::BossFled { tier, cooldown_secs });
            }
            next => self.encounter = next,
        }

        self.meteor = match self.meteor.clone() {
            Meteor::Counting { secs_left } => {
                let secs_left = secs_left.saturating_sub(1);
                if secs_left == 0 {
                    events.push(TickEvent::MeteorSpawned);
                    Meteor::Active { secs_left: METEOR_WINDOW_SECS }
                } else {
                    Meteor::Counting { secs_left }
                }
            }
            Meteor::Active { secs_left } => {
                let secs_left = secs_left.saturating_sub(1);
                if secs_left == 0 {
                    events.push(TickEvent::MeteorExpired);
                    Meteor::Counting { secs_left: METEOR_SPAWN_SECS }
                } else {
                    Meteor::Active { secs_left }
                }
            }
        };

        self.state.last_seen_unix = now_unix;
        events
    }

    /// One-shot weighted drop among artifacts unlocked at the current tier.
    fn roll_artifact(&mut self) -> Option<String> {
        let tier = opened_tier(self.state.level);
        let table: Vec<(&str, f64)> = ARTIFACTS
            .iter()
            .filter(|a| a.unlock_tier <= tier)
            .map(|a| (a.id, rarity_drop_weight(a.rarity)))
            .collect();
        pick_weighted(&table, &mut self.rng).map(|id| id.to_string())
    }

    pub fn boss_cooldown_secs(&self) -> u32 {
        self.boss_cooldown_secs
    }

    pub fn meteor(&self) -> &Meteor {
        &self.meteor
    }
}

//! Artifact bonuses and rarity fusion.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{artifact_def, ARTIFACTS};

/// Artifact rarity tiers, ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// The rarity fusion produces from this one; `None` at the top.
    pub fn next(&self) -> Option<Rarity> {
        match self {
            Self::Common => Some(Self::Rare),
            Self::Rare => Some(Self::Epic),
            Self::Epic => Some(Self::Legendary),
            Self::Legendary => None,
        }
    }
}

/// How an artifact's bonus applies to the three production channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BonusShape {
    /// One combined multiplier applied to click, auto and farm alike.
    All(f64),
    PerChannel { click: f64, auto: f64, farm: f64 },
}

/// Static artifact definition (see `catalog::ARTIFACTS`).
#[derive(Debug, Clone, Copy)]
pub struct ArtifactDef {
    pub id: &'static str,
    pub name: &'static str,
    pub rarity: Rarity,
    pub unlock_tier: u32,
    pub bonus: BonusShape,
}

/// An owned artifact: a catalog reference plus a level that grows on
/// duplicate drops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInstance {
    pub id: String,
    pub level: u32,
}

/// Aggregate additive bonuses per production channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelBonuses {
    pub click: f64,
    pub auto: f64,
    pub farm: f64,
}

pub const MAX_EQUIPPED: usize = 3;

/// Linear level scaling: level 1 = 100% of base, +50% of base per level.
fn effective(base: f64, level: u32) -> f64 {
    base * (1.0 + 0.5 * (level.max(1) as f64 - 1.0))
}

/// Sum bonuses over the equipped set. At most `MAX_EQUIPPED` instances
/// contribute; anything past the cap is ignored.
pub fn aggregate_bonuses(equipped: &[ArtifactInstance]) -> ChannelBonuses {
    let mut total = ChannelBonuses::default();
    for inst in equipped.iter().take(MAX_EQUIPPED) {
        let Some(def) = artifact_def(&inst.id) else {
            continue;
        };
        match def.bonus {
            BonusShape::All(base) => {
                let b = effective(base, inst.level);
                total.click += b;
                total.auto += b;
                total.farm += b;
            }
            BonusShape::PerChannel { click, auto, farm } => {
                total.click += effective(click, inst.level);
                total.auto += effective(auto, inst.level);
                total.farm += effective(farm, inst.level);
            }
        }
    }
    total
}

/// Tier the player has opened: one tier per 10 levels, never below 1.
pub fn opened_tier(player_level: u32) -> u32 {
    (player_level / 10).max(1)
}

/// Record a drop: duplicate drops level the existing instance instead of
/// adding a second copy.
pub fn add_drop(inventory: &mut Vec<ArtifactInstance>, id: &str) {
    if let Some(existing) = inventory.iter_mut().find(|i| i.id == id) {
        existing.level += 1;
    } else {
        inventory.push(ArtifactInstance { id: id.to_string(), level: 1 });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FuseError {
    #[error("need 3 {0:?} instances, have {1}")]
    NotEnoughInstances(Rarity, usize),
    #[error("cannot fuse at maximum rarity")]
    MaxRarity,
    #[error("no {0:?} artifact unlocked at tier {1}")]
    NoUnlockedTarget(Rarity, u32),
}

/// Fuse 3 instances of `rarity` (any identities) into 1 instance of the
/// next rarity, chosen uniformly from unlockable candidates. All guards run
/// before any mutation: on error the inventory is untouched.
pub fn fuse<R: Rng>(
    inventory: &mut Vec<ArtifactInstance>,
    rarity: Rarity,
    player_level: u32,
    rng: &mut R,
) -> Result<ArtifactInstance, FuseError> {
    let target = rarity.next().ok_or(FuseError::MaxRarity)?;

    let matching: Vec<usize> = inventory
        .iter()
        .enumerate()
        .filter(|(_, inst)| artifact_def(&inst.id).map(|d| d.rarity) == Some(rarity))
        .map(|(i, _)| i)
        .collect();
    if matching.len() < 3 {
        return Err(FuseError::NotEnoughInstances(rarity, matching.len()));
    }

    let tier = opened_tier(player_level);
    let candidates: Vec<&'static str> = ARTIFACTS
        .iter()
        .filter(|a| a.rarity == target && a.unlock_tier <= tier)
        .map(|a| a.id)
        .collect();
    if candidates.is_empty() {
        return Err(FuseError::NoUnlockedTarget(target, tier));
    }

    let picked = candidates[rng.gen_range(0..candidates.len())];

    // Consume exactly 3 (highest index first so removals don't shift).
    for idx in matching.iter().take(3).rev() {
        inventory.remove(*idx);
    }
    let result = ArtifactInstance { id: picked.to_string(), level: 1 };
    inventory.push(result.clone());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn inst(id: &str, level: u32) -> ArtifactInstance {
        ArtifactInstance { id: id.into(), level }
    }

    #[test]
    fn rarity_ordering_and_next() {
        assert!(Rarity::Common < Rarity::Legendary);
        assert_eq!(Rarity::Epic.next(), Some(Rarity::Legendary));
        assert_eq!(Rarity::Legendary.next(), None);
    }

    #[test]
    fn all_bonus_feeds_every_channel() {
        // copper_coin: All(0.05) at level 1
        let bonuses = aggregate_bonuses(&[inst("copper_coin", 1)]);
        assert!((bonuses.click - 0.05).abs() < 1e-9);
        assert!((bonuses.auto - 0.05).abs() < 1e-9);
        assert!((bonuses.farm - 0.05).abs() < 1e-9);
    }

    #[test]
    fn level_scales_linearly() {
        // level 3 => base * (1 + 0.5*2) = 2x base
        let lvl1 = aggregate_bonuses(&[inst("lucky_clover", 1)]);
        let lvl3 = aggregate_bonuses(&[inst("lucky_clover", 3)]);
        assert!((lvl3.click - lvl1.click * 2.0).abs() < 1e-9);
    }

    #[test]
    fn aggregation_caps_at_three() {
        let four = vec![
            inst("copper_coin", 1),
            inst("copper_coin", 1),
            inst("copper_coin", 1),
            inst("copper_coin", 1),
        ];
        let three = aggregate_bonuses(&four[..3].to_vec());
        assert_eq!(aggregate_bonuses(&four), three);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let bonuses = aggregate_bonuses(&[inst("deleted_artifact", 5)]);
        assert_eq!(bonuses, ChannelBonuses::default());
    }

    #[test]
    fn duplicate_drop_levels_up() {
        let mut inv = Vec::new();
        add_drop(&mut inv, "moon_prism");
        add_drop(&mut inv, "moon_prism");
        assert_eq!(inv, vec![inst("moon_prism", 2)]);
    }

    #[test]
    fn fusion_conserves_inventory_counts() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let mut inv = vec![
            inst("copper_coin", 2),
            inst("lucky_clover", 1),
            inst("rusty_gear", 1),
            inst("silver_chalice", 1),
        ];
        let result = fuse(&mut inv, Rarity::Common, 10, &mut rng).unwrap();
        // 3 commons out, 1 rare in: net -2
        assert_eq!(inv.len(), 2);
        assert_eq!(artifact_def(&result.id).unwrap().rarity, Rarity::Rare);
        // the untouched rare is still there
        assert!(inv.iter().any(|i| i.id == "silver_chalice"));
    }

    #[test]
    fn fusion_fails_without_mutation_when_short() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let mut inv = vec![inst("copper_coin", 1), inst("rusty_gear", 1)];
        let before = inv.clone();
        let err = fuse(&mut inv, Rarity::Common, 10, &mut rng).unwrap_err();
        assert_eq!(err, FuseError::NotEnoughInstances(Rarity::Common, 2));
        assert_eq!(inv, before);
    }

    #[test]
    fn fusion_at_max_rarity_is_rejected() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let mut inv = vec![
            inst("dragon_heart", 1),
            inst("infinity_cog", 1),
            inst("dragon_heart", 1),
        ];
        let before = inv.clone();
        assert_eq!(
            fuse(&mut inv, Rarity::Legendary, 99, &mut rng),
            Err(FuseError::MaxRarity)
        );
        assert_eq!(inv, before);
    }

    #[test]
    fn fusion_respects_unlock_tier() {
        // Only "infinity_cog" (tier 4) is Legendary besides "dragon_heart"
        // (tier 2); at player level 10 (tier 1) no Legendary is unlockable.
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let mut inv = vec![
            inst("golden_scarab", 1),
            inst("storm_core", 1),
            inst("world_seed", 1),
        ];
        let before = inv.clone();
        let err = fuse(&mut inv, Rarity::Epic, 10, &mut rng).unwrap_err();
        assert_eq!(err, FuseError::NoUnlockedTarget(Rarity::Legendary, 1));
        assert_eq!(inv, before);

        // At level 20 (tier 2) dragon_heart unlocks and fusion succeeds.
        let result = fuse(&mut inv, Rarity::Epic, 20, &mut rng).unwrap();
        assert_eq!(result.id, "dragon_heart");
    }

    #[test]
    fn opened_tier_floors_at_one() {
        assert_eq!(opened_tier(0), 1);
        assert_eq!(opened_tier(9), 1);
        assert_eq!(opened_tier(10), 1);
        assert_eq!(opened_tier(20), 2);
        assert_eq!(opened_tier(45), 4);
    }
}

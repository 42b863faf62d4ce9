//! Pricing and curve engine.
//!
//! Pure, total functions over discrete levels. Out-of-range inputs are
//! clamped to the valid domain instead of panicking, so callers never need
//! to pre-validate indices.

use crate::catalog::{
    CRAFT_MAX_LEVEL, CRAFT_SLOT_BASE_PRICE, CRAFT_SLOT_GROWTH, SHOP_BASE_PRICE, SHOP_GROWTH,
    SHOP_ITEM_COUNT, SHOP_ROI_DAYS, UPGRADE_BASE_COST, UPGRADE_GROWTH,
};

pub const REFERRAL_BASE_REWARD: u64 = 5_000;
pub const REFERRAL_REWARD_CAP: u64 = 5_120_000;

pub const DAILY_BONUS_BASE: f64 = 500.0;
pub const DAILY_BONUS_STEP: f64 = 2_264.0;
pub const DAILY_BONUS_CYCLE: u32 = 30;

/// Generic geometric upgrade cost: `floor(base * growth^(level-1))`.
pub fn geometric_cost(base: f64, growth: f64, level: u32) -> u64 {
    let level = level.max(1);
    (base * growth.powi(level as i32 - 1)).floor() as u64
}

/// Cost of the next rank of a tap/auto upgrade.
pub fn upgrade_cost(level: u32) -> u64 {
    geometric_cost(UPGRADE_BASE_COST, UPGRADE_GROWTH, level)
}

/// Purchase price of a craft item of the given level.
pub fn craft_item_price(level: u32) -> u64 {
    let level = level.clamp(1, CRAFT_MAX_LEVEL);
    geometric_cost(CRAFT_SLOT_BASE_PRICE, CRAFT_SLOT_GROWTH, level)
}

/// Passive income per hour of a placed craft item, rounded to 2 decimals.
pub fn craft_income_per_hour(level: u32) -> f64 {
    let price = craft_item_price(level) as f64;
    round2(price / (SHOP_ROI_DAYS * 24.0))
}

/// Shop catalog price for item `k` (1-based), `round(base * growth^(k-1))`.
pub fn shop_price(index: u32) -> u64 {
    let index = index.clamp(1, SHOP_ITEM_COUNT);
    (SHOP_BASE_PRICE * SHOP_GROWTH.powi(index as i32 - 1)).round() as u64
}

/// Income per hour of shop item `k` at the fixed ROI period.
pub fn income_per_hour(index: u32) -> f64 {
    round2(shop_price(index) as f64 / (SHOP_ROI_DAYS * 24.0))
}

/// Reward for a referrer's `n`-th successful referral: doubles each time
/// from 5 000 and caps at 5 120 000 (reached at n = 11).
pub fn referral_reward(n: u32) -> u64 {
    let n = n.max(1);
    if n >= 11 {
        return REFERRAL_REWARD_CAP;
    }
    (REFERRAL_BASE_REWARD << (n - 1)).min(REFERRAL_REWARD_CAP)
}

/// Daily login bonus for `day` in [1, 30]; day 30 carries a small topper.
/// The cycle restarts after day 30 or a missed day, so the input is clamped.
pub fn daily_bonus(day: u32) -> u64 {
    let day = day.clamp(1, DAILY_BONUS_CYCLE);
    let topper = if day == DAILY_BONUS_CYCLE { 160.0 } else { 0.0 };
    (DAILY_BONUS_BASE + DAILY_BONUS_STEP * (day as f64 - 1.0) + topper).floor() as u64
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_schedule_matches_expected_values() {
        assert_eq!(referral_reward(1), 5_000);
        assert_eq!(referral_reward(2), 10_000);
        assert_eq!(referral_reward(3), 20_000);
        assert_eq!(referral_reward(10), 2_560_000);
        assert_eq!(referral_reward(11), 5_120_000);
        assert_eq!(referral_reward(12), 5_120_000);
        assert_eq!(referral_reward(100), 5_120_000);
    }

    #[test]
    fn referral_reward_clamps_zero_to_first() {
        assert_eq!(referral_reward(0), 5_000);
    }

    #[test]
    fn daily_bonus_endpoints() {
        assert_eq!(daily_bonus(1), 500);
        assert_eq!(daily_bonus(2), 2_764);
        // day 30: 500 + 2264*29 + 160
        assert_eq!(daily_bonus(30), 500 + 2_264 * 29 + 160);
        // out-of-range days clamp to the cycle bounds
        assert_eq!(daily_bonus(0), daily_bonus(1));
        assert_eq!(daily_bonus(31), daily_bonus(30));
    }

    #[test]
    fn upgrade_cost_grows() {
        assert_eq!(upgrade_cost(1), 50);
        let mut prev = 0;
        for level in 1..40 {
            let c = upgrade_cost(level);
            assert!(c >= prev);
            prev = c;
        }
    }

    #[test]
    fn shop_price_first_and_clamped() {
        assert_eq!(shop_price(1), 100);
        assert_eq!(shop_price(0), shop_price(1));
        assert_eq!(shop_price(999), shop_price(SHOP_ITEM_COUNT));
    }

    #[test]
    fn income_tracks_price_at_fixed_roi() {
        for k in 1..=SHOP_ITEM_COUNT {
            let hours = SHOP_ROI_DAYS * 24.0;
            let expected = (shop_price(k) as f64 / hours * 100.0).round() / 100.0;
            assert!((income_per_hour(k) - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn craft_income_has_two_decimals() {
        let income = craft_income_per_hour(7);
        assert!((income * 100.0 - (income * 100.0).round()).abs() < 1e-9);
    }
}

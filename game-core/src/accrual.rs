//! Offline/idle accrual.
//!
//! Computed once per session resume from the last-seen checkpoint. The
//! elapsed window is hard-capped so an abandoned session can never farm
//! unbounded currency.

use crate::catalog::epoch_multiplier;

pub const OFFLINE_CAP_SECS: u64 = 12 * 60 * 60;

/// Lump-sum grant for time spent away. Uses the epoch multiplier at the
/// checkpoint level, not the current one, so the rate matches what was
/// actually running when the player left.
pub fn offline_grant(
    last_seen_unix: u64,
    now_unix: u64,
    auto_per_sec: f64,
    checkpoint_level: u32,
    farm_multiplier: f64,
) -> f64 {
    let elapsed = now_unix.saturating_sub(last_seen_unix).min(OFFLINE_CAP_SECS);
    auto_per_sec * epoch_multiplier(checkpoint_level) * farm_multiplier * elapsed as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_is_rate_times_elapsed() {
        let grant = offline_grant(1_000, 1_600, 2.0, 5, 1.0);
        assert_eq!(grant, 2.0 * 600.0);
    }

    #[test]
    fn elapsed_is_capped_at_twelve_hours() {
        let fifty_hours = 50 * 3600;
        let capped = offline_grant(0, fifty_hours, 1.0, 1, 1.0);
        let exact = offline_grant(0, OFFLINE_CAP_SECS, 1.0, 1, 1.0);
        assert_eq!(capped, exact);
        assert_eq!(capped, OFFLINE_CAP_SECS as f64);
    }

    #[test]
    fn clock_going_backwards_grants_nothing() {
        assert_eq!(offline_grant(2_000, 1_000, 5.0, 1, 1.0), 0.0);
    }

    #[test]
    fn epoch_and_farm_multipliers_apply() {
        // level 10 epoch = 1.5
        let grant = offline_grant(0, 100, 1.0, 10, 2.0);
        assert_eq!(grant, 1.0 * 1.5 * 2.0 * 100.0);
    }
}

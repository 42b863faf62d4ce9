//! Loot selection.
//!
//! Two flavors:
//! - deterministic: a stable 32-bit hash of a seed string indexes the
//!   candidate list, so re-evaluating the same event (e.g. a retried payment
//!   verification) always reproduces the same grant;
//! - weighted one-shot: a uniform draw against rarity weights, used where
//!   the outcome is decided exactly once and never re-derived.

use rand::Rng;

/// FNV-1a, 32-bit. Order-sensitive with full avalanche mixing; stable
/// across platforms and releases because grants are derived from it.
pub fn fnv1a32(s: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in s.as_bytes() {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Seed for a confirmed purchase grant. The user id is deliberately absent:
/// the payment memo already binds the transaction to the user, and the seed
/// must stay byte-identical so retried verifications regrant the same item.
pub fn grant_seed(intent_id: &str, tx_hash: &str, tier_key: &str) -> String {
    format!("{intent_id}:{tx_hash}:{tier_key}")
}

/// Deterministic pick: same seed + same candidate order => same element.
pub fn pick_deterministic<'a, T>(candidates: &'a [T], seed: &str) -> Option<&'a T> {
    if candidates.is_empty() {
        return None;
    }
    let idx = fnv1a32(seed) as usize % candidates.len();
    Some(&candidates[idx])
}

/// Weighted one-shot pick: draw uniform in [0, total_weight), walk the list
/// subtracting weights until the remainder goes non-positive.
pub fn pick_weighted<'a, T, R: Rng>(
    candidates: &'a [(T, f64)],
    rng: &mut R,
) -> Option<&'a T> {
    let total: f64 = candidates.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return None;
    }
    let mut roll = rng.gen_range(0.0..total);
    for (item, weight) in candidates {
        roll -= weight.max(0.0);
        if roll <= 0.0 {
            return Some(item);
        }
    }
    // Float accumulation can leave a sliver; the last candidate absorbs it.
    candidates.last().map(|(item, _)| item)
}

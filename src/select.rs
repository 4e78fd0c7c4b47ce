//! Weighted-random ad selection.
//!
//! Draw `r` uniformly from `[0, total_weight)`, walk the pool subtracting
//! each ad's weight, and return the ad where the draw crosses zero. Callers
//! that need determinism inject a seeded RNG; production paths use the
//! thread RNG.

use rand::Rng;

use crate::weights::{AdPools, WeightedAd};

/// Returned when a category has no pool (or an empty one).
pub const FALLBACK_AD: &str = "Discover amazing products!";

/// Pick an ad from a category's pool with the thread RNG.
pub fn select_ad(pools: &AdPools, category: &str) -> String {
    select_ad_with(pools, category, &mut rand::rng())
}

/// Pick an ad from a category's pool with a caller-supplied RNG.
pub fn select_ad_with<R: Rng + ?Sized>(pools: &AdPools, category: &str, rng: &mut R) -> String {
    match pools.get(category) {
        Some(pool) if !pool.is_empty() => select_from(pool, rng),
        _ => FALLBACK_AD.to_string(),
    }
}

/// Weighted-random walk over a non-empty pool.
pub fn select_from<R: Rng + ?Sized>(pool: &[WeightedAd], rng: &mut R) -> String {
    let total: u64 = pool.iter().map(|a| u64::from(a.weight)).sum();
    let mut r = rng.random_range(0.0..total.max(1) as f64);

    for ad in pool {
        r -= f64::from(ad.weight);
        if r <= 0.0 {
            return ad.text.clone();
        }
    }

    // Guards the float walk exhausting without crossing zero.
    pool[0].text.clone()
}

//! History-driven ad weighting.
//!
//! Each category owns an ordered pool of `{text, weight}` ads. Weights are
//! an ephemeral, derived view: reset to baseline 1 and recomputed on every
//! history change, never persisted. A category's ads get boosted only when
//! the category appears in the last 24 h of history, but the boost magnitude
//! is its *all-time* topic count — recency gates, frequency scales. The
//! topic table mutates only when history does (one bump per appended entry),
//! which keeps recomputation a pure function of `(history, table)`.

use std::collections::BTreeMap;

use crate::history::{HistoryLog, DAY_MS};

/// One ad in a category pool. Weight is a positive integer, minimum 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedAd {
    pub text: String,
    pub weight: u32,
}

impl WeightedAd {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            weight: 1,
        }
    }
}

/// Cumulative per-category occurrence counts, process lifetime.
/// Monotonically non-decreasing except on explicit reset.
#[derive(Debug, Clone, Default)]
pub struct TopicFrequencyTable {
    counts: BTreeMap<String, u64>,
}

impl TopicFrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bump a category's count. Called once per appended history entry.
    pub fn note(&mut self, category: &str) {
        *self.counts.entry(category.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, category: &str) -> u64 {
        self.counts.get(category).copied().unwrap_or(0)
    }

    /// Rebuild counts from a persisted history log (process restart).
    pub fn seed_from(&mut self, history: &HistoryLog) {
        self.counts.clear();
        for e in history.entries() {
            *self.counts.entry(e.category.clone()).or_insert(0) += 1;
        }
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }

    pub fn counts(&self) -> &BTreeMap<String, u64> {
        &self.counts
    }
}

/// Built-in ad copy per category. Every classifier category has a pool, plus
/// `"general"` for unclassified pages.
const BUILTIN_ADS: &[(&str, &[&str])] = &[
    (
        "Business",
        &[
            "Grow your portfolio with zero-fee trading.",
            "The CRM your sales team will actually use.",
        ],
    ),
    (
        "Tech",
        &[
            "Next-gen laptops, engineered for creators.",
            "Ship faster with managed cloud infrastructure.",
        ],
    ),
    (
        "Entertainment",
        &[
            "Stream award-winning originals tonight.",
            "Two movie tickets for the price of one.",
        ],
    ),
    (
        "Sports",
        &[
            "Pro-grade running shoes, 30% off this week.",
            "Catch every match live, anywhere.",
        ],
    ),
    (
        "Politics",
        &[
            "Independent journalism, ad-free for members.",
            "Daily policy briefings in your inbox.",
        ],
    ),
    (
        "World",
        &[
            "Learn a new language in 15 minutes a day.",
            "See the world with flexible flight passes.",
        ],
    ),
    (
        "Health",
        &[
            "Personalized vitamin plans, delivered monthly.",
            "Guided meditation for better sleep.",
        ],
    ),
    (
        "Top News",
        &[
            "Breaking stories first — try the app.",
            "Your morning brief in five minutes.",
        ],
    ),
    (
        "European Affairs",
        &[
            "Rail passes across 33 countries.",
            "Expert-led courses on EU policy.",
        ],
    ),
    (
        "Foreign Affairs",
        &[
            "Authentic Italian cooking classes online.",
            "City breaks in Rome from €89.",
        ],
    ),
    (
        "Software and Development",
        &[
            "Deploy in seconds on the edge.",
            "The IDE that completes whole functions.",
        ],
    ),
    (
        "Animals",
        &[
            "Premium pet food, vet approved.",
            "Adopt, don't shop — find shelters near you.",
        ],
    ),
    (
        "Music",
        &[
            "Hi-fi streaming, three months free.",
            "Learn guitar with interactive lessons.",
        ],
    ),
    (
        "Toons",
        &[
            "Unlimited anime, subbed and dubbed.",
            "Collector figures for true fans.",
        ],
    ),
    (
        "Fashion",
        &[
            "New season arrivals — members save 20%.",
            "Sustainable basics that last.",
        ],
    ),
    (
        "Automotive",
        &[
            "Test-drive the new EV lineup today.",
            "All-season tires, fitted same day.",
        ],
    ),
    (
        "Gaming",
        &[
            "Build your dream gaming rig.",
            "Hundreds of games, one subscription.",
        ],
    ),
    (
        "Food",
        &[
            "Chef-crafted meal kits from $5.",
            "Book the best tables in town.",
        ],
    ),
    (
        "Travel",
        &[
            "Weekend getaways up to 40% off.",
            "Earn miles on every booking.",
        ],
    ),
    (
        "Cryptocurrency",
        &[
            "Trade crypto with industry-low fees.",
            "Secure hardware wallets, free shipping.",
        ],
    ),
    (
        "general",
        &[
            "Discover amazing products!",
            "Deals picked for you, updated daily.",
        ],
    ),
];

/// All category ad pools with their current weights.
#[derive(Debug, Clone, Default)]
pub struct AdPools {
    pools: BTreeMap<String, Vec<WeightedAd>>,
}

impl AdPools {
    /// Pools seeded with the built-in ad copy, all weights at baseline.
    pub fn builtin() -> Self {
        let mut pools = BTreeMap::new();
        for (category, ads) in BUILTIN_ADS {
            pools.insert(
                category.to_string(),
                ads.iter().map(|t| WeightedAd::new(t)).collect(),
            );
        }
        Self { pools }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Replace (or create) a category's pool, weights reset to baseline.
    pub fn set_pool(&mut self, category: impl Into<String>, texts: &[&str]) {
        self.pools.insert(
            category.into(),
            texts.iter().map(|t| WeightedAd::new(t)).collect(),
        );
    }

    pub fn get(&self, category: &str) -> Option<&[WeightedAd]> {
        self.pools.get(category).map(|p| p.as_slice())
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.pools.keys().map(|k| k.as_str())
    }

    /// Recompute every weight from history + topic table.
    ///
    /// 1. reset all weights to 1;
    /// 2. count per-category frequency over the last 24 h of history;
    /// 3. every pool whose category appears in that count gets the
    ///    category's all-time topic count added to each ad, clamped to >= 1.
    pub fn update_weights(
        &mut self,
        history: &HistoryLog,
        topics: &TopicFrequencyTable,
        now_ms: u64,
    ) {
        for pool in self.pools.values_mut() {
            for ad in pool.iter_mut() {
                ad.weight = 1;
            }
        }

        let mut category_freq: BTreeMap<&str, u32> = BTreeMap::new();
        for e in history.recent(DAY_MS, now_ms) {
            *category_freq.entry(e.category.as_str()).or_insert(0) += 1;
        }

        for category in category_freq.keys() {
            let boost = topics.count(category).min(u32::MAX as u64) as u32;
            if let Some(pool) = self.pools.get_mut(*category) {
                for ad in pool.iter_mut() {
                    ad.weight = ad.weight.saturating_add(boost).max(1);
                }
            }
        }
    }
}

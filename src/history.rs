//! Ad interaction history.
//!
//! An ordered, append-only log of `(category, ad, timestamp)` entries.
//! Insertion order is meaningful: most-recent-last, so "last N" panels and
//! the 24 h recency window can slice it directly. Pruning runs lazily on
//! each insertion against a configurable retention window — never on a
//! timer — and is a full-list filter evaluated against "now" at call time.
//!
//! Serialized entries keep the extension-era field names (`adContent`,
//! `timestamp`) so an existing state file round-trips.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// One day in milliseconds, the weight engine's recency window.
pub const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// Displayed ad content: tagline plus optional image and generation prompt.
///
/// `image` is an embeddable `data:image/png;base64,…` string when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdContent {
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl AdContent {
    /// A text-only ad (placeholder messages, locally selected ads).
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
            prompt: None,
        }
    }
}

/// A single history record. Timestamp is assigned at insertion and
/// immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub category: String,
    #[serde(rename = "adContent")]
    pub ad: AdContent,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
}

/// How long history entries survive before pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    Week,
    #[default]
    Month,
    Year,
}

impl RetentionPolicy {
    /// The retention window in milliseconds.
    pub fn window_ms(self) -> u64 {
        match self {
            RetentionPolicy::Week => 7 * DAY_MS,
            RetentionPolicy::Month => 30 * DAY_MS,
            RetentionPolicy::Year => 365 * DAY_MS,
        }
    }

    /// Parse the stored/CLI form: `week`, `month`, `year`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "week" => Some(RetentionPolicy::Week),
            "month" => Some(RetentionPolicy::Month),
            "year" => Some(RetentionPolicy::Year),
            _ => None,
        }
    }
}

/// The ordered history log.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from persisted entries (order preserved as stored).
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    /// Append an entry stamped `now_ms`, then prune against `retention`.
    /// The new entry has age 0 and always survives the prune.
    pub fn append(
        &mut self,
        category: impl Into<String>,
        ad: AdContent,
        retention: RetentionPolicy,
        now_ms: u64,
    ) -> HistoryEntry {
        let entry = HistoryEntry {
            category: category.into(),
            ad,
            timestamp_ms: now_ms,
        };
        self.entries.push(entry.clone());
        self.prune(retention, now_ms);
        entry
    }

    /// Drop every entry whose age exceeds the retention window.
    /// Boundary is inclusive: an entry exactly `window` old survives.
    pub fn prune(&mut self, retention: RetentionPolicy, now_ms: u64) {
        let window = retention.window_ms();
        let before = self.entries.len();
        self.entries
            .retain(|e| now_ms.saturating_sub(e.timestamp_ms) <= window);
        let removed = before - self.entries.len();
        if removed > 0 {
            log::debug!("Pruned {} history entries past {:?}", removed, retention);
        }
    }

    /// Entries with `now_ms - timestamp <= window_ms`, original order.
    /// Inclusive at the boundary: `recent(0, now)` returns entries stamped
    /// exactly `now`.
    pub fn recent(&self, window_ms: u64, now_ms: u64) -> Vec<&HistoryEntry> {
        self.entries
            .iter()
            .filter(|e| now_ms.saturating_sub(e.timestamp_ms) <= window_ms)
            .collect()
    }

    /// The most recent `n` entries, newest first.
    pub fn last(&self, n: usize) -> Vec<&HistoryEntry> {
        self.entries.iter().rev().take(n).collect()
    }

    /// Category → entry count over the whole log.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.entries {
            *counts.entry(e.category.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Empty the log unconditionally.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

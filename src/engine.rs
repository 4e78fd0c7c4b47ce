//! The ad engine controller.
//!
//! Owns the pieces the rest of the crate defines — state store, ad source,
//! history log, ad pools, topic table, notifier — and runs the event flow:
//! a page's category comes in, an ad goes out, history and weights update,
//! listeners get poked to re-read the store.
//!
//! One engine is one logical thread of control. Methods take `&mut self`
//! and run to completion; there is no locking, no in-flight coalescing,
//! and no automatic retry. Two engines over one store race and the last
//! write wins.

use std::collections::BTreeMap;
use std::sync::mpsc;

use crate::history::{now_ms, AdContent, HistoryEntry, HistoryLog, RetentionPolicy};
use crate::net::source::{placeholder_text, AdSource};
use crate::notify::{Notifier, StateChanged};
use crate::page;
use crate::select;
use crate::store::{self, keys, StateStore};
use crate::weights::{AdPools, TopicFrequencyTable};

pub struct AdEngine {
    store: Box<dyn StateStore>,
    source: AdSource,
    history: HistoryLog,
    pools: AdPools,
    topics: TopicFrequencyTable,
    notifier: Notifier,
}

impl AdEngine {
    /// Build an engine over a store and ad source. Persisted history and
    /// retention are loaded immediately: the log is pruned, the topic table
    /// re-seeded from the surviving entries, and pool weights rebuilt —
    /// weights themselves are never persisted.
    pub fn new(store: Box<dyn StateStore>, source: AdSource) -> Self {
        let mut engine = Self {
            store,
            source,
            history: HistoryLog::new(),
            pools: AdPools::builtin(),
            topics: TopicFrequencyTable::new(),
            notifier: Notifier::new(),
        };
        engine.load_state();
        engine
    }

    /// Override the retention policy (persisted, prunes immediately).
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.set_retention(retention);
        self
    }

    /// Replace the built-in ad pools.
    pub fn with_pools(mut self, pools: AdPools) -> Self {
        self.pools = pools;
        self.pools
            .update_weights(&self.history, &self.topics, now_ms());
        self
    }

    fn load_state(&mut self) {
        let entries: Vec<HistoryEntry> =
            store::get_json(self.store.as_ref(), keys::HISTORY).unwrap_or_default();
        self.history = HistoryLog::from_entries(entries);

        let now = now_ms();
        self.history.prune(self.retention(), now);
        self.topics.seed_from(&self.history);
        self.pools.update_weights(&self.history, &self.topics, now);

        log::info!(
            "Loaded {} history entries, {} topics",
            self.history.len(),
            self.topics.counts().len()
        );
    }

    /// Register a presentation surface for state-change notifications.
    pub fn subscribe(&mut self) -> mpsc::Receiver<StateChanged> {
        self.notifier.subscribe()
    }

    /// Fetch an ad for a category and record the outcome.
    ///
    /// Opted-out topics never reach the network. Failures become a
    /// placeholder `currentAd` plus a `lastError` detail and are not
    /// retried; only successes enter the history.
    pub fn fetch_ad(&mut self, category: &str) {
        if self.is_opted_out(category) {
            log::info!("Topic {} is opted out, skipping fetch", category);
            return;
        }

        store::set_json(self.store.as_ref(), keys::IS_LOADING, &true);
        self.store.remove(keys::CURRENT_AD);
        self.store.remove(keys::LAST_ERROR);
        self.notifier.notify();

        match self.source.fetch(category) {
            Ok(ad) => {
                store::set_json(self.store.as_ref(), keys::CURRENT_AD, &ad);
                self.store.remove(keys::LAST_ERROR);
                store::set_json(self.store.as_ref(), keys::IS_LOADING, &false);
                self.record(category, ad);
            }
            Err(e) => {
                log::warn!("Ad fetch for {} failed: {}", category, e);
                let placeholder = AdContent::text_only(placeholder_text(&e));
                store::set_json(self.store.as_ref(), keys::CURRENT_AD, &placeholder);
                store::set_json(self.store.as_ref(), keys::LAST_ERROR, &e.to_string());
                store::set_json(self.store.as_ref(), keys::IS_LOADING, &false);
            }
        }
        self.notifier.notify();
    }

    /// Classify a page's text and fetch an ad for the inferred category.
    /// Returns the category for the caller's benefit.
    pub fn fetch_ad_for_page(&mut self, html: &str) -> &'static str {
        let category = page::classify_page(html);
        log::debug!("Inferred interest: {}", category);
        self.fetch_ad(category);
        category
    }

    /// Pick an ad from the local weighted pools — no network, no history.
    pub fn local_ad(&self, category: &str) -> String {
        select::select_ad(&self.pools, category)
    }

    fn record(&mut self, category: &str, ad: AdContent) {
        let now = now_ms();
        self.history.append(category, ad, self.retention(), now);
        self.topics.note(category);
        self.pools.update_weights(&self.history, &self.topics, now);
        self.persist_history();
    }

    fn persist_history(&self) {
        store::set_json(self.store.as_ref(), keys::HISTORY, &self.history.entries());
    }

    // ── State read-outs (the store is the source of truth) ──

    pub fn current_ad(&self) -> Option<AdContent> {
        store::get_json(self.store.as_ref(), keys::CURRENT_AD)
    }

    pub fn last_error(&self) -> Option<String> {
        store::get_json(self.store.as_ref(), keys::LAST_ERROR)
    }

    pub fn is_loading(&self) -> bool {
        store::get_json(self.store.as_ref(), keys::IS_LOADING).unwrap_or(false)
    }

    pub fn retention(&self) -> RetentionPolicy {
        store::get_json(self.store.as_ref(), keys::HISTORY_RETENTION).unwrap_or_default()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// The `n` most recent entries, newest first.
    pub fn recent_history(&self, n: usize) -> Vec<HistoryEntry> {
        self.history.last(n).into_iter().cloned().collect()
    }

    /// `(category, count, percent)` over the whole log.
    pub fn category_distribution(&self) -> Vec<(String, usize, f64)> {
        let total = self.history.len();
        self.history
            .category_counts()
            .into_iter()
            .map(|(category, count)| {
                let pct = if total == 0 {
                    0.0
                } else {
                    count as f64 * 100.0 / total as f64
                };
                (category, count, pct)
            })
            .collect()
    }

    pub fn pools(&self) -> &AdPools {
        &self.pools
    }

    pub fn topic_counts(&self) -> &BTreeMap<String, u64> {
        self.topics.counts()
    }

    // ── Mutations driven by the presentation surface ──

    /// Persist a new retention policy and re-prune immediately.
    pub fn set_retention(&mut self, retention: RetentionPolicy) {
        store::set_json(self.store.as_ref(), keys::HISTORY_RETENTION, &retention);
        let now = now_ms();
        self.history.prune(retention, now);
        self.pools.update_weights(&self.history, &self.topics, now);
        self.persist_history();
        self.notifier.notify();
    }

    /// Empty the history log. The topic table survives (it resets only on
    /// a full [`reset`](Self::reset)).
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.pools
            .update_weights(&self.history, &self.topics, now_ms());
        self.persist_history();
        self.notifier.notify();
    }

    /// Wipe everything: store, history, topic table, weights.
    pub fn reset(&mut self) {
        self.store.clear();
        self.history.clear();
        self.topics.reset();
        self.pools
            .update_weights(&self.history, &self.topics, now_ms());
        self.notifier.notify();
    }

    /// Stop fetching ads for a topic. Idempotent.
    pub fn opt_out(&mut self, topic: &str) {
        let mut topics: Vec<String> =
            store::get_json(self.store.as_ref(), keys::OPTED_OUT_TOPICS).unwrap_or_default();
        if !topics.iter().any(|t| t == topic) {
            topics.push(topic.to_string());
            store::set_json(self.store.as_ref(), keys::OPTED_OUT_TOPICS, &topics);
            self.notifier.notify();
        }
    }

    pub fn is_opted_out(&self, topic: &str) -> bool {
        store::get_json::<Vec<String>>(self.store.as_ref(), keys::OPTED_OUT_TOPICS)
            .map(|topics| topics.iter().any(|t| t == topic))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::DAY_MS;
    use crate::net::source::AdSource;
    use crate::store::MemoryStore;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Minimal HTTP stub: answers every connection with `respond(head)`,
    /// where `head` is the raw request head (start line + headers).
    fn stub_server<F>(respond: F) -> String
    where
        F: Fn(&str) -> Vec<u8> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut head = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            head.extend_from_slice(&buf[..n]);
                            if head.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                    }
                }
                let head = String::from_utf8_lossy(&head).to_string();
                let _ = stream.write_all(&respond(&head));
            }
        });

        format!("http://{}", addr)
    }

    fn http_response(status_line: &str, headers: &str, body: &[u8]) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 {}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n",
            status_line,
            headers,
            body.len()
        )
        .into_bytes();
        out.extend_from_slice(body);
        out
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 30, 30, 255]));
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .expect("encode test png");
        buf.into_inner()
    }

    /// Stub that serves a complete ad: JSON for `Accept: application/json`,
    /// a real PNG otherwise.
    fn ad_server() -> String {
        stub_server(|head| {
            if head.contains("application/json") {
                http_response(
                    "200 OK",
                    "Content-Type: application/json\r\n",
                    br#"{"ad":"Buy now","prompt":"tech gadget"}"#,
                )
            } else {
                http_response("200 OK", "Content-Type: image/png\r\n", &png_bytes())
            }
        })
    }

    fn engine_with(server: &str) -> AdEngine {
        let source = AdSource::new(server).expect("source");
        AdEngine::new(Box::new(MemoryStore::new()), source)
    }

    #[test]
    fn successful_fetch_stores_ad_and_history() {
        let server = ad_server();
        let mut engine = engine_with(&server);
        let rx = engine.subscribe();

        engine.fetch_ad("tech");

        let ad = engine.current_ad().expect("current ad");
        assert_eq!(ad.text, "Buy now");
        assert_eq!(ad.prompt.as_deref(), Some("tech gadget"));
        let image = ad.image.expect("ad image");
        assert!(image.starts_with("data:image/png;base64,"));

        assert!(!engine.is_loading());
        assert_eq!(engine.last_error(), None);

        assert_eq!(engine.history().len(), 1);
        let entry = &engine.history().entries()[0];
        assert_eq!(entry.category, "tech");
        assert!(entry.ad.image.is_some());

        assert_eq!(engine.topic_counts().get("tech"), Some(&1));

        // loading notification + completion notification
        assert!(rx.try_iter().count() >= 2);
    }

    #[test]
    fn rate_limited_fetch_leaves_no_history() {
        let server = stub_server(|_| {
            http_response(
                "429 Too Many Requests",
                "Retry-After: 30\r\nContent-Type: text/plain\r\n",
                b"",
            )
        });
        let mut engine = engine_with(&server);

        engine.fetch_ad("sports");

        assert!(engine.history().is_empty());
        assert!(!engine.is_loading());

        let ad = engine.current_ad().expect("placeholder ad");
        assert!(ad.text.contains("30"), "placeholder was {:?}", ad.text);
        assert_eq!(ad.image, None);

        let err = engine.last_error().expect("lastError");
        assert!(err.contains("30"));
    }

    #[test]
    fn http_error_embeds_status_in_placeholder() {
        let server = stub_server(|_| {
            http_response("500 Internal Server Error", "Content-Type: text/plain\r\n", b"boom")
        });
        let mut engine = engine_with(&server);

        engine.fetch_ad("tech");

        let ad = engine.current_ad().expect("placeholder ad");
        assert!(ad.text.contains("500"));
        assert!(engine.history().is_empty());
    }

    #[test]
    fn content_type_mismatch_is_an_error() {
        let server = stub_server(|_| {
            http_response("200 OK", "Content-Type: text/html\r\n", b"<html></html>")
        });
        let mut engine = engine_with(&server);

        engine.fetch_ad("tech");

        let err = engine.last_error().expect("lastError");
        assert!(err.contains("application/json"));
        assert!(err.contains("text/html"));
        assert_eq!(
            engine.current_ad().map(|a| a.text),
            Some("Error loading ad. Please try again.".to_string())
        );
    }

    #[test]
    fn opted_out_topic_never_reaches_the_network() {
        // No server behind this address: reaching the network would error,
        // and an error would set lastError — absence proves the gate.
        let mut engine = engine_with("http://127.0.0.1:9");
        engine.opt_out("Gaming");
        engine.opt_out("Gaming"); // idempotent

        engine.fetch_ad("Gaming");

        assert!(engine.is_opted_out("Gaming"));
        assert!(!engine.is_opted_out("Tech"));
        assert_eq!(engine.current_ad(), None);
        assert_eq!(engine.last_error(), None);
        assert!(!engine.is_loading());
        assert!(engine.history().is_empty());
    }

    #[test]
    fn fetch_ad_for_page_classifies_first() {
        let mut engine = engine_with("http://127.0.0.1:9");
        // Opt the expected category out so no network is involved.
        engine.opt_out("Sports");

        let category = engine
            .fetch_ad_for_page("<html><body><p>Formula 1 qualifying</p></body></html>");
        assert_eq!(category, "Sports");
    }

    #[test]
    fn restart_rebuilds_weights_from_persisted_history() {
        let now = now_ms();
        let entries: Vec<HistoryEntry> = (0..3)
            .map(|i| HistoryEntry {
                category: "Music".to_string(),
                ad: AdContent::text_only("x"),
                timestamp_ms: now - (i * 1000),
            })
            .collect();

        let store = MemoryStore::new();
        store::set_json(&store, keys::HISTORY, &entries);

        let source = AdSource::new("http://127.0.0.1:9").expect("source");
        let engine = AdEngine::new(Box::new(store), source);

        // table re-seeded from history, weights rebuilt: 1 + 3
        assert_eq!(engine.topic_counts().get("Music"), Some(&3));
        assert!(engine
            .pools()
            .get("Music")
            .expect("Music pool")
            .iter()
            .all(|a| a.weight == 4));
    }

    #[test]
    fn startup_prunes_against_persisted_retention() {
        let now = now_ms();
        let entries = vec![
            HistoryEntry {
                category: "Tech".to_string(),
                ad: AdContent::text_only("old"),
                timestamp_ms: now - 10 * DAY_MS,
            },
            HistoryEntry {
                category: "Tech".to_string(),
                ad: AdContent::text_only("fresh"),
                timestamp_ms: now,
            },
        ];

        let store = MemoryStore::new();
        store::set_json(&store, keys::HISTORY, &entries);
        store::set_json(&store, keys::HISTORY_RETENTION, &RetentionPolicy::Week);

        let source = AdSource::new("http://127.0.0.1:9").expect("source");
        let engine = AdEngine::new(Box::new(store), source);

        assert_eq!(engine.retention(), RetentionPolicy::Week);
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.history().entries()[0].ad.text, "fresh");
    }

    #[test]
    fn set_retention_persists_and_reprunes() {
        let now = now_ms();
        let entries = vec![
            HistoryEntry {
                category: "Food".to_string(),
                ad: AdContent::text_only("old"),
                timestamp_ms: now - 8 * DAY_MS,
            },
            HistoryEntry {
                category: "Food".to_string(),
                ad: AdContent::text_only("fresh"),
                timestamp_ms: now,
            },
        ];
        let store = MemoryStore::new();
        store::set_json(&store, keys::HISTORY, &entries);

        let source = AdSource::new("http://127.0.0.1:9").expect("source");
        let mut engine = AdEngine::new(Box::new(store), source);
        assert_eq!(engine.history().len(), 2); // month retention keeps both

        engine.set_retention(RetentionPolicy::Week);
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.retention(), RetentionPolicy::Week);
    }

    #[test]
    fn clear_history_keeps_topic_table_reset_wipes_it() {
        let server = ad_server();
        let mut engine = engine_with(&server);
        engine.fetch_ad("tech");
        assert_eq!(engine.history().len(), 1);

        engine.clear_history();
        assert!(engine.history().is_empty());
        assert_eq!(engine.topic_counts().get("tech"), Some(&1));

        engine.reset();
        assert_eq!(engine.topic_counts().get("tech"), None);
        assert_eq!(engine.current_ad(), None);
    }

    #[test]
    fn local_ad_uses_pools_with_fallback() {
        let engine = engine_with("http://127.0.0.1:9");
        let ad = engine.local_ad("no-such-category");
        assert_eq!(ad, crate::select::FALLBACK_AD);

        let ad = engine.local_ad("Tech");
        assert!(engine
            .pools()
            .get("Tech")
            .expect("Tech pool")
            .iter()
            .any(|a| a.text == ad));
    }

    #[test]
    fn category_distribution_percentages() {
        let now = now_ms();
        let entries = vec![
            HistoryEntry {
                category: "Tech".into(),
                ad: AdContent::text_only("a"),
                timestamp_ms: now,
            },
            HistoryEntry {
                category: "Tech".into(),
                ad: AdContent::text_only("b"),
                timestamp_ms: now,
            },
            HistoryEntry {
                category: "Food".into(),
                ad: AdContent::text_only("c"),
                timestamp_ms: now,
            },
        ];
        let store = MemoryStore::new();
        store::set_json(&store, keys::HISTORY, &entries);
        let source = AdSource::new("http://127.0.0.1:9").expect("source");
        let engine = AdEngine::new(Box::new(store), source);

        let dist = engine.category_distribution();
        let tech = dist.iter().find(|(c, _, _)| c == "Tech").expect("Tech row");
        assert_eq!(tech.1, 2);
        assert!((tech.2 - 66.666).abs() < 0.1);
    }
}

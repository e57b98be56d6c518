//! Storage abstraction for adshelf.
//!
//! [`AdStore`] is the read/write contract over collected batches and
//! keyword registrations; [`HighlightStore`] owns pinned ads. Backends
//! (flat-file JSON, SQLite, in-memory) implement both so the pipeline never
//! branches on where data lives.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::{parse_timestamp, Ad, Batch, Highlight, KeywordRegistration};

/// Result of [`HighlightStore::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    Created,
    AlreadyExists,
}

/// Result of [`HighlightStore::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// Result of [`AdStore::delete_ad`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "count")]
pub enum DeleteOutcome {
    Deleted(usize),
    NotFound,
}

/// Ads grouped per keyword, in sidebar order.
#[derive(Debug, Clone, Default)]
pub struct KeywordGroups {
    keywords: Vec<String>,
    ads: HashMap<String, Vec<Ad>>,
    /// Human-readable notes about data that could not be read.
    pub notices: Vec<String>,
}

impl KeywordGroups {
    /// Keywords: registered ones first, then ones only seen in data.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn get(&self, keyword: &str) -> &[Ad] {
        self.ads.get(keyword).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn take(&mut self, keyword: &str) -> Vec<Ad> {
        self.ads.remove(keyword).unwrap_or_default()
    }

    /// All ads, keyword by keyword in sidebar order.
    pub fn iter(&self) -> impl Iterator<Item = &Ad> {
        self.keywords.iter().flat_map(|k| self.get(k).iter())
    }
}

/// Merge batches into per-keyword ad lists.
///
/// Batches are applied oldest first (undated batches last, storage order
/// otherwise), so "first occurrence" in dedup means earliest collection.
/// Every registered keyword appears, even with no ads.
pub fn group_by_keyword(registered: &[String], mut batches: Vec<Batch>) -> KeywordGroups {
    batches.sort_by_cached_key(|b| {
        match b.collected_at.as_deref().and_then(parse_timestamp) {
            Some(ts) => (0u8, ts.timestamp_millis()),
            None => (1u8, 0),
        }
    });

    let mut groups = KeywordGroups::default();
    for keyword in registered {
        if !groups.ads.contains_key(keyword) {
            groups.keywords.push(keyword.clone());
            groups.ads.insert(keyword.clone(), Vec::new());
        }
    }

    for batch in batches {
        let keyword = batch.keyword.trim().to_string();
        if keyword.is_empty() {
            tracing::warn!(ads = batch.ads.len(), "skipping batch with empty keyword");
            continue;
        }
        let list = groups.ads.entry(keyword.clone()).or_insert_with(|| {
            groups.keywords.push(keyword.clone());
            Vec::new()
        });
        let collected_at = batch.collected_at.as_deref();
        list.extend(batch.ads.into_iter().map(|raw| raw.into_ad(&keyword, collected_at)));
    }

    groups
}

/// Read/write contract over collected ads and keyword registrations.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`load_batches`](AdStore::load_batches) | Every persisted batch, storage order |
/// | [`load_registrations`](AdStore::load_registrations) | All registrations, insertion order |
/// | [`insert_batch`](AdStore::insert_batch) | Persist one collection run |
/// | [`delete_ad`](AdStore::delete_ad) | Remove every ad with a canonical identity |
/// | [`register_keyword`](AdStore::register_keyword) | Add a registration |
/// | [`set_keyword_enabled`](AdStore::set_keyword_enabled) | Toggle a registration |
/// | [`unregister_keyword`](AdStore::unregister_keyword) | Remove a registration |
#[async_trait]
pub trait AdStore: Send + Sync {
    async fn load_batches(&self) -> Result<Vec<Batch>>;

    async fn load_registrations(&self) -> Result<Vec<KeywordRegistration>>;

    async fn insert_batch(&self, batch: &Batch) -> Result<()>;

    /// Accepts a canonical identity or a full image URL.
    async fn delete_ad(&self, identity_or_url: &str) -> Result<DeleteOutcome>;

    /// Returns `false` when the query is already registered.
    async fn register_keyword(&self, registration: &KeywordRegistration) -> Result<bool>;

    /// Returns `false` when the query is not registered.
    async fn set_keyword_enabled(&self, query: &str, enabled: bool) -> Result<bool>;

    /// Returns `false` when the query is not registered.
    async fn unregister_keyword(&self, query: &str) -> Result<bool>;

    /// Enabled registrations' queries, in registration order. Degrades to
    /// empty on storage errors.
    async fn load_registered_keywords(&self) -> Vec<String> {
        match self.load_registrations().await {
            Ok(regs) => regs
                .into_iter()
                .filter(|r| r.enabled)
                .map(|r| r.query)
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read keyword registrations");
                Vec::new()
            }
        }
    }

    /// Ads grouped by keyword. Never fails: unreadable storage yields an
    /// empty (or partial) grouping with a notice attached.
    async fn load_ads(&self) -> KeywordGroups {
        let mut notices = Vec::new();
        let registered = match self.load_registrations().await {
            Ok(regs) => regs
                .into_iter()
                .filter(|r| r.enabled)
                .map(|r| r.query)
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read keyword registrations");
                notices.push(format!("keyword registrations unavailable: {}", e));
                Vec::new()
            }
        };
        let batches = match self.load_batches().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read ad batches");
                notices.push(format!("ad data unavailable: {}", e));
                Vec::new()
            }
        };
        let mut groups = group_by_keyword(&registered, batches);
        groups.notices = notices;
        groups
    }
}

/// Pinned ads keyed by canonical identity.
#[async_trait]
pub trait HighlightStore: Send + Sync {
    /// Idempotent: an existing highlight with the same identity is left
    /// untouched. Fails with [`CoreError::MissingImage`](crate::error::CoreError)
    /// when the ad has no image.
    async fn add(&self, ad: &Ad) -> Result<AddOutcome>;

    async fn remove(&self, id: &str) -> Result<RemoveOutcome>;

    /// Most recently highlighted first.
    async fn list(&self) -> Result<Vec<Highlight>>;
}

/// Newest `highlighted_at` first; ties keep storage order.
pub fn sort_highlights(highlights: &mut [Highlight]) {
    highlights.sort_by_cached_key(|h| {
        std::cmp::Reverse(
            parse_timestamp(&h.highlighted_at)
                .map(|ts| ts.timestamp_nanos_opt().unwrap_or(i64::MAX))
                .unwrap_or(0),
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawAd;

    fn raw(url: &str) -> RawAd {
        RawAd {
            image_urls: vec![url.to_string()],
            ..Default::default()
        }
    }

    fn batch(keyword: &str, collected_at: Option<&str>, urls: &[&str]) -> Batch {
        Batch {
            keyword: keyword.to_string(),
            collected_at: collected_at.map(str::to_string),
            ads: urls.iter().map(|u| raw(u)).collect(),
        }
    }

    #[test]
    fn test_registered_keywords_first_then_discovered() {
        let registered = vec!["zeta".to_string(), "alpha".to_string()];
        let batches = vec![
            batch("gamma", Some("2024-01-01"), &["https://cdn/1.jpg"]),
            batch("alpha", Some("2024-01-02"), &["https://cdn/2.jpg"]),
            batch("beta", Some("2024-01-03"), &["https://cdn/3.jpg"]),
        ];
        let groups = group_by_keyword(&registered, batches);
        assert_eq!(groups.keywords(), &["zeta", "alpha", "gamma", "beta"]);
        assert!(groups.get("zeta").is_empty());
        assert_eq!(groups.get("alpha").len(), 1);
        assert!(groups.get("missing").is_empty());
    }

    #[test]
    fn test_batches_applied_oldest_first() {
        let batches = vec![
            batch("k", Some("2024-01-08T10:00:00"), &["https://cdn/new.jpg"]),
            batch("k", None, &["https://cdn/undated.jpg"]),
            batch("k", Some("2024-01-01T10:00:00"), &["https://cdn/old.jpg"]),
        ];
        let groups = group_by_keyword(&[], batches);
        let urls: Vec<&str> = groups
            .get("k")
            .iter()
            .map(|a| a.primary_image_url.as_str())
            .collect();
        assert_eq!(
            urls,
            vec!["https://cdn/old.jpg", "https://cdn/new.jpg", "https://cdn/undated.jpg"]
        );
        assert_eq!(groups.get("k")[0].collected_at.as_deref(), Some("2024-01-01T10:00:00"));
    }

    #[test]
    fn test_empty_keyword_batch_skipped() {
        let groups = group_by_keyword(&[], vec![batch("  ", None, &["https://cdn/1.jpg"])]);
        assert!(groups.keywords().is_empty());
    }

    #[test]
    fn test_sort_highlights_newest_first() {
        let mk = |id: &str, at: &str| Highlight {
            id: id.to_string(),
            keyword: "k".to_string(),
            page_name: None,
            ad_text: vec![],
            primary_image_url: format!("https://cdn/{}.jpg", id),
            landing_url: None,
            collected_at: None,
            highlighted_at: at.to_string(),
        };
        let mut hs = vec![
            mk("a", "2024-01-01T00:00:00+00:00"),
            mk("b", "2024-03-01T00:00:00+00:00"),
            mk("c", "2024-02-01T00:00:00+00:00"),
        ];
        sort_highlights(&mut hs);
        let ids: Vec<&str> = hs.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }
}

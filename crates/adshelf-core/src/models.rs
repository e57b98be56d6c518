//! Core data models used throughout adshelf.
//!
//! [`Batch`] and [`RawAd`] mirror what the collector writes to storage.
//! [`Ad`] is the projected record the pipeline filters and pages;
//! [`Highlight`] is a user-pinned copy of an ad keyed by its canonical
//! identity.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::identity::resolve_identity;

/// Display name used wherever an advertiser is missing.
pub const UNKNOWN_ADVERTISER: &str = "Unknown";

pub const DEFAULT_COUNTRY: &str = "KR";
pub const DEFAULT_LIMIT: u32 = 50;

/// One collection run's output for one keyword.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    #[serde(alias = "query")]
    pub keyword: String,
    #[serde(default)]
    pub collected_at: Option<String>,
    #[serde(default)]
    pub ads: Vec<RawAd>,
}

/// An ad record exactly as the collector stored it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAd {
    #[serde(default)]
    pub page_name: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub ad_text: Vec<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent_image_url: Option<String>,
    #[serde(default)]
    pub landing_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_at: Option<String>,
}

impl RawAd {
    /// Best available image: rehosted URL, then an explicit primary URL,
    /// then the first scraped CDN URL.
    pub fn primary_image(&self) -> Option<&str> {
        non_blank(self.permanent_image_url.as_deref())
            .or_else(|| non_blank(self.primary_image_url.as_deref()))
            .or_else(|| self.image_urls.iter().find_map(|u| non_blank(Some(u))))
    }

    /// Project into an [`Ad`], tagging it with the batch's keyword and
    /// timestamp. An ad without any image keeps an empty
    /// `primary_image_url`; the validity filter drops it later.
    pub fn into_ad(self, keyword: &str, batch_collected_at: Option<&str>) -> Ad {
        let primary_image_url = self.primary_image().unwrap_or_default().to_string();
        Ad {
            keyword: keyword.to_string(),
            page_name: self.page_name,
            ad_text: self.ad_text,
            primary_image_url,
            landing_url: self.landing_url,
            collected_at: batch_collected_at
                .map(str::to_string)
                .or(self.collected_at),
        }
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null,
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) if s.is_empty() => Vec::new(),
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Null => Vec::new(),
    })
}

/// A scraped ad creative as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ad {
    pub keyword: String,
    #[serde(default)]
    pub page_name: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub ad_text: Vec<String>,
    #[serde(default)]
    pub primary_image_url: String,
    #[serde(default)]
    pub landing_url: Option<String>,
    #[serde(default)]
    pub collected_at: Option<String>,
}

impl Ad {
    pub fn identity(&self) -> String {
        resolve_identity(&self.primary_image_url)
    }

    pub fn has_image(&self) -> bool {
        !self.primary_image_url.trim().is_empty()
    }
}

/// A user-pinned copy of an [`Ad`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    /// Canonical identity of the pinned creative.
    pub id: String,
    pub keyword: String,
    #[serde(default)]
    pub page_name: Option<String>,
    #[serde(default)]
    pub ad_text: Vec<String>,
    pub primary_image_url: String,
    #[serde(default)]
    pub landing_url: Option<String>,
    #[serde(default)]
    pub collected_at: Option<String>,
    pub highlighted_at: String,
}

impl Highlight {
    /// Snapshot `ad` as a highlight created at `now`.
    pub fn from_ad(ad: &Ad, now: DateTime<Utc>) -> Result<Self, CoreError> {
        if !ad.has_image() {
            return Err(CoreError::MissingImage);
        }
        Ok(Self {
            id: ad.identity(),
            keyword: ad.keyword.clone(),
            page_name: ad.page_name.clone(),
            ad_text: ad.ad_text.clone(),
            primary_image_url: ad.primary_image_url.clone(),
            landing_url: ad.landing_url.clone(),
            collected_at: ad.collected_at.clone(),
            highlighted_at: now.to_rfc3339(),
        })
    }
}

/// A tracked search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRegistration {
    pub query: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}
fn default_limit() -> u32 {
    DEFAULT_LIMIT
}
fn default_enabled() -> bool {
    true
}

impl KeywordRegistration {
    /// Build an enabled registration, trimming the query.
    pub fn new(query: &str, country: Option<&str>, limit: Option<u32>) -> Result<Self, CoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CoreError::InvalidKeyword {
                reason: "query must not be empty".to_string(),
            });
        }
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 {
            return Err(CoreError::InvalidKeyword {
                reason: "limit must be > 0".to_string(),
            });
        }
        let country = country
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COUNTRY);
        Ok(Self {
            query: query.to_string(),
            country: country.to_string(),
            limit,
            enabled: true,
        })
    }
}

/// Common read access for anything that flows through the filter and
/// pagination stages.
pub trait AdRecord {
    fn keyword(&self) -> &str;
    fn page_name(&self) -> Option<&str>;
    fn collected_at(&self) -> Option<&str>;
    fn image_url(&self) -> &str;

    /// Advertiser name as shown in the dashboard.
    fn advertiser(&self) -> &str {
        self.page_name()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_ADVERTISER)
    }

    fn collected_at_parsed(&self) -> Option<DateTime<Utc>> {
        self.collected_at().and_then(parse_timestamp)
    }
}

impl AdRecord for Ad {
    fn keyword(&self) -> &str {
        &self.keyword
    }
    fn page_name(&self) -> Option<&str> {
        self.page_name.as_deref()
    }
    fn collected_at(&self) -> Option<&str> {
        self.collected_at.as_deref()
    }
    fn image_url(&self) -> &str {
        &self.primary_image_url
    }
}

impl AdRecord for Highlight {
    fn keyword(&self) -> &str {
        &self.keyword
    }
    fn page_name(&self) -> Option<&str> {
        self.page_name.as_deref()
    }
    fn collected_at(&self) -> Option<&str> {
        self.collected_at.as_deref()
    }
    fn image_url(&self) -> &str {
        &self.primary_image_url
    }
}

/// Parse a collector timestamp as wall-clock time.
///
/// The collector writes local times, so an explicit offset is dropped
/// rather than converted: `2024-01-08T01:00:00+09:00` reads as 01:00 on
/// January 8th. Naive values are taken as they are.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS[.f]`, `YYYY-MM-DD HH:MM:SS[.f]`,
/// `YYYY-MM-DD` and `YYYYMMDD`.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local().and_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in ["%Y-%m-%d", "%Y%m%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_primary_image_prefers_permanent() {
        let raw = RawAd {
            image_urls: vec!["https://cdn/x/a.jpg?sig=1".to_string()],
            permanent_image_url: Some("https://r2/abc.png".to_string()),
            ..Default::default()
        };
        assert_eq!(raw.primary_image(), Some("https://r2/abc.png"));
    }

    #[test]
    fn test_primary_image_skips_blank_entries() {
        let raw = RawAd {
            image_urls: vec!["".to_string(), "https://cdn/x/b.jpg".to_string()],
            permanent_image_url: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(raw.primary_image(), Some("https://cdn/x/b.jpg"));
    }

    #[test]
    fn test_into_ad_uses_batch_timestamp() {
        let raw = RawAd {
            collected_at: Some("2020-01-01".to_string()),
            image_urls: vec!["https://cdn/a.jpg".to_string()],
            ..Default::default()
        };
        let ad = raw.into_ad("shoes", Some("2024-01-08T09:00:00"));
        assert_eq!(ad.keyword, "shoes");
        assert_eq!(ad.collected_at.as_deref(), Some("2024-01-08T09:00:00"));
    }

    #[test]
    fn test_into_ad_without_image_is_invalid() {
        let ad = RawAd::default().into_ad("shoes", None);
        assert!(!ad.has_image());
        assert!(ad.collected_at.is_none());
    }

    #[test]
    fn test_ad_text_accepts_string_or_list() {
        let one: RawAd = serde_json::from_str(r#"{"ad_text": "hello"}"#).unwrap();
        assert_eq!(one.ad_text, vec!["hello"]);
        let many: RawAd = serde_json::from_str(r#"{"ad_text": ["a", "b"]}"#).unwrap();
        assert_eq!(many.ad_text, vec!["a", "b"]);
        let none: RawAd = serde_json::from_str(r#"{"ad_text": null}"#).unwrap();
        assert!(none.ad_text.is_empty());
    }

    #[test]
    fn test_batch_accepts_query_alias() {
        let batch: Batch = serde_json::from_str(
            r#"{"query": "shoes", "collected_at": "2024-01-01T10:00:00", "count": 0, "source": "playwright_scraping", "ads": []}"#,
        )
        .unwrap();
        assert_eq!(batch.keyword, "shoes");
    }

    #[test]
    fn test_highlight_requires_image() {
        let ad = RawAd::default().into_ad("shoes", None);
        assert_eq!(
            Highlight::from_ad(&ad, Utc::now()),
            Err(CoreError::MissingImage)
        );
    }

    #[test]
    fn test_registration_trims_and_defaults() {
        let reg = KeywordRegistration::new("  running shoes ", None, None).unwrap();
        assert_eq!(reg.query, "running shoes");
        assert_eq!(reg.country, "KR");
        assert_eq!(reg.limit, 50);
        assert!(reg.enabled);
        assert!(KeywordRegistration::new("   ", None, None).is_err());
        assert!(KeywordRegistration::new("x", None, Some(0)).is_err());
    }

    #[test]
    fn test_advertiser_display_name() {
        let mut ad = RawAd::default().into_ad("k", None);
        assert_eq!(ad.advertiser(), UNKNOWN_ADVERTISER);
        ad.page_name = Some("Acme".to_string());
        assert_eq!(ad.advertiser(), "Acme");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = parse_timestamp("2024-01-08T09:30:00+09:00").unwrap();
        assert_eq!(rfc.hour(), 9);
        assert_eq!(rfc.minute(), 30);
        let iso = parse_timestamp("2024-01-08T09:30:00.123456").unwrap();
        assert_eq!(iso.day(), 8);
        assert!(parse_timestamp("2024-01-08 09:30:00").is_some());
        assert!(parse_timestamp("2024-01-08").is_some());
        assert!(parse_timestamp("20240108").is_some());
        assert!(parse_timestamp("last tuesday").is_none());
        assert!(parse_timestamp("").is_none());
    }
}

//! The dashboard query: one immutable [`ViewRequest`] in, one page out.
//!
//! # Keyword view
//!
//! ```text
//! AdStore::load_ads ─▶ group[keyword] ─▶ dedupe_and_validate
//!     ─▶ date filter ─▶ (available advertisers) ─▶ advertiser filter
//!     ─▶ sort_and_paginate
//! ```
//!
//! # Highlights view
//!
//! ```text
//! HighlightStore::list ─▶ date filter ─▶ (available advertisers)
//!     ─▶ advertiser filter ─▶ keyword filter ─▶ sort_and_paginate
//! ```
//!
//! Storage failures never fail the query; they turn into `notices`.

use serde::{Deserialize, Serialize};

use crate::dedup::dedupe_and_validate;
use crate::filter::{apply_filters, available_keywords, AdvertiserSelection, DateRange};
use crate::models::{Ad, Highlight};
use crate::paginate::{page_count, sort_and_paginate};
use crate::store::{AdStore, HighlightStore};

pub const DEFAULT_PAGE_SIZE: usize = 70;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Keyword,
    Highlights,
}

/// Everything the dashboard knows about the current view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRequest {
    #[serde(default)]
    pub view: View,
    /// Keyword group to show. Defaults to the first keyword in sidebar order.
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default)]
    pub advertiser_selection: AdvertiserSelection,
    /// Highlights view only; empty matches every keyword.
    #[serde(default)]
    pub keyword_selection: Vec<String>,
    #[serde(default = "default_page_number")]
    pub page_number: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_number() -> usize {
    1
}
fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for ViewRequest {
    fn default() -> Self {
        Self {
            view: View::Keyword,
            keyword: None,
            date_range: DateRange::unbounded(),
            advertiser_selection: AdvertiserSelection::AllSelected,
            keyword_selection: Vec::new(),
            page_number: default_page_number(),
            page_size: default_page_size(),
        }
    }
}

/// An item on a rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageItem {
    Ad(Ad),
    Highlight(Highlight),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResponse {
    pub view: View,
    /// The keyword group actually shown (keyword view).
    pub keyword: Option<String>,
    pub page_items: Vec<PageItem>,
    pub total_count: usize,
    pub page_number: usize,
    pub page_count: usize,
    /// Advertisers present after the date filter, for the picker.
    pub available_advertisers: Vec<String>,
    /// Selection after normalisation; store this as the new UI state.
    pub advertiser_selection: AdvertiserSelection,
    /// Sidebar keywords (keyword view).
    pub keywords: Vec<String>,
    /// Keywords present among highlights (highlights view picker).
    pub available_keywords: Vec<String>,
    pub notices: Vec<String>,
}

/// Run one dashboard query against the given stores.
pub async fn run_query<A, H>(ads: &A, highlights: &H, req: &ViewRequest) -> QueryResponse
where
    A: AdStore + ?Sized,
    H: HighlightStore + ?Sized,
{
    match req.view {
        View::Keyword => keyword_view(ads, req).await,
        View::Highlights => highlights_view(highlights, req).await,
    }
}

async fn keyword_view<A: AdStore + ?Sized>(store: &A, req: &ViewRequest) -> QueryResponse {
    let mut groups = store.load_ads().await;
    let keyword = req
        .keyword
        .clone()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| groups.keywords().first().cloned());

    let ads = keyword
        .as_deref()
        .map(|k| groups.take(k))
        .unwrap_or_default();
    let ads = dedupe_and_validate(ads);
    let filtered = apply_filters(ads, &req.date_range, &req.advertiser_selection, None);

    let page = sort_and_paginate(filtered.items, req.page_number, req.page_size);
    tracing::debug!(
        keyword = keyword.as_deref().unwrap_or(""),
        total = page.total_count,
        page = req.page_number,
        "keyword view"
    );

    QueryResponse {
        view: View::Keyword,
        keyword,
        page_items: page.items.into_iter().map(PageItem::Ad).collect(),
        total_count: page.total_count,
        page_number: req.page_number,
        page_count: page_count(page.total_count, req.page_size),
        available_advertisers: filtered.available_advertisers,
        advertiser_selection: filtered.selection,
        keywords: groups.keywords().to_vec(),
        available_keywords: Vec::new(),
        notices: groups.notices,
    }
}

async fn highlights_view<H: HighlightStore + ?Sized>(store: &H, req: &ViewRequest) -> QueryResponse {
    let mut notices = Vec::new();
    let all = match store.list().await {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read highlights");
            notices.push(format!("highlights unavailable: {}", e));
            Vec::new()
        }
    };
    let keywords = available_keywords(&all);

    let filtered = apply_filters(
        all,
        &req.date_range,
        &req.advertiser_selection,
        Some(req.keyword_selection.as_slice()),
    );

    let page = sort_and_paginate(filtered.items, req.page_number, req.page_size);

    QueryResponse {
        view: View::Highlights,
        keyword: None,
        page_items: page.items.into_iter().map(PageItem::Highlight).collect(),
        total_count: page.total_count,
        page_number: req.page_number,
        page_count: page_count(page.total_count, req.page_size),
        available_advertisers: filtered.available_advertisers,
        advertiser_selection: filtered.selection,
        keywords: Vec::new(),
        available_keywords: keywords,
        notices,
    }
}

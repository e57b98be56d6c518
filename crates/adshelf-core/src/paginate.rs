//! Recency sort and fixed-size page windows.

use serde::Serialize;

use crate::models::AdRecord;

/// One page of results plus the pre-slice total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
}

/// Sort key: `collected_at` as epoch millis, undated and unreadable ads at 0.
fn recency_key<T: AdRecord>(ad: &T) -> i64 {
    ad.collected_at_parsed()
        .map(|ts| ts.timestamp_millis())
        .unwrap_or(0)
}

/// Stable newest-first sort. Ties keep their input order.
pub fn sort_by_recency<T: AdRecord>(ads: &mut [T]) {
    ads.sort_by_cached_key(|ad| std::cmp::Reverse(recency_key(ad)));
}

/// Sort, then cut page `page_number` (1-based) of `page_size` items.
/// Out-of-range pages come back empty.
pub fn sort_and_paginate<T: AdRecord>(mut ads: Vec<T>, page_number: usize, page_size: usize) -> Page<T> {
    let total_count = ads.len();
    sort_by_recency(&mut ads);

    let start = page_number
        .checked_sub(1)
        .and_then(|p| p.checked_mul(page_size))
        .unwrap_or(usize::MAX);
    let items = if page_size == 0 || start >= total_count {
        Vec::new()
    } else {
        let end = start.saturating_add(page_size).min(total_count);
        ads.drain(start..end).collect()
    };

    Page { items, total_count }
}

/// Number of pages needed for `total` items; zero when there is nothing.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

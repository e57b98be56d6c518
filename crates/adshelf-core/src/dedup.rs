//! Validity filter and cross-run deduplication.
//!
//! Order-preserving: survivors keep their input order and the first
//! occurrence of each canonical identity wins. Recency ordering happens
//! later in [`crate::paginate`].

use std::collections::HashSet;

use crate::models::Ad;

/// Drop ads without a usable image, then collapse repeated creatives.
pub fn dedupe_and_validate(ads: Vec<Ad>) -> Vec<Ad> {
    let mut seen: HashSet<String> = HashSet::with_capacity(ads.len());
    ads.into_iter()
        .filter(Ad::has_image)
        .filter(|ad| seen.insert(ad.identity()))
        .collect()
}

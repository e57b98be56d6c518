//! Highlight commands (`adshelf highlight ...`).

use anyhow::{anyhow, Result};

use adshelf_core::identity::identity_of;
use adshelf_core::models::{Ad, AdRecord};
use adshelf_core::store::{AddOutcome, AdStore, HighlightStore, RemoveOutcome};

use crate::config::Config;
use crate::stores;

/// First valid stored ad, in load order, whose identity matches.
pub async fn find_ad(store: &dyn AdStore, identity_or_url: &str) -> Option<Ad> {
    let target = identity_of(identity_or_url);
    let groups = store.load_ads().await;
    let found = groups
        .iter()
        .find(|ad| ad.has_image() && ad.identity() == target)
        .cloned();
    found
}

/// Pin the stored ad with this identity.
pub async fn pin(
    ads: &dyn AdStore,
    highlights: &dyn HighlightStore,
    identity_or_url: &str,
) -> Result<(String, AddOutcome)> {
    let ad = find_ad(ads, identity_or_url)
        .await
        .ok_or_else(|| anyhow!("ad not found: {}", identity_or_url))?;
    let outcome = highlights.add(&ad).await?;
    Ok((ad.identity(), outcome))
}

pub async fn run_add(config: &Config, identity_or_url: &str) -> Result<()> {
    let stores = stores::open(config).await?;
    let (id, outcome) = pin(
        stores.ads.as_ref(),
        stores.highlights.as_ref(),
        identity_or_url,
    )
    .await?;
    match outcome {
        AddOutcome::Created => println!("Highlighted: {}", id),
        AddOutcome::AlreadyExists => println!("Already highlighted: {}", id),
    }
    Ok(())
}

pub async fn run_remove(config: &Config, id: &str) -> Result<()> {
    let stores = stores::open(config).await?;
    match stores.highlights.remove(id).await? {
        RemoveOutcome::Removed => println!("Removed highlight: {}", id),
        RemoveOutcome::NotFound => println!("No highlight with id: {}", id),
    }
    Ok(())
}

pub async fn run_list(config: &Config) -> Result<()> {
    let stores = stores::open(config).await?;
    let list = stores.highlights.list().await?;
    if list.is_empty() {
        println!("No highlights.");
        return Ok(());
    }
    for h in &list {
        println!(
            "{}  [{}]  {}  {}",
            h.id,
            h.keyword,
            h.advertiser(),
            h.highlighted_at
        );
    }
    println!("\n{} highlight(s)", list.len());
    Ok(())
}

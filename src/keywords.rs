//! Keyword registration commands (`adshelf keywords ...`).

use anyhow::Result;

use adshelf_core::models::KeywordRegistration;
use adshelf_core::store::AdStore;

use crate::config::Config;
use crate::stores;

/// Validate and store a registration. Returns `false` for a duplicate query.
pub async fn add(
    store: &dyn AdStore,
    query: &str,
    country: Option<&str>,
    limit: Option<u32>,
) -> Result<bool> {
    let registration = KeywordRegistration::new(query, country, limit)?;
    let created = store.register_keyword(&registration).await?;
    if created {
        tracing::info!(query = %registration.query, "registered keyword");
    }
    Ok(created)
}

pub async fn run_list(config: &Config) -> Result<()> {
    let stores = stores::open(config).await?;
    let regs = stores.ads.load_registrations().await?;

    if regs.is_empty() {
        println!("No keywords registered.");
        return Ok(());
    }

    println!("{:<30} {:<8} {:>6}  STATUS", "QUERY", "COUNTRY", "LIMIT");
    for r in &regs {
        println!(
            "{:<30} {:<8} {:>6}  {}",
            r.query,
            r.country,
            r.limit,
            if r.enabled { "enabled" } else { "disabled" }
        );
    }
    Ok(())
}

pub async fn run_add(
    config: &Config,
    query: &str,
    country: Option<&str>,
    limit: Option<u32>,
) -> Result<()> {
    let stores = stores::open(config).await?;
    if add(stores.ads.as_ref(), query, country, limit).await? {
        println!("Added keyword: {}", query.trim());
    } else {
        println!("Keyword already registered: {}", query.trim());
    }
    Ok(())
}

pub async fn run_remove(config: &Config, query: &str) -> Result<()> {
    let stores = stores::open(config).await?;
    if stores.ads.unregister_keyword(query).await? {
        println!("Removed keyword: {}", query);
    } else {
        println!("Keyword not registered: {}", query);
    }
    Ok(())
}

pub async fn run_set_enabled(config: &Config, query: &str, enabled: bool) -> Result<()> {
    let stores = stores::open(config).await?;
    if !stores.ads.set_keyword_enabled(query, enabled).await? {
        anyhow::bail!("keyword not registered: {}", query);
    }
    println!(
        "{} keyword: {}",
        if enabled { "Enabled" } else { "Disabled" },
        query
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use adshelf_core::error::CoreError;
    use adshelf_core::store::memory::InMemoryStore;

    #[tokio::test]
    async fn test_add_trims_and_rejects_duplicates() {
        let store = InMemoryStore::new();
        assert!(add(&store, "  shoes ", None, None).await.unwrap());
        assert!(!add(&store, "shoes", Some("US"), Some(10)).await.unwrap());

        let regs = store.load_registrations().await.unwrap();
        assert_eq!(regs.len(), 1);
        assert_eq!(regs[0].query, "shoes");
        assert_eq!(regs[0].country, "KR");
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_input() {
        let store = InMemoryStore::new();
        let err = add(&store, "   ", None, None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::InvalidKeyword { .. })
        ));
        assert!(add(&store, "shoes", None, Some(0)).await.is_err());
    }

    #[tokio::test]
    async fn test_disabled_keyword_leaves_sidebar() {
        let store = InMemoryStore::new();
        add(&store, "shoes", None, None).await.unwrap();
        add(&store, "bags", None, None).await.unwrap();
        assert!(store.set_keyword_enabled("shoes", false).await.unwrap());
        assert_eq!(store.load_registered_keywords().await, vec!["bags"]);
    }
}

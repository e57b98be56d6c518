//! In-memory [`AdStore`] and [`HighlightStore`] for tests and embedding.
//!
//! Uses `Vec`s behind `std::sync::RwLock`. Batches are kept in insertion
//! order, which is this store's storage order.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use crate::identity::identity_of;
use crate::models::{Ad, Batch, Highlight, KeywordRegistration};

use super::{
    sort_highlights, AddOutcome, AdStore, DeleteOutcome, HighlightStore, RemoveOutcome,
};

/// In-memory store holding batches, registrations and highlights.
#[derive(Default)]
pub struct InMemoryStore {
    batches: RwLock<Vec<Batch>>,
    registrations: RwLock<Vec<KeywordRegistration>>,
    highlights: RwLock<Vec<Highlight>>,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with batches, e.g. for tests.
    pub fn with_batches(batches: Vec<Batch>) -> Self {
        Self {
            batches: RwLock::new(batches),
            ..Self::default()
        }
    }
}

#[async_trait]
impl AdStore for InMemoryStore {
    async fn load_batches(&self) -> Result<Vec<Batch>> {
        Ok(read(&self.batches)?.clone())
    }

    async fn load_registrations(&self) -> Result<Vec<KeywordRegistration>> {
        Ok(read(&self.registrations)?.clone())
    }

    async fn insert_batch(&self, batch: &Batch) -> Result<()> {
        write(&self.batches)?.push(batch.clone());
        Ok(())
    }

    async fn delete_ad(&self, identity_or_url: &str) -> Result<DeleteOutcome> {
        let target = identity_of(identity_or_url);
        let mut batches = write(&self.batches)?;
        let mut removed = 0;
        for batch in batches.iter_mut() {
            let keyword = batch.keyword.clone();
            let before = batch.ads.len();
            batch.ads.retain(|raw| {
                let ad = raw.clone().into_ad(&keyword, None);
                !(ad.has_image() && ad.identity() == target)
            });
            removed += before - batch.ads.len();
        }
        Ok(if removed == 0 {
            DeleteOutcome::NotFound
        } else {
            DeleteOutcome::Deleted(removed)
        })
    }

    async fn register_keyword(&self, registration: &KeywordRegistration) -> Result<bool> {
        let mut regs = write(&self.registrations)?;
        if regs.iter().any(|r| r.query == registration.query) {
            return Ok(false);
        }
        regs.push(registration.clone());
        Ok(true)
    }

    async fn set_keyword_enabled(&self, query: &str, enabled: bool) -> Result<bool> {
        let mut regs = write(&self.registrations)?;
        match regs.iter_mut().find(|r| r.query == query) {
            Some(r) => {
                r.enabled = enabled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn unregister_keyword(&self, query: &str) -> Result<bool> {
        let mut regs = write(&self.registrations)?;
        let before = regs.len();
        regs.retain(|r| r.query != query);
        Ok(regs.len() != before)
    }
}

#[async_trait]
impl HighlightStore for InMemoryStore {
    async fn add(&self, ad: &Ad) -> Result<AddOutcome> {
        let highlight = Highlight::from_ad(ad, Utc::now())?;
        let mut highlights = write(&self.highlights)?;
        if highlights.iter().any(|h| h.id == highlight.id) {
            return Ok(AddOutcome::AlreadyExists);
        }
        highlights.push(highlight);
        Ok(AddOutcome::Created)
    }

    async fn remove(&self, id: &str) -> Result<RemoveOutcome> {
        let mut highlights = write(&self.highlights)?;
        let before = highlights.len();
        highlights.retain(|h| h.id != id);
        Ok(if highlights.len() == before {
            RemoveOutcome::NotFound
        } else {
            RemoveOutcome::Removed
        })
    }

    async fn list(&self) -> Result<Vec<Highlight>> {
        let mut out = read(&self.highlights)?.clone();
        // Stored oldest first; reverse so equal timestamps list newest insert first.
        out.reverse();
        sort_highlights(&mut out);
        Ok(out)
    }
}

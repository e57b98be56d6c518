//! SQLite-backed [`AdStore`] and [`HighlightStore`].
//!
//! Ads are stored one row per record; rows collected by the same run share
//! `(keyword, collected_at)` and are regrouped into batches on read.
//! Highlight uniqueness is the `highlights.id` primary key, so concurrent
//! adds of the same creative cannot produce two rows.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use adshelf_core::identity::identity_of;
use adshelf_core::models::{Ad, Batch, Highlight, KeywordRegistration, RawAd};
use adshelf_core::store::{
    sort_highlights, AddOutcome, AdStore, DeleteOutcome, HighlightStore, RemoveOutcome,
};

/// SQLite implementation of the store traits.
///
/// Wraps a [`SqlitePool`]; the schema comes from
/// [`migrate::create_tables`](crate::migrate::create_tables).
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// The non-rehosted image kept in the `image_url` column: the explicit
/// primary URL when present, else the first non-blank `image_urls` entry.
fn stored_image_url(raw: &RawAd) -> Option<String> {
    raw.primary_image_url
        .iter()
        .chain(raw.image_urls.iter())
        .find(|u| !u.trim().is_empty())
        .cloned()
}

fn parse_text_list(raw: &str) -> serde_json::Result<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw)
}

#[async_trait]
impl AdStore for SqliteStore {
    async fn load_batches(&self) -> Result<Vec<Batch>> {
        let rows = sqlx::query(
            r#"
            SELECT id, keyword, page_name, ad_text, image_url, permanent_image_url,
                   landing_url, collected_at
            FROM ads
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut batches: Vec<Batch> = Vec::new();
        for row in &rows {
            let id: i64 = row.get("id");
            let ad_text_raw: String = row.get("ad_text");
            let ad_text = match parse_text_list(&ad_text_raw) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(row = id, error = %e, "skipping ad row with malformed ad_text");
                    continue;
                }
            };
            let keyword: String = row.get("keyword");
            let collected_at: Option<String> = row.get("collected_at");
            let image_url: Option<String> = row.get("image_url");
            let raw = RawAd {
                page_name: row.get("page_name"),
                ad_text,
                image_urls: image_url.into_iter().collect(),
                primary_image_url: None,
                permanent_image_url: row.get("permanent_image_url"),
                landing_url: row.get("landing_url"),
                collected_at: None,
            };

            match batches.last_mut() {
                Some(b) if b.keyword == keyword && b.collected_at == collected_at => b.ads.push(raw),
                _ => batches.push(Batch {
                    keyword,
                    collected_at,
                    ads: vec![raw],
                }),
            }
        }

        Ok(batches)
    }

    async fn load_registrations(&self) -> Result<Vec<KeywordRegistration>> {
        let rows = sqlx::query(
            "SELECT query, country, ad_limit, enabled FROM keywords ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut regs = Vec::with_capacity(rows.len());
        for row in &rows {
            let query: String = row.get("query");
            let limit: i64 = row.get("ad_limit");
            let Ok(limit) = u32::try_from(limit) else {
                tracing::warn!(query = %query, limit, "skipping keyword with invalid limit");
                continue;
            };
            regs.push(KeywordRegistration {
                query,
                country: row.get("country"),
                limit,
                enabled: row.get("enabled"),
            });
        }
        Ok(regs)
    }

    async fn insert_batch(&self, batch: &Batch) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for raw in &batch.ads {
            let image_url = stored_image_url(raw);
            let collected_at = batch.collected_at.clone().or_else(|| raw.collected_at.clone());

            sqlx::query(
                r#"
                INSERT INTO ads (keyword, page_name, ad_text, image_url, permanent_image_url,
                                 landing_url, collected_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&batch.keyword)
            .bind(&raw.page_name)
            .bind(serde_json::to_string(&raw.ad_text)?)
            .bind(image_url)
            .bind(&raw.permanent_image_url)
            .bind(&raw.landing_url)
            .bind(collected_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_ad(&self, identity_or_url: &str) -> Result<DeleteOutcome> {
        let target = identity_of(identity_or_url);
        let rows = sqlx::query("SELECT id, keyword, image_url, permanent_image_url FROM ads")
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<i64> = rows
            .iter()
            .filter(|row| {
                let raw = RawAd {
                    image_urls: row.get::<Option<String>, _>("image_url").into_iter().collect(),
                    permanent_image_url: row.get("permanent_image_url"),
                    ..Default::default()
                };
                let ad = raw.into_ad(row.get::<&str, _>("keyword"), None);
                ad.has_image() && ad.identity() == target
            })
            .map(|row| row.get("id"))
            .collect();

        if ids.is_empty() {
            return Ok(DeleteOutcome::NotFound);
        }

        let mut tx = self.pool.begin().await?;
        for id in &ids {
            sqlx::query("DELETE FROM ads WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(DeleteOutcome::Deleted(ids.len()))
    }

    async fn register_keyword(&self, registration: &KeywordRegistration) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO keywords (query, country, ad_limit, enabled)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(query) DO NOTHING
            "#,
        )
        .bind(&registration.query)
        .bind(&registration.country)
        .bind(i64::from(registration.limit))
        .bind(registration.enabled)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_keyword_enabled(&self, query: &str, enabled: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE keywords SET enabled = ? WHERE query = ?")
            .bind(enabled)
            .bind(query)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn unregister_keyword(&self, query: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM keywords WHERE query = ?")
            .bind(query)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl HighlightStore for SqliteStore {
    async fn add(&self, ad: &Ad) -> Result<AddOutcome> {
        let h = Highlight::from_ad(ad, Utc::now())?;

        let result = sqlx::query(
            r#"
            INSERT INTO highlights (id, keyword, page_name, ad_text, image_url, landing_url,
                                    collected_at, highlighted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&h.id)
        .bind(&h.keyword)
        .bind(&h.page_name)
        .bind(serde_json::to_string(&h.ad_text)?)
        .bind(&h.primary_image_url)
        .bind(&h.landing_url)
        .bind(&h.collected_at)
        .bind(&h.highlighted_at)
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 0 {
            AddOutcome::AlreadyExists
        } else {
            AddOutcome::Created
        })
    }

    async fn remove(&self, id: &str) -> Result<RemoveOutcome> {
        let result = sqlx::query("DELETE FROM highlights WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(if result.rows_affected() == 0 {
            RemoveOutcome::NotFound
        } else {
            RemoveOutcome::Removed
        })
    }

    async fn list(&self) -> Result<Vec<Highlight>> {
        let rows = sqlx::query(
            r#"
            SELECT id, keyword, page_name, ad_text, image_url, landing_url, collected_at,
                   highlighted_at
            FROM highlights
            ORDER BY rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.get("id");
            let ad_text_raw: String = row.get("ad_text");
            let ad_text = match parse_text_list(&ad_text_raw) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(highlight = %id, error = %e, "skipping malformed highlight");
                    continue;
                }
            };
            out.push(Highlight {
                id,
                keyword: row.get("keyword"),
                page_name: row.get("page_name"),
                ad_text,
                primary_image_url: row.get("image_url"),
                landing_url: row.get("landing_url"),
                collected_at: row.get("collected_at"),
                highlighted_at: row.get("highlighted_at"),
            });
        }
        sort_highlights(&mut out);
        Ok(out)
    }
}

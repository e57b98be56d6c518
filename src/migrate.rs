//! Schema setup for both backends.
//!
//! SQLite gets three tables: `ads` (one row per collected record, in
//! insertion order), `keywords` (registrations, unique query) and
//! `highlights` (primary key = canonical identity). The JSON backend only
//! needs its directories.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::config::{Backend, Config};
use crate::db;

/// Create storage for the configured backend. Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    match config.store.backend {
        Backend::Json => {
            let json = config.json_or_default();
            std::fs::create_dir_all(&json.raw_dir)
                .with_context(|| format!("Failed to create {}", json.raw_dir.display()))?;
            for file in [&json.keywords_file, &json.highlights_file] {
                if let Some(parent) = file.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
            }
            Ok(())
        }
        Backend::Sqlite => {
            let pool = db::connect(config).await?;
            create_tables(&pool).await?;
            pool.close().await;
            Ok(())
        }
    }
}

/// Create the SQLite tables and indexes if missing.
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            keyword TEXT NOT NULL,
            page_name TEXT,
            ad_text TEXT NOT NULL DEFAULT '[]',
            image_url TEXT,
            permanent_image_url TEXT,
            landing_url TEXT,
            collected_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS keywords (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            query TEXT NOT NULL UNIQUE,
            country TEXT NOT NULL DEFAULT 'KR',
            ad_limit INTEGER NOT NULL DEFAULT 50,
            enabled INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS highlights (
            id TEXT PRIMARY KEY,
            keyword TEXT NOT NULL,
            page_name TEXT,
            ad_text TEXT NOT NULL DEFAULT '[]',
            image_url TEXT NOT NULL,
            landing_url TEXT,
            collected_at TEXT,
            highlighted_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ads_keyword ON ads(keyword)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_highlights_highlighted_at ON highlights(highlighted_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

//! Backend selection.

use std::sync::Arc;

use anyhow::Result;

use adshelf_core::store::{AdStore, HighlightStore};

use crate::config::{Backend, Config};
use crate::db;
use crate::json_store::JsonStore;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// Both store handles, backed by the same storage.
#[derive(Clone)]
pub struct Stores {
    pub ads: Arc<dyn AdStore>,
    pub highlights: Arc<dyn HighlightStore>,
}

impl Stores {
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: AdStore + HighlightStore + 'static,
    {
        Self {
            ads: store.clone(),
            highlights: store,
        }
    }
}

/// Open the backend named by `store.backend`. SQLite tables are created if
/// missing.
pub async fn open(config: &Config) -> Result<Stores> {
    match config.store.backend {
        Backend::Json => Ok(Stores::from_shared(Arc::new(JsonStore::new(
            &config.json_or_default(),
        )))),
        Backend::Sqlite => {
            let pool = db::connect(config).await?;
            migrate::create_tables(&pool).await?;
            Ok(Stores::from_shared(Arc::new(SqliteStore::new(pool))))
        }
    }
}

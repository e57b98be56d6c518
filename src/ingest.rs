//! Batch import.
//!
//! Reads collector output files (one batch per file) and writes them
//! through [`AdStore::insert_batch`]. This is how flat-file history moves
//! into the SQLite backend. Directories are walked for `*.json` files in
//! file-name order.

use std::path::PathBuf;

use anyhow::Result;
use walkdir::WalkDir;

use adshelf_core::store::AdStore;

use crate::config::Config;
use crate::json_store::read_batch_file;
use crate::stores;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub batches: usize,
    pub ads: usize,
    pub skipped_files: usize,
}

/// Expand directories into their `*.json` files, keeping file arguments as given.
fn expand(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(
                WalkDir::new(path)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .map(|e| e.into_path())
                    .filter(|p| p.extension().is_some_and(|ext| ext == "json")),
            );
        } else {
            files.push(path.clone());
        }
    }
    files
}

pub async fn import_files(store: &dyn AdStore, paths: &[PathBuf]) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for path in expand(paths) {
        let batch = match read_batch_file(&path) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "skipping import file");
                summary.skipped_files += 1;
                continue;
            }
        };
        if batch.keyword.trim().is_empty() {
            tracing::warn!(file = %path.display(), "skipping batch with empty keyword");
            summary.skipped_files += 1;
            continue;
        }

        store.insert_batch(&batch).await?;
        summary.batches += 1;
        summary.ads += batch.ads.len();
    }

    Ok(summary)
}

pub async fn run_import(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let stores = stores::open(config).await?;
    let summary = import_files(stores.ads.as_ref(), paths).await?;

    println!("import ({})", config.store.backend);
    println!("  batches saved: {}", summary.batches);
    println!("  ads saved: {}", summary.ads);
    println!("  files skipped: {}", summary.skipped_files);
    println!("ok");
    Ok(())
}

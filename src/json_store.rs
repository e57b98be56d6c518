//! Flat-file JSON backend.
//!
//! Layout (paths come from `[json]` in the config):
//!
//! ```text
//! data/raw/20240108_090000_shoes.json   one Batch per collection run
//! data/keywords.json                    {"keywords": [...], "schedule": ...}
//! data/highlights.json                  [Highlight, ...]
//! ```
//!
//! Batch files are read in file-name order; the collector prefixes names
//! with a timestamp, so that is collection order. Unreadable files and
//! malformed ad records are skipped with a warning rather than failing the
//! whole read. Every rewrite goes through a temp file in the target
//! directory followed by a rename.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use walkdir::WalkDir;

use adshelf_core::identity::identity_of;
use adshelf_core::models::{Ad, Batch, Highlight, KeywordRegistration, RawAd};
use adshelf_core::store::{
    sort_highlights, AddOutcome, AdStore, DeleteOutcome, HighlightStore, RemoveOutcome,
};

use crate::config::JsonConfig;

pub struct JsonStore {
    raw_dir: PathBuf,
    keywords_file: PathBuf,
    highlights_file: PathBuf,
    /// Serialises read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

/// On-disk batch, with ads kept raw so one bad record does not sink the file.
#[derive(Deserialize)]
struct BatchFile {
    #[serde(alias = "query")]
    keyword: String,
    #[serde(default)]
    collected_at: Option<String>,
    #[serde(default)]
    ads: Vec<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Default)]
struct KeywordsFile {
    #[serde(default)]
    keywords: Vec<KeywordRegistration>,
    /// `schedule`, `daily_limit` and anything else the scheduler keeps here.
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl JsonStore {
    pub fn new(config: &JsonConfig) -> Self {
        Self {
            raw_dir: config.raw_dir.clone(),
            keywords_file: config.keywords_file.clone(),
            highlights_file: config.highlights_file.clone(),
            write_lock: Mutex::new(()),
        }
    }

    fn batch_files(&self) -> Result<Vec<PathBuf>> {
        if !self.raw_dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.raw_dir).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to scan {}", self.raw_dir.display()))?;
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().is_some_and(|e| e == "json") {
                files.push(path.to_path_buf());
            }
        }
        Ok(files)
    }

    fn read_keywords_file(&self) -> Result<KeywordsFile> {
        if !self.keywords_file.exists() {
            return Ok(KeywordsFile::default());
        }
        let content = std::fs::read_to_string(&self.keywords_file)
            .with_context(|| format!("Failed to read {}", self.keywords_file.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.keywords_file.display()))
    }

    fn read_highlights_file(&self) -> Result<Vec<Highlight>> {
        if !self.highlights_file.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.highlights_file)
            .with_context(|| format!("Failed to read {}", self.highlights_file.display()))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.highlights_file.display()))
    }

    /// Pick an unused file name for a new batch.
    fn new_batch_path(&self, keyword: &str) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let slug: String = keyword
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let mut path = self.raw_dir.join(format!("{}_{}.json", stamp, slug));
        let mut n = 1;
        while path.exists() {
            path = self.raw_dir.join(format!("{}_{}_{}.json", stamp, slug, n));
            n += 1;
        }
        path
    }
}

pub(crate) fn read_batch_file(path: &Path) -> Result<Batch> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: BatchFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let mut ads = Vec::with_capacity(file.ads.len());
    for (i, value) in file.ads.into_iter().enumerate() {
        match serde_json::from_value::<RawAd>(value) {
            Ok(raw) => ads.push(raw),
            Err(e) => tracing::warn!(
                file = %path.display(),
                index = i,
                error = %e,
                "skipping malformed ad record"
            ),
        }
    }

    Ok(Batch {
        keyword: file.keyword,
        collected_at: file.collected_at,
        ads,
    })
}

/// Write `value` as pretty JSON to `path` via temp file + rename.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// Drop records with identity `target` from one batch file, leaving every
/// other key and record (including ones that do not parse) as written.
fn remove_from_file(path: &Path, target: &str) -> Result<usize> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut doc: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let keyword = doc
        .get("keyword")
        .or_else(|| doc.get("query"))
        .and_then(|k| k.as_str())
        .unwrap_or_default()
        .to_string();
    let Some(ads) = doc.get_mut("ads").and_then(|a| a.as_array_mut()) else {
        return Ok(0);
    };

    let before = ads.len();
    ads.retain(|value| match RawAd::deserialize(value) {
        Ok(raw) => {
            let ad = raw.into_ad(&keyword, None);
            !(ad.has_image() && ad.identity() == target)
        }
        Err(_) => true,
    });
    let dropped = before - ads.len();
    if dropped > 0 {
        write_json_atomic(path, &doc)?;
    }
    Ok(dropped)
}

#[async_trait]
impl AdStore for JsonStore {
    async fn load_batches(&self) -> Result<Vec<Batch>> {
        let mut batches = Vec::new();
        for path in self.batch_files()? {
            match read_batch_file(&path) {
                Ok(batch) => batches.push(batch),
                Err(e) => tracing::warn!(error = %format!("{:#}", e), "skipping batch file"),
            }
        }
        Ok(batches)
    }

    async fn load_registrations(&self) -> Result<Vec<KeywordRegistration>> {
        Ok(self.read_keywords_file()?.keywords)
    }

    async fn insert_batch(&self, batch: &Batch) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        std::fs::create_dir_all(&self.raw_dir)
            .with_context(|| format!("Failed to create {}", self.raw_dir.display()))?;
        let path = self.new_batch_path(&batch.keyword);
        write_json_atomic(&path, batch)?;
        tracing::info!(file = %path.display(), ads = batch.ads.len(), "saved batch");
        Ok(())
    }

    async fn delete_ad(&self, identity_or_url: &str) -> Result<DeleteOutcome> {
        let _guard = self.write_lock.lock().await;
        let target = identity_of(identity_or_url);
        let mut removed = 0;
        let mut last_err = None;

        for path in self.batch_files()? {
            match remove_from_file(&path, &target) {
                Ok(n) => removed += n,
                Err(e) => {
                    tracing::warn!(error = %format!("{:#}", e), "skipping batch file during delete");
                    last_err = Some(e);
                }
            }
        }

        if removed == 0 {
            if let Some(e) = last_err {
                return Err(e);
            }
        }

        Ok(if removed == 0 {
            DeleteOutcome::NotFound
        } else {
            tracing::info!(identity = %target, removed, "deleted ad");
            DeleteOutcome::Deleted(removed)
        })
    }

    async fn register_keyword(&self, registration: &KeywordRegistration) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.read_keywords_file()?;
        if file.keywords.iter().any(|k| k.query == registration.query) {
            return Ok(false);
        }
        file.keywords.push(registration.clone());
        write_json_atomic(&self.keywords_file, &file)?;
        Ok(true)
    }

    async fn set_keyword_enabled(&self, query: &str, enabled: bool) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.read_keywords_file()?;
        let Some(reg) = file.keywords.iter_mut().find(|k| k.query == query) else {
            return Ok(false);
        };
        reg.enabled = enabled;
        write_json_atomic(&self.keywords_file, &file)?;
        Ok(true)
    }

    async fn unregister_keyword(&self, query: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.read_keywords_file()?;
        let before = file.keywords.len();
        file.keywords.retain(|k| k.query != query);
        if file.keywords.len() == before {
            return Ok(false);
        }
        write_json_atomic(&self.keywords_file, &file)?;
        Ok(true)
    }
}

#[async_trait]
impl HighlightStore for JsonStore {
    async fn add(&self, ad: &Ad) -> Result<AddOutcome> {
        let highlight = Highlight::from_ad(ad, Utc::now())?;
        let _guard = self.write_lock.lock().await;
        let mut highlights = self.read_highlights_file()?;
        if highlights.iter().any(|h| h.id == highlight.id) {
            return Ok(AddOutcome::AlreadyExists);
        }
        highlights.push(highlight);
        write_json_atomic(&self.highlights_file, &highlights)?;
        Ok(AddOutcome::Created)
    }

    async fn remove(&self, id: &str) -> Result<RemoveOutcome> {
        let _guard = self.write_lock.lock().await;
        let mut highlights = self.read_highlights_file()?;
        let before = highlights.len();
        highlights.retain(|h| h.id != id);
        if highlights.len() == before {
            return Ok(RemoveOutcome::NotFound);
        }
        write_json_atomic(&self.highlights_file, &highlights)?;
        Ok(RemoveOutcome::Removed)
    }

    async fn list(&self) -> Result<Vec<Highlight>> {
        let mut highlights = self.read_highlights_file()?;
        // A hand-edited file may repeat an id; the first entry wins.
        let mut seen = HashSet::new();
        highlights.retain(|h| seen.insert(h.id.clone()));
        highlights.reverse();
        sort_highlights(&mut highlights);
        Ok(highlights)
    }
}

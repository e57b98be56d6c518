//! # adshelf
//!
//! A local dashboard backend for browsing ad creatives collected per search
//! keyword.
//!
//! An external collector writes one batch of ads per keyword per run.
//! adshelf merges those batches, collapses re-collected copies of the same
//! creative by a canonical identity derived from the image URL, and serves
//! filtered, paginated views plus a user-curated highlights list.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌───────────────────┐   ┌──────────────────────┐
//! │  Collector  │──▶│  Store adapter    │──▶│  adshelf-core query  │
//! │ (external)  │   │  JSON files/SQLite│   │ dedup+filter+page    │
//! └─────────────┘   └───────────────────┘   └──────────┬───────────┘
//!                                                      │
//!                                  ┌───────────────────┤
//!                                  ▼                   ▼
//!                             ┌──────────┐       ┌──────────┐
//!                             │   CLI    │       │   HTTP   │
//!                             │(adshelf) │       │  (axum)  │
//!                             └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! adshelf init                          # create storage
//! adshelf keywords add "running shoes"  # register a keyword
//! adshelf import data/raw/              # load collector output
//! adshelf query --keyword "running shoes"
//! adshelf serve                         # start the dashboard API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | Tracing subscriber setup |
//! | [`json_store`] | Flat-file JSON backend |
//! | [`sqlite_store`] | SQLite backend |
//! | [`stores`] | Backend selection |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema setup |
//! | [`ingest`] | Batch import |
//! | [`keywords`] | Keyword registration commands |
//! | [`highlights`] | Highlight commands |
//! | [`collect`] | Collection trigger |
//! | [`query_cmd`] | Terminal dashboard query |
//! | [`server`] | Dashboard HTTP API |

pub mod collect;
pub mod config;
pub mod db;
pub mod highlights;
pub mod ingest;
pub mod json_store;
pub mod keywords;
pub mod logging;
pub mod migrate;
pub mod query_cmd;
pub mod server;
pub mod sqlite_store;
pub mod stores;

//! # adshelf CLI
//!
//! ## Usage
//!
//! ```bash
//! adshelf --config ./config/adshelf.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `adshelf init` | Create storage for the configured backend |
//! | `adshelf serve` | Start the dashboard HTTP API |
//! | `adshelf query` | Run a dashboard query and print one page |
//! | `adshelf import <path>...` | Load collector batch files into the store |
//! | `adshelf keywords <action>` | List, add, remove, enable or disable keywords |
//! | `adshelf highlight <action>` | List, add or remove highlights |
//! | `adshelf delete-ad <identity>` | Delete every stored copy of an ad |
//! | `adshelf collect <keyword>` | Start the collector for one keyword |

use adshelf::{collect, config, highlights, ingest, keywords, logging, migrate, query_cmd, server, stores};
use adshelf_core::store::DeleteOutcome;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// adshelf: browse, filter and curate collected ad creatives.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file is an error; an empty one means all defaults.
#[derive(Parser)]
#[command(name = "adshelf", version, about = "Browse, filter and curate collected ad creatives")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/adshelf.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create storage (directories or SQLite tables). Idempotent.
    Init,

    /// Start the dashboard HTTP API on `[server].bind`.
    Serve,

    /// Run one dashboard query and print the page.
    Query {
        /// Show highlights instead of a keyword group.
        #[arg(long)]
        highlights: bool,

        /// Keyword group to show (defaults to the first in the sidebar).
        #[arg(long)]
        keyword: Option<String>,

        /// First day to include (YYYY-MM-DD).
        #[arg(long)]
        from: Option<String>,

        /// Last day to include (YYYY-MM-DD).
        #[arg(long)]
        to: Option<String>,

        /// Only these advertisers (repeatable).
        #[arg(long = "advertiser")]
        advertisers: Vec<String>,

        /// Select no advertisers.
        #[arg(long, conflicts_with = "advertisers")]
        no_advertisers: bool,

        /// Highlights view: only these keywords (repeatable).
        #[arg(long = "only-keyword")]
        keyword_filter: Vec<String>,

        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Items per page (defaults to `[dashboard].page_size`).
        #[arg(long)]
        page_size: Option<usize>,

        /// Print the full response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Load collector batch files (or directories of them) into the store.
    Import {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Manage keyword registrations.
    Keywords {
        #[command(subcommand)]
        action: KeywordAction,
    },

    /// Manage highlights.
    Highlight {
        #[command(subcommand)]
        action: HighlightAction,
    },

    /// Delete every stored copy of an ad, by identity or image URL.
    DeleteAd { identity: String },

    /// Start the collector for one keyword and return immediately.
    Collect { keyword: String },
}

#[derive(Subcommand)]
enum KeywordAction {
    List,
    Add {
        query: String,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Remove {
        query: String,
    },
    Enable {
        query: String,
    },
    Disable {
        query: String,
    },
}

#[derive(Subcommand)]
enum HighlightAction {
    List,
    /// Pin the stored ad with this identity or image URL.
    Add {
        identity: String,
    },
    Remove {
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init("info")?;

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Storage initialized ({} backend).", cfg.store.backend);
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Query {
            highlights,
            keyword,
            from,
            to,
            advertisers,
            no_advertisers,
            keyword_filter,
            page,
            page_size,
            json,
        } => {
            let args = query_cmd::QueryArgs {
                highlights,
                keyword,
                from,
                to,
                advertisers,
                no_advertisers,
                keyword_filter,
                page,
                page_size,
                json,
            };
            query_cmd::run_query_cmd(&cfg, &args).await?;
        }
        Commands::Import { paths } => {
            ingest::run_import(&cfg, &paths).await?;
        }
        Commands::Keywords { action } => match action {
            KeywordAction::List => keywords::run_list(&cfg).await?,
            KeywordAction::Add {
                query,
                country,
                limit,
            } => keywords::run_add(&cfg, &query, country.as_deref(), limit).await?,
            KeywordAction::Remove { query } => keywords::run_remove(&cfg, &query).await?,
            KeywordAction::Enable { query } => {
                keywords::run_set_enabled(&cfg, &query, true).await?
            }
            KeywordAction::Disable { query } => {
                keywords::run_set_enabled(&cfg, &query, false).await?
            }
        },
        Commands::Highlight { action } => match action {
            HighlightAction::List => highlights::run_list(&cfg).await?,
            HighlightAction::Add { identity } => highlights::run_add(&cfg, &identity).await?,
            HighlightAction::Remove { id } => highlights::run_remove(&cfg, &id).await?,
        },
        Commands::DeleteAd { identity } => {
            let stores = stores::open(&cfg).await?;
            match stores.ads.delete_ad(&identity).await? {
                DeleteOutcome::Deleted(n) => println!("Deleted {} record(s).", n),
                DeleteOutcome::NotFound => println!("No ad with identity: {}", identity),
            }
        }
        Commands::Collect { keyword } => {
            collect::run_collect(&cfg, &keyword).await?;
        }
    }

    Ok(())
}

//! Fire-and-forget collection trigger.
//!
//! Starts the configured collector for one keyword and returns as soon as
//! the process is spawned. Results show up later as new batches.

use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use tokio::process::Command;

use crate::config::Config;

/// Spawn `collector.command` with `keyword` appended. Returns the child's pid
/// when the platform reports one.
pub fn trigger(config: &Config, keyword: &str) -> Result<Option<u32>> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        bail!("keyword must not be empty");
    }
    let collector = config
        .collector
        .as_ref()
        .ok_or_else(|| anyhow!("no [collector] command configured"))?;
    let (program, args) = collector
        .command
        .split_first()
        .ok_or_else(|| anyhow!("collector.command must name a program"))?;

    let child = Command::new(program)
        .args(args)
        .arg(keyword)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to start collector '{}'", program))?;

    let pid = child.id();
    tracing::info!(keyword, pid = ?pid, "collection started");
    Ok(pid)
}

pub async fn run_collect(config: &Config, keyword: &str) -> Result<()> {
    trigger(config, keyword)?;
    println!("Collection started for '{}'.", keyword.trim());
    Ok(())
}

// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Git filter driver commands
//!
//! Standard output of all three commands belongs to Git; diagnostics go
//! through tracing to stderr.

use crate::repo::LfsdRepo;
use anyhow::{Context, Result};
use clap::Args;
use lfsd_git::{FilterDriver, FilterHandler, FilterProcess};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::error;

async fn driver() -> Result<FilterDriver> {
    let repo = LfsdRepo::open().await?;
    Ok(FilterDriver::new(Arc::new(repo.open_store()?)))
}

async fn read_stdin() -> Result<Vec<u8>> {
    let mut content = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut content)
        .await
        .context("Failed to read stdin")?;
    Ok(content)
}

async fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(bytes).await?;
    stdout.flush().await?;
    Ok(())
}

/// Long-running filter process (`filter.lfsd.process`)
#[derive(Debug, Args)]
pub struct FilterProcessCmd {}

impl FilterProcessCmd {
    pub async fn execute(self) -> Result<()> {
        let process = FilterProcess::new(driver().await?);
        match process.run(tokio::io::stdin(), tokio::io::stdout()).await {
            Ok(_) => Ok(()),
            Err(e) => {
                error!(error = %e, "filter process aborted");
                Err(e).context("Filter process failed")
            }
        }
    }
}

/// Clean filter: file content on stdin, pointer on stdout (git add)
#[derive(Debug, Args)]
pub struct CleanCmd {
    /// Path of the file being cleaned, relative to the working tree
    #[arg(value_name = "FILE")]
    pub path: String,
}

impl CleanCmd {
    pub async fn execute(self) -> Result<()> {
        let driver = driver().await?;
        let content = read_stdin().await?;
        let pointer = driver
            .clean(&content, &self.path)
            .await
            .with_context(|| format!("Clean filter failed for {}", self.path))?;
        write_stdout(&pointer).await
    }
}

/// Smudge filter: pointer on stdin, file content on stdout (git checkout)
#[derive(Debug, Args)]
pub struct SmudgeCmd {
    /// Path of the file being smudged, relative to the working tree
    #[arg(value_name = "FILE")]
    pub path: String,
}

impl SmudgeCmd {
    pub async fn execute(self) -> Result<()> {
        let driver = driver().await?;
        let pointer = read_stdin().await?;
        let content = driver
            .smudge(&pointer, &self.path)
            .await
            .with_context(|| format!("Smudge filter failed for {}", self.path))?;
        write_stdout(&content).await
    }
}

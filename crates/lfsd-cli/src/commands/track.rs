// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Track/untrack file patterns with lfsd

use crate::output;
use crate::repo::LfsdRepo;
use anyhow::Result;
use clap::Args;
use console::style;
use lfsd_git::attributes;

#[derive(Debug, Args)]
pub struct TrackCmd {
    /// File patterns to track (e.g. "*.psd"); lists tracked patterns when omitted
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,
}

impl TrackCmd {
    pub async fn execute(self) -> Result<()> {
        let repo = LfsdRepo::open().await?;
        let root = repo.git.work_dir()?;

        if self.patterns.is_empty() {
            let tracked = attributes::list_tracked(root)?;
            if tracked.is_empty() {
                output::info("No tracked patterns found");
                println!("  Use 'git lfsd track <PATTERN>' to start tracking files");
                return Ok(());
            }
            println!("Listing tracked patterns");
            for (pattern, file) in tracked {
                println!("    {} ({})", style(pattern).yellow(), file.display());
            }
            return Ok(());
        }

        for pattern in &self.patterns {
            if attributes::track(root, pattern)? {
                output::success(&format!("Tracking \"{}\"", style(pattern).yellow()));
            } else {
                output::info(&format!("\"{}\" already supported", pattern));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct UntrackCmd {
    /// File patterns to stop tracking
    #[arg(value_name = "PATTERN", required = true)]
    pub patterns: Vec<String>,
}

impl UntrackCmd {
    pub async fn execute(self) -> Result<()> {
        let repo = LfsdRepo::open().await?;
        let root = repo.git.work_dir()?;

        for pattern in &self.patterns {
            if attributes::untrack(root, pattern)? {
                output::success(&format!("Untracking \"{}\"", style(pattern).yellow()));
            } else {
                output::info(&format!("\"{}\" was not tracked", pattern));
            }
        }
        Ok(())
    }
}

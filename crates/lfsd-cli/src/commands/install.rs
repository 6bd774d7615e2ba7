// LFSD - Git Large File Storage with Deltas
// Copyright (C) 2026 LFSD Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Install or remove the lfsd filter driver in Git configuration

use crate::output;
use crate::repo::LfsdRepo;
use anyhow::Result;
use clap::Args;
use lfsd_config::DeltaBackend;
use lfsd_git::repo::{
    filter_config_entries, install_filter_global, uninstall_filter_global,
};
use lfsd_store::XDeltaCodec;

/// Program name written into `filter.lfsd.*`
pub const PROGRAM: &str = "git-lfsd";

#[derive(Debug, Args)]
pub struct InstallCmd {
    /// Install in the global Git config instead of the current repository
    #[arg(short, long)]
    pub global: bool,
}

impl InstallCmd {
    pub async fn execute(self) -> Result<()> {
        if self.global {
            install_filter_global(PROGRAM)?;
            output::success("Installed lfsd filter driver globally");
        } else {
            let repo = LfsdRepo::open().await?;
            repo.git.install_filter(PROGRAM)?;
            output::success("Installed lfsd filter driver");
            warn_if_codec_missing(&repo).await;
        }

        for (key, value) in filter_config_entries(PROGRAM) {
            output::detail(&key, &value);
        }
        println!();
        println!("Use 'git lfsd track <PATTERN>' to choose which files to manage");
        Ok(())
    }
}

async fn warn_if_codec_missing(repo: &LfsdRepo) {
    let delta = &repo.config.delta;
    if delta.backend != DeltaBackend::Xdelta3 {
        return;
    }
    if let Err(e) = XDeltaCodec::new(&delta.program).check_version().await {
        output::warning(&format!(
            "{} (in {})",
            e,
            lfsd_config::Config::path_for(repo.git.git_dir()).display()
        ));
    }
}

#[derive(Debug, Args)]
pub struct UninstallCmd {
    /// Remove from the global Git config instead of the current repository
    #[arg(short, long)]
    pub global: bool,
}

impl UninstallCmd {
    pub async fn execute(self) -> Result<()> {
        if self.global {
            uninstall_filter_global()?;
            output::success("Removed lfsd filter driver from global config");
        } else {
            LfsdRepo::open().await?.git.uninstall_filter()?;
            output::success("Removed lfsd filter driver");
        }
        Ok(())
    }
}

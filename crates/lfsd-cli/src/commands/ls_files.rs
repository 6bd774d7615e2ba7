// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! List lfsd-tracked files of a revision

use crate::output;
use crate::repo::LfsdRepo;
use anyhow::{bail, Result};
use clap::Args;
use lfsd_git::{AttributesMatcher, Pointer, RevListEntry};
use tracing::debug;

#[derive(Debug, Args)]
pub struct LsFilesCmd {
    /// Revision to list (default HEAD); with two, objects in the second but not the first
    #[arg(value_name = "REF", num_args = 0..=2)]
    pub refs: Vec<String>,

    /// Show the entire 64 character oid instead of the first 10
    #[arg(short, long)]
    pub long: bool,

    /// Show the size of each object
    #[arg(short, long)]
    pub size: bool,

    /// Show everything known about each file
    #[arg(short, long)]
    pub debug: bool,

    /// Inspect the full history instead of a single tree
    #[arg(short, long)]
    pub all: bool,

    /// Show only file names
    #[arg(short, long)]
    pub name_only: bool,
}

impl LsFilesCmd {
    pub async fn execute(self) -> Result<()> {
        let repo = LfsdRepo::open().await?;
        let store = repo.open_store()?;
        let matcher = AttributesMatcher::load(repo.git.work_dir()?)?;

        let entries = self.entries(&repo)?;
        for entry in entries {
            let Some(path) = entry.path.as_deref() else {
                continue;
            };
            if !matcher.matches(path) {
                continue;
            }
            let pointer = match Pointer::parse(&repo.git.cat_file(entry.sha)?) {
                Ok(pointer) => pointer,
                Err(e) => {
                    debug!(path, error = %e, "tracked path is not a pointer");
                    continue;
                }
            };
            let present = store.exists(&pointer.oid).await;

            if self.debug {
                output::detail("filepath", path);
                output::detail("size", &pointer.size.to_string());
                output::detail("download", &present.to_string());
                output::detail("oid", &format!("sha256 {}", pointer.oid));
                output::detail("version", &pointer.version);
                println!();
            } else if self.name_only {
                println!("{}", path);
            } else {
                let hex = pointer.oid.to_hex();
                let oid = if self.long { &hex[..] } else { &hex[..10] };
                let marker = if present { '*' } else { '-' };
                let size = if self.size {
                    format!(" ({})", output::format_bytes(pointer.size))
                } else {
                    String::new()
                };
                println!("{} {} {}{}", oid, marker, path, size);
            }
        }
        Ok(())
    }

    fn entries(&self, repo: &LfsdRepo) -> Result<Vec<RevListEntry>> {
        let git = &repo.git;
        match self.refs.as_slice() {
            [] => self.objects(repo, &[git.resolve("HEAD")?], &[]),
            [rev] => self.objects(repo, &[git.resolve(rev)?], &[]),
            [base, rev] => self.objects(repo, &[git.resolve(rev)?], &[git.resolve(base)?]),
            _ => bail!("at most two refs may be given, received {}", self.refs.len()),
        }
    }

    fn objects(
        &self,
        repo: &LfsdRepo,
        include: &[git2::Oid],
        exclude: &[git2::Oid],
    ) -> Result<Vec<RevListEntry>> {
        if self.all || !exclude.is_empty() {
            return Ok(repo.git.rev_list_objects(include, exclude)?);
        }
        let mut entries = Vec::new();
        for commit in include {
            entries.extend(repo.git.tree_objects(*commit)?);
        }
        Ok(entries)
    }
}

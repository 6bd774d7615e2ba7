// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Upload objects referenced by pushed commits (Git `pre-push` hook)
//!
//! Git feeds one line per ref being pushed:
//!
//! ```text
//! <local ref> <local sha> <remote ref> <remote sha>
//! ```
//!
//! A delta object is useless without its base, so every object is uploaded
//! together with the chain leading to its whole anchor.

use crate::output;
use crate::progress::ProgressTracker;
use crate::repo::LfsdRepo;
use anyhow::{bail, Context, Result};
use clap::Args;
use lfsd_git::{AttributesMatcher, Pointer};
use lfsd_store::{ObjectStore, Oid};
use std::collections::{HashMap, HashSet};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

#[derive(Debug, Args)]
pub struct PrePushCmd {
    /// Name of the remote being pushed to
    #[arg(value_name = "REMOTE")]
    pub remote: Option<String>,

    /// URL of the remote being pushed to
    #[arg(value_name = "URL")]
    pub url: Option<String>,
}

/// One line of pre-push input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdate {
    pub local_ref: String,
    pub local_sha: git2::Oid,
    pub remote_ref: String,
    pub remote_sha: git2::Oid,
}

/// Parse the hook's stdin, dropping deletions (zero local sha)
pub fn parse_ref_updates(input: &str) -> Result<Vec<RefUpdate>> {
    let mut updates = Vec::new();
    for line in input.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let &[local_ref, local_sha, remote_ref, remote_sha] = fields.as_slice() else {
            bail!("malformed pre-push line: '{}'", line);
        };
        let update = RefUpdate {
            local_ref: local_ref.to_string(),
            local_sha: git2::Oid::from_str(local_sha)
                .with_context(|| format!("bad local sha in '{}'", line))?,
            remote_ref: remote_ref.to_string(),
            remote_sha: git2::Oid::from_str(remote_sha)
                .with_context(|| format!("bad remote sha in '{}'", line))?,
        };
        if update.local_sha.is_zero() {
            debug!(local_ref = %update.local_ref, "skipping deletion");
            continue;
        }
        updates.push(update);
    }
    Ok(updates)
}

impl PrePushCmd {
    pub async fn execute(self, quiet: bool) -> Result<()> {
        let Some(remote_name) = self.remote.as_deref() else {
            bail!("This should be run through Git's pre-push hook");
        };
        debug!(remote = remote_name, url = ?self.url, "pre-push");

        let mut input = String::new();
        tokio::io::stdin()
            .read_to_string(&mut input)
            .await
            .context("Failed to read stdin")?;
        let updates = parse_ref_updates(&input)?;
        if updates.is_empty() {
            return Ok(());
        }

        let repo = LfsdRepo::open().await?;
        let store = repo.open_store_with(None)?;

        let pointers = collect_pointers(&repo, &updates)?;
        if pointers.is_empty() {
            return Ok(());
        }
        output::info(&format!("LFSD: objects to upload: {}", pointers.len()));

        let candidates = expand_chains(&store, &pointers).await?;
        let remote = repo.remote()?;
        let missing = remote.check_not_exist(&candidates).await?;
        if missing.is_empty() {
            output::success("LFSD: all objects have already been uploaded");
            return Ok(());
        }

        let names: HashMap<Oid, &str> = pointers
            .iter()
            .map(|(oid, path)| (*oid, path.as_str()))
            .collect();
        let total = missing.len();
        let pb = ProgressTracker::new(quiet).object_bar("LFSD: uploading", total as u64);
        for (i, oid) in missing.iter().enumerate() {
            let label = names.get(oid).copied().unwrap_or("(delta base)");
            pb.set_message(format!("LFSD: uploading {}", label));
            info!(%oid, path = label, "uploading ({}/{})", i + 1, total);
            let raw = store.read_raw(oid).await?;
            remote
                .upload(oid, raw)
                .await
                .with_context(|| format!("Failed to upload {}", oid))?;
            pb.inc(1);
        }
        pb.finish_and_clear();
        output::success(&format!(
            "LFSD: uploaded {} objects",
            ProgressTracker::format_count(total as u64)
        ));
        Ok(())
    }
}

/// Pointer oids (with a path each) reachable from the pushed commits
fn collect_pointers(repo: &LfsdRepo, updates: &[RefUpdate]) -> Result<Vec<(Oid, String)>> {
    let matcher = AttributesMatcher::load(repo.git.work_dir()?)?;
    let mut seen_blobs = HashSet::new();
    let mut seen_oids = HashSet::new();
    let mut pointers = Vec::new();

    for update in updates {
        let exclude: Vec<git2::Oid> = if update.remote_sha.is_zero() {
            Vec::new()
        } else if repo.git.has_commit(update.remote_sha) {
            vec![update.remote_sha]
        } else {
            debug!(remote_sha = %update.remote_sha, "remote tip unknown locally");
            Vec::new()
        };

        debug!(
            local_ref = %update.local_ref,
            remote_ref = %update.remote_ref,
            excluded = exclude.len(),
            "listing pushed objects"
        );
        for entry in repo.git.rev_list_objects(&[update.local_sha], &exclude)? {
            let Some(path) = entry.path else { continue };
            if !matcher.matches(&path) || !seen_blobs.insert(entry.sha) {
                continue;
            }
            match Pointer::parse(&repo.git.cat_file(entry.sha)?) {
                Ok(pointer) => {
                    if seen_oids.insert(pointer.oid) {
                        pointers.push((pointer.oid, path));
                    }
                }
                Err(e) => warn!(path = %path, error = %e, "tracked file is not a pointer"),
            }
        }
    }
    Ok(pointers)
}

/// Every object needed to reconstruct `pointers`, dependants first
async fn expand_chains(store: &ObjectStore, pointers: &[(Oid, String)]) -> Result<Vec<Oid>> {
    let mut seen = HashSet::new();
    let mut oids = Vec::new();
    for (oid, path) in pointers {
        if !store.exists(oid).await {
            warn!(%oid, path = %path, "object not in local cache, skipping");
            continue;
        }
        for link in store.chain(oid).await? {
            if seen.insert(link.oid) {
                oids.push(link.oid);
            }
        }
    }
    Ok(oids)
}

// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Repository access through libgit2
//!
//! Everything git-lfsd needs to know about the surrounding repository:
//! where its directories are, what was committed for a path, which blobs a
//! push sends, and the `filter.lfsd.*` / `lfsd.url` configuration.

use crate::error::{GitError, GitResult};
use crate::filter::FILTER_DRIVER_NAME;
use crate::pointer::Pointer;
use async_trait::async_trait;
use git2::{ErrorCode, ObjectType, Repository, TreeWalkMode, TreeWalkResult};
use lfsd_store::{CommittedHistory, Oid};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Git config key holding the remote server URL
pub const URL_CONFIG_KEY: &str = "lfsd.url";

/// Server used when `lfsd.url` is not set
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// One entry of `rev-list --objects` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevListEntry {
    /// Blob id
    pub sha: git2::Oid,
    /// Path the blob was first seen at
    pub path: Option<String>,
}

/// A Git repository discovered from a working directory
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Find the repository containing `path`
    pub fn discover(path: &Path) -> GitResult<Self> {
        let repo = Repository::discover(path).map_err(|e| {
            GitError::RepositoryNotFound(format!("{}: {}", path.display(), e.message()))
        })?;
        Ok(Self { repo })
    }

    /// The `.git` directory
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Root of the working tree
    pub fn work_dir(&self) -> GitResult<&Path> {
        self.repo.workdir().ok_or_else(|| {
            GitError::RepositoryNotFound(format!(
                "{} is a bare repository",
                self.repo.path().display()
            ))
        })
    }

    /// Underlying libgit2 handle
    pub fn inner(&self) -> &Repository {
        &self.repo
    }

    /// Content of `path` at revision `rev`, or `None` if either does not exist
    pub fn show_file_content(&self, path: &str, rev: &str) -> GitResult<Option<Vec<u8>>> {
        show_file_content(&self.repo, path, rev)
    }

    /// Raw content of a blob
    pub fn cat_file(&self, sha: git2::Oid) -> GitResult<Vec<u8>> {
        Ok(self.repo.find_blob(sha)?.content().to_vec())
    }

    /// Resolve a revision expression to a commit id
    pub fn resolve(&self, rev: &str) -> GitResult<git2::Oid> {
        Ok(self.repo.revparse_single(rev)?.peel_to_commit()?.id())
    }

    /// Blobs reachable from `include` but not from `exclude`
    ///
    /// Each blob is reported once, with the first path it was seen at.
    pub fn rev_list_objects(
        &self,
        include: &[git2::Oid],
        exclude: &[git2::Oid],
    ) -> GitResult<Vec<RevListEntry>> {
        let mut walk = self.repo.revwalk()?;
        for id in include {
            walk.push(*id)?;
        }
        let mut seen = HashSet::new();
        for id in exclude {
            walk.hide(*id)?;
            let tree = self.repo.find_commit(*id)?.tree()?;
            collect_blobs(&tree, &mut seen, &mut Vec::new())?;
        }

        let mut entries = Vec::new();
        for commit_id in walk {
            let tree = self.repo.find_commit(commit_id?)?.tree()?;
            collect_blobs(&tree, &mut seen, &mut entries)?;
        }
        debug!(blobs = entries.len(), "listed objects");
        Ok(entries)
    }

    /// Blobs in the tree of a single commit
    pub fn tree_objects(&self, commit: git2::Oid) -> GitResult<Vec<RevListEntry>> {
        let tree = self.repo.find_commit(commit)?.tree()?;
        let mut entries = Vec::new();
        collect_blobs(&tree, &mut HashSet::new(), &mut entries)?;
        Ok(entries)
    }

    /// Whether a commit exists in the local object database
    pub fn has_commit(&self, sha: git2::Oid) -> bool {
        self.repo.find_commit(sha).is_ok()
    }

    /// Committed-history view of this repository for the object store
    pub fn history(&self) -> GitResult<HeadHistory> {
        Ok(HeadHistory {
            repo: Mutex::new(Repository::open(self.repo.path())?),
        })
    }

    /// Value of a git config key
    pub fn config_get(&self, key: &str) -> GitResult<Option<String>> {
        match self.repo.config()?.get_string(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a key in the repository's own config
    pub fn config_set(&self, key: &str, value: &str) -> GitResult<()> {
        let mut config = self.repo.config()?.open_level(git2::ConfigLevel::Local)?;
        config.set_str(key, value)?;
        Ok(())
    }

    /// Remote server URL from `lfsd.url`, or the default
    pub fn server_url(&self) -> GitResult<String> {
        Ok(self
            .config_get(URL_CONFIG_KEY)?
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()))
    }

    /// Register the lfsd filter in this repository's config
    pub fn install_filter(&self, program: &str) -> GitResult<()> {
        let mut config = self.repo.config()?.open_level(git2::ConfigLevel::Local)?;
        write_filter_config(&mut config, program)?;
        info!("Filter driver installed in {}", self.repo.path().display());
        Ok(())
    }

    /// Remove the lfsd filter from this repository's config
    pub fn uninstall_filter(&self) -> GitResult<()> {
        let mut config = self.repo.config()?.open_level(git2::ConfigLevel::Local)?;
        remove_filter_config(&mut config)
    }
}

/// Register the lfsd filter in the user's global config
pub fn install_filter_global(program: &str) -> GitResult<()> {
    let mut config = global_config()?;
    write_filter_config(&mut config, program)?;
    info!("Filter driver installed globally");
    Ok(())
}

/// Remove the lfsd filter from the user's global config
pub fn uninstall_filter_global() -> GitResult<()> {
    remove_filter_config(&mut global_config()?)
}

/// The four `filter.lfsd.*` entries written by `install`
pub fn filter_config_entries(program: &str) -> [(String, String); 4] {
    let key = |name: &str| format!("filter.{}.{}", FILTER_DRIVER_NAME, name);
    [
        (key("process"), format!("{} filter-process", program)),
        (key("clean"), format!("{} clean %f", program)),
        (key("smudge"), format!("{} smudge %f", program)),
        (key("required"), "true".to_string()),
    ]
}

fn write_filter_config(config: &mut git2::Config, program: &str) -> GitResult<()> {
    for (key, value) in filter_config_entries(program) {
        config.set_str(&key, &value)?;
    }
    Ok(())
}

fn remove_filter_config(config: &mut git2::Config) -> GitResult<()> {
    for (key, _) in filter_config_entries("") {
        match config.remove(&key) {
            Ok(()) => {}
            Err(e) if e.code() == ErrorCode::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn global_config() -> GitResult<git2::Config> {
    let path = match git2::Config::find_global() {
        Ok(path) => path,
        Err(_) => {
            let home = std::env::var_os("HOME").ok_or_else(|| {
                GitError::RepositoryNotFound("cannot locate global git config: HOME is unset".into())
            })?;
            PathBuf::from(home).join(".gitconfig")
        }
    };
    Ok(git2::Config::open(&path)?)
}

fn show_file_content(repo: &Repository, path: &str, rev: &str) -> GitResult<Option<Vec<u8>>> {
    let tree = match repo.revparse_single(rev).and_then(|obj| obj.peel_to_tree()) {
        Ok(tree) => tree,
        Err(e) if matches!(e.code(), ErrorCode::NotFound | ErrorCode::UnbornBranch) => {
            return Ok(None)
        }
        Err(e) => return Err(e.into()),
    };

    let entry = match tree.get_path(Path::new(path)) {
        Ok(entry) => entry,
        Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if entry.kind() != Some(ObjectType::Blob) {
        return Ok(None);
    }
    Ok(Some(repo.find_blob(entry.id())?.content().to_vec()))
}

fn collect_blobs(
    tree: &git2::Tree<'_>,
    seen: &mut HashSet<git2::Oid>,
    out: &mut Vec<RevListEntry>,
) -> GitResult<()> {
    tree.walk(TreeWalkMode::PreOrder, |dir, entry| {
        if entry.kind() == Some(ObjectType::Blob) && seen.insert(entry.id()) {
            out.push(RevListEntry {
                sha: entry.id(),
                path: entry.name().map(|name| format!("{}{}", dir, name)),
            });
        }
        TreeWalkResult::Ok
    })?;
    Ok(())
}

/// Reads the pointer committed at `HEAD` for a path
pub struct HeadHistory {
    repo: Mutex<Repository>,
}

impl HeadHistory {
    /// History for the repository at `git_dir`
    pub fn open(git_dir: &Path) -> GitResult<Self> {
        Ok(Self {
            repo: Mutex::new(Repository::open(git_dir)?),
        })
    }
}

#[async_trait]
impl CommittedHistory for HeadHistory {
    async fn committed_oid(&self, path: &str) -> anyhow::Result<Option<Oid>> {
        let repo = self
            .repo
            .lock()
            .map_err(|_| anyhow::anyhow!("repository lock poisoned"))?;
        let Some(content) = show_file_content(&repo, path, "HEAD")? else {
            return Ok(None);
        };
        // A committed blob that is not a pointer predates tracking
        Ok(Pointer::parse(&content).ok().map(|pointer| pointer.oid))
    }
}

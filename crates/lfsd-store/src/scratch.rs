// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Per-call scratch directories
//!
//! The external delta codec only works on files, so every `store` and
//! `reconstruct` call gets its own directory under the scratch root. The
//! directory is removed when the [`ScratchDir`] is dropped, on success and on
//! error alike.

use crate::error::StoreResult;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;

/// A uniquely named directory that deletes itself on drop
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a fresh directory under `root`, named after `scope`
    pub fn new(root: &Path, scope: &str) -> StoreResult<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", scope))
            .tempdir_in(root)?;
        Ok(Self { dir })
    }

    /// Directory path
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `bytes` to `name` inside the directory and return the full path
    pub async fn write(&self, name: &str, bytes: &[u8]) -> StoreResult<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, bytes).await?;
        Ok(path)
    }
}

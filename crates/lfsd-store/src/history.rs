//! Committed-history lookup
//!
//! Before a new version is stored, the store asks which OID the path had at
//! `HEAD`. That version is the one demoted to a delta against the new one.

use crate::oid::Oid;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Source of "which OID was committed for this path"
#[async_trait]
pub trait CommittedHistory: Send + Sync {
    /// OID recorded for `path` in the last commit, if it was tracked there
    async fn committed_oid(&self, path: &str) -> anyhow::Result<Option<Oid>>;
}

/// History for a repository with no commits
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

#[async_trait]
impl CommittedHistory for NoHistory {
    async fn committed_oid(&self, _path: &str) -> anyhow::Result<Option<Oid>> {
        Ok(None)
    }
}

/// In-memory history, mostly useful for tests and tooling
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Mutex<HashMap<String, Oid>>,
}

impl MemoryHistory {
    /// Empty history: no path has a committed version
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `oid` as the committed version of `path`
    pub fn set(&self, path: impl Into<String>, oid: Oid) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(path.into(), oid);
        }
    }
}

#[async_trait]
impl CommittedHistory for MemoryHistory {
    async fn committed_oid(&self, path: &str) -> anyhow::Result<Option<Oid>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("history lock poisoned"))?;
        Ok(entries.get(path).copied())
    }
}

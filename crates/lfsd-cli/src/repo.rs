// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Repository discovery, configuration and object store wiring shared by
//! every command.

use anyhow::{Context, Result};
use lfsd_config::{Config, DeltaBackend};
use lfsd_git::{GitRepository, DEFAULT_SERVER_URL, URL_CONFIG_KEY};
use lfsd_remote::HttpRemote;
use lfsd_store::{DeltaCodec, ObjectStore, VcdiffCodec, XDeltaCodec, XDeltaOptions};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The repository a command runs in, with its loaded configuration
pub struct LfsdRepo {
    pub git: GitRepository,
    pub config: Config,
}

impl LfsdRepo {
    /// Discover the repository containing the current directory
    pub async fn open() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::open_at(&cwd).await
    }

    pub async fn open_at(path: &Path) -> Result<Self> {
        let git = GitRepository::discover(path)?;
        let config = Config::load(git.git_dir())
            .await
            .with_context(|| format!("Failed to load {}", Config::path_for(git.git_dir()).display()))?;
        debug!(git_dir = %git.git_dir().display(), "opened repository");
        Ok(Self { git, config })
    }

    /// Delta codec selected by `[delta]`
    pub fn codec(&self) -> Arc<dyn DeltaCodec> {
        let delta = &self.config.delta;
        match delta.backend {
            DeltaBackend::Xdelta3 => Arc::new(XDeltaCodec::new(&delta.program).with_options(
                XDeltaOptions {
                    compression_level: delta.compression_level,
                    source_window_size: delta.source_window_size,
                    disable_secondary: delta.disable_secondary,
                },
            )),
            DeltaBackend::Builtin => Arc::new(VcdiffCodec::new(delta.compression_level)),
        }
    }

    /// Object store over this repository's cache
    ///
    /// Committed versions come from `HEAD`. When a remote is configured,
    /// objects missing from the cache are fetched from it.
    pub fn open_store(&self) -> Result<ObjectStore> {
        let fetcher = match self.configured_url()? {
            Some(url) => Some(self.remote_for(&url)?),
            None => None,
        };
        self.open_store_with(fetcher)
    }

    /// Object store fetching missing objects from `remote`, if given
    pub fn open_store_with(&self, remote: Option<HttpRemote>) -> Result<ObjectStore> {
        let git_dir = self.git.git_dir();
        let mut store = ObjectStore::new(
            self.config.cache_dir(git_dir),
            self.config.scratch_dir(git_dir),
            self.codec(),
        )
        .with_history(Arc::new(self.git.history()?))
        .with_max_chain_depth(self.config.store.max_chain_depth)
        .with_path_serialization(self.config.store.serialize_paths);

        if let Some(remote) = remote {
            store = store.with_fetcher(Arc::new(remote));
        }
        Ok(store)
    }

    /// Remote URL from `[remote] url`, then `lfsd.url`
    pub fn configured_url(&self) -> Result<Option<String>> {
        if let Some(url) = self.config.remote.url() {
            return Ok(Some(url.to_string()));
        }
        Ok(self.git.config_get(URL_CONFIG_KEY)?)
    }

    /// Remote used by commands that always talk to a server
    pub fn remote(&self) -> Result<HttpRemote> {
        let url = self
            .configured_url()?
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        self.remote_for(&url)
    }

    fn remote_for(&self, url: &str) -> Result<HttpRemote> {
        let timeout = Duration::from_secs(self.config.remote.timeout_secs);
        Ok(HttpRemote::new(url, timeout)?)
    }
}

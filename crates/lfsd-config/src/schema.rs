//! Configuration schema
//!
//! Every section is `#[serde(default)]`, so a partial (or missing) file
//! yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory under the Git directory that holds everything git-lfsd owns
pub const LFSD_DIR: &str = "lfsd";

/// Name of the configuration file inside [`LFSD_DIR`]
pub const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Object store settings
    pub store: StoreConfig,

    /// Delta codec settings
    pub delta: DeltaConfig,

    /// Remote blob server settings
    pub remote: RemoteConfig,

    /// Logging settings
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Location of the configuration file for a repository's Git directory
    pub fn path_for(git_dir: impl AsRef<Path>) -> PathBuf {
        git_dir.as_ref().join(LFSD_DIR).join(CONFIG_FILE)
    }

    /// Load config for a repository, falling back to defaults when the file
    /// does not exist. Environment overrides are applied in both cases.
    pub async fn load(git_dir: impl AsRef<Path>) -> crate::ConfigResult<Self> {
        let loader = crate::ConfigLoader::new();
        let path = Self::path_for(git_dir);

        let mut config = if path.exists() {
            loader.load_file(&path).await?
        } else {
            Self::default()
        };
        loader.apply_env_overrides(&mut config)?;
        crate::Validator::validate(&config)?;
        Ok(config)
    }

    /// Save config under a repository's Git directory
    pub fn save(&self, git_dir: impl AsRef<Path>) -> crate::ConfigResult<()> {
        let path = Self::path_for(git_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Object cache root, resolving an empty `cache_dir` against the Git directory
    pub fn cache_dir(&self, git_dir: impl AsRef<Path>) -> PathBuf {
        if self.store.cache_dir.is_empty() {
            git_dir.as_ref().join(LFSD_DIR).join("objects")
        } else {
            PathBuf::from(&self.store.cache_dir)
        }
    }

    /// Scratch area used to hand buffers to the delta codec
    pub fn scratch_dir(&self, git_dir: impl AsRef<Path>) -> PathBuf {
        git_dir.as_ref().join(LFSD_DIR).join("tmp")
    }
}

/// Object store settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Cache root; empty means `<git-dir>/lfsd/objects`
    pub cache_dir: String,

    /// Maximum number of `sourceOid` hops followed by a reconstruction
    pub max_chain_depth: usize,

    /// Serialize concurrent `store` calls touching the same path
    pub serialize_paths: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_dir: String::new(),
            max_chain_depth: default_max_chain_depth(),
            serialize_paths: true,
        }
    }
}

/// Which delta codec implementation to use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeltaBackend {
    /// External `xdelta3` executable
    #[default]
    Xdelta3,

    /// In-process prefix/suffix codec
    Builtin,
}

impl std::str::FromStr for DeltaBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xdelta3" => Ok(DeltaBackend::Xdelta3),
            "builtin" => Ok(DeltaBackend::Builtin),
            other => Err(format!("unknown delta backend '{}'", other)),
        }
    }
}

/// Delta codec settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeltaConfig {
    /// Codec implementation
    pub backend: DeltaBackend,

    /// Executable used by the `xdelta3` backend
    pub program: String,

    /// Compression level, 0 through 9
    pub compression_level: u32,

    /// Source window size in bytes; 0 keeps the codec default
    pub source_window_size: u64,

    /// Disable secondary compression of the delta
    pub disable_secondary: bool,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            backend: DeltaBackend::Xdelta3,
            program: "xdelta3".to_string(),
            compression_level: 9,
            source_window_size: 0,
            disable_secondary: false,
        }
    }
}

/// Remote blob server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL; empty means "read `lfsd.url` from git config"
    pub url: String,

    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: 60,
        }
    }
}

impl RemoteConfig {
    /// Configured URL, if any
    pub fn url(&self) -> Option<&str> {
        let url = self.url.trim();
        (!url.is_empty()).then_some(url)
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Level filter passed to the tracing subscriber
    pub log_level: String,

    /// pretty, compact or json
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_format: "compact".to_string(),
        }
    }
}

fn default_max_chain_depth() -> usize {
    4096
}

// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Loading configuration from a repository's Git directory

#![allow(clippy::unwrap_used)]

use lfsd_config::{Config, ConfigError, ConfigLoader, DeltaBackend};
use tempfile::TempDir;

#[tokio::test]
async fn test_missing_file_yields_defaults() {
    let git_dir = TempDir::new().unwrap();
    let config = Config::load(git_dir.path()).await.unwrap();

    assert_eq!(config.store.max_chain_depth, 4096);
    assert_eq!(
        config.cache_dir(git_dir.path()),
        git_dir.path().join("lfsd").join("objects")
    );
    assert_eq!(
        config.scratch_dir(git_dir.path()),
        git_dir.path().join("lfsd").join("tmp")
    );
}

#[tokio::test]
async fn test_save_then_load() {
    let git_dir = TempDir::new().unwrap();

    let mut config = Config::default();
    config.delta.backend = DeltaBackend::Builtin;
    config.remote.url = "http://localhost:3000".to_string();
    config.save(git_dir.path()).unwrap();

    let loaded = ConfigLoader::new()
        .load_file(Config::path_for(git_dir.path()))
        .await
        .unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.remote.url(), Some("http://localhost:3000"));
}

#[tokio::test]
async fn test_explicit_missing_file_is_error() {
    let git_dir = TempDir::new().unwrap();
    let result = ConfigLoader::new()
        .load_file(git_dir.path().join("nope.toml"))
        .await;
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

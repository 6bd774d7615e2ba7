// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Blob-server client for git-lfsd
//!
//! Objects leave the local cache on `pre-push` and come back on smudge when
//! a delta chain reaches an object that was never fetched. [`HttpRemote`]
//! implements [`lfsd_store::ObjectFetcher`] for the latter.

pub mod client;
pub mod error;

pub use client::{server_path, HttpRemote};
pub use error::{RemoteError, RemoteResult};

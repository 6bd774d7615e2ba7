// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Git integration for git-lfsd
//!
//! This crate connects the object store to Git:
//!
//! - **Pointers**: the stubs committed in place of tracked files
//! - **Filter process**: Git's long-running pkt-line `filter-process`
//!   protocol, split into framing ([`pktline`]), a pure state machine
//!   ([`protocol`]) and an async driver ([`process`])
//! - **Clean/smudge bridge**: [`FilterDriver`]
//! - **Repository access**: committed history, `rev-list --objects`,
//!   filter installation and `.gitattributes` maintenance
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lfsd_git::{FilterDriver, FilterProcess, GitRepository};
//! use lfsd_store::{ObjectStore, VcdiffCodec};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = GitRepository::discover(Path::new("."))?;
//! let store = ObjectStore::new(
//!     repo.git_dir().join("lfsd/objects"),
//!     repo.git_dir().join("lfsd/tmp"),
//!     Arc::new(VcdiffCodec::default()),
//! )
//! .with_history(Arc::new(repo.history()?));
//!
//! let process = FilterProcess::new(FilterDriver::new(Arc::new(store)));
//! process.run(tokio::io::stdin(), tokio::io::stdout()).await?;
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod error;
pub mod filter;
pub mod pktline;
pub mod pointer;
pub mod process;
pub mod protocol;
pub mod repo;

pub use attributes::AttributesMatcher;
pub use error::{GitError, GitResult};
pub use filter::{FilterDriver, FilterHandler, FILTER_DRIVER_NAME};
pub use pktline::{Packet, PacketDecoder, MAX_PACKET_CONTENT_SIZE};
pub use pointer::{Pointer, POINTER_VERSION};
pub use process::{FilterProcess, SessionStats};
pub use protocol::{Effect, FilterCommand, Request, State};
pub use repo::{GitRepository, HeadHistory, RevListEntry, DEFAULT_SERVER_URL, URL_CONFIG_KEY};

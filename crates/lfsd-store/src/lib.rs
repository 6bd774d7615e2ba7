// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Delta-chained content-addressed object store
//!
//! Each version of a tracked file is stored under the SHA-256 of its content.
//! The newest version of a path is kept whole; older versions are rewritten
//! as backward deltas against their successor whenever that saves space.
//!
//! # Example
//!
//! ```no_run
//! use lfsd_store::{ObjectStore, VcdiffCodec};
//! use std::sync::Arc;
//!
//! # async fn example() -> lfsd_store::StoreResult<()> {
//! let store = ObjectStore::new(".git/lfsd/objects", ".git/lfsd/tmp", Arc::new(VcdiffCodec::default()));
//! let stored = store.store(b"hello world", "a.txt").await?;
//! assert_eq!(store.reconstruct(&stored.oid).await?, b"hello world");
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod fetch;
pub mod history;
pub mod object;
pub mod oid;
pub mod scratch;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use codec::{DeltaCodec, VcdiffCodec, XDeltaCodec, XDeltaOptions};
pub use error::{StoreError, StoreResult};
pub use fetch::ObjectFetcher;
pub use history::{CommittedHistory, MemoryHistory, NoHistory};
pub use object::{ContentObject, ObjectEncoding, HEADER_LEN};
pub use oid::{is_oid_hex, Oid};
pub use scratch::ScratchDir;
pub use store::{ChainLink, LocalObject, ObjectStore, DEFAULT_MAX_CHAIN_DEPTH, MIN_PREFIX_LEN};

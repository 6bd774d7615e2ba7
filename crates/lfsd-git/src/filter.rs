// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Clean/smudge bridge
//!
//! - **Clean**: file content → object store → pointer text (`git add`)
//! - **Smudge**: pointer text → object store → file content (`git checkout`)
//!
//! The same [`FilterDriver`] serves both the long-running filter process and
//! the one-shot `clean`/`smudge` commands.

use crate::error::GitResult;
use crate::pointer::Pointer;
use async_trait::async_trait;
use lfsd_store::ObjectStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Filter driver name used in Git configuration and `.gitattributes`
pub const FILTER_DRIVER_NAME: &str = "lfsd";

/// Operations the filter-process engine dispatches to
#[async_trait]
pub trait FilterHandler: Send + Sync {
    /// Turn file content into pointer text
    async fn clean(&self, content: &[u8], pathname: &str) -> GitResult<Vec<u8>>;

    /// Turn pointer text back into file content
    async fn smudge(&self, pointer: &[u8], pathname: &str) -> GitResult<Vec<u8>>;
}

/// Bridges Git's filters to the object store
#[derive(Debug, Clone)]
pub struct FilterDriver {
    store: Arc<ObjectStore>,
}

impl FilterDriver {
    /// Creates a new filter driver over `store`
    pub fn new(store: Arc<ObjectStore>) -> Self {
        Self { store }
    }

    /// The object store behind this driver
    pub fn store(&self) -> &ObjectStore {
        &self.store
    }
}

#[async_trait]
impl FilterHandler for FilterDriver {
    async fn clean(&self, content: &[u8], pathname: &str) -> GitResult<Vec<u8>> {
        let object = self.store.store(content, pathname).await?;
        info!(
            path = pathname,
            oid = %object.oid,
            size = object.size,
            "clean: content → pointer"
        );
        Ok(Pointer::generate(&object).into_bytes())
    }

    async fn smudge(&self, pointer: &[u8], pathname: &str) -> GitResult<Vec<u8>> {
        let pointer = Pointer::parse(pointer)?;
        debug!(path = pathname, oid = %pointer.oid, size = pointer.size, "smudge: pointer → content");
        Ok(self.store.reconstruct(&pointer.oid).await?)
    }
}

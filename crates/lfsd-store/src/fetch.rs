//! Remote fallback for objects missing from the local cache

use crate::oid::Oid;
use async_trait::async_trait;

/// Fetches raw object files (header included) from somewhere else
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    /// Raw bytes of `oid`, or `None` if the other side does not have it
    async fn fetch(&self, oid: &Oid) -> anyhow::Result<Option<Vec<u8>>>;
}

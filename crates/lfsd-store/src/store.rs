// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Delta-chained object store
//!
//! Objects live under the cache root in a sharded layout:
//!
//! ```text
//! objects/
//! ├── b9/
//! │   └── 4d/
//! │       └── b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9
//! ```
//!
//! The newest version of a path is always stored whole. When a new version
//! is stored, the version committed at `HEAD` for that path is rewritten as a
//! delta against the new one if that makes it smaller. Older versions are
//! reconstructed by following `sourceOid` links up to a whole object and
//! replaying the deltas back down.
//!
//! Every write goes to a temporary file in the destination shard and is then
//! renamed over the final name, so readers never observe a half-written
//! object.

use crate::codec::DeltaCodec;
use crate::error::{StoreError, StoreResult};
use crate::fetch::ObjectFetcher;
use crate::history::{CommittedHistory, NoHistory};
use crate::object::{ContentObject, ObjectEncoding};
use crate::oid::{Oid, OID_HEX_LEN};
use crate::scratch::ScratchDir;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument, warn};

/// Default bound on `sourceOid` hops during reconstruction
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 4096;

/// Shortest prefix accepted by [`ObjectStore::find_by_prefix`]
pub const MIN_PREFIX_LEN: usize = 6;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Result of storing one version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalObject {
    /// Digest of the stored content
    pub oid: Oid,
    /// Length of the stored content in bytes
    pub size: u64,
    /// Where the object file lives
    pub path: PathBuf,
}

/// One `sourceOid` hop as read from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    /// Object at this position in the chain
    pub oid: Oid,
    /// Its header's `sourceOid`
    pub source: Oid,
    /// Payload length on disk
    pub payload_len: u64,
}

/// Per-path mutexes serializing `store` calls
///
/// An entry lives only while some call holds or waits for it.
#[derive(Debug, Default)]
struct PathLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl PathLocks {
    async fn acquire(&self, path: &str) -> PathGuard<'_> {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_string())
            .or_default()
            .clone();
        PathGuard {
            locks: self,
            path: path.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    fn release(&self, path: &str) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Waiters hold a clone, so a count of one means nobody else needs it
        if locks.get(path).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(path);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Held for the duration of one `store` call
struct PathGuard<'a> {
    locks: &'a PathLocks,
    path: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        // The owned guard keeps its own reference to the mutex
        self.guard.take();
        self.locks.release(&self.path);
    }
}

/// Content-addressed store of whole and delta-encoded objects
pub struct ObjectStore {
    root: PathBuf,
    scratch_root: PathBuf,
    codec: Arc<dyn DeltaCodec>,
    history: Arc<dyn CommittedHistory>,
    fetcher: Option<Arc<dyn ObjectFetcher>>,
    max_chain_depth: usize,
    path_locks: Option<PathLocks>,
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("root", &self.root)
            .field("scratch_root", &self.scratch_root)
            .field("codec", &self.codec.name())
            .field("remote_fallback", &self.fetcher.is_some())
            .field("max_chain_depth", &self.max_chain_depth)
            .field("serialize_paths", &self.path_locks.is_some())
            .finish()
    }
}

impl ObjectStore {
    /// Store rooted at `root`, using `scratch_root` for codec temporaries
    ///
    /// Without [`with_history`](Self::with_history) every version is stored
    /// as if it were the first one for its path.
    pub fn new(
        root: impl Into<PathBuf>,
        scratch_root: impl Into<PathBuf>,
        codec: Arc<dyn DeltaCodec>,
    ) -> Self {
        Self {
            root: root.into(),
            scratch_root: scratch_root.into(),
            codec,
            history: Arc::new(NoHistory),
            fetcher: None,
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            path_locks: Some(PathLocks::default()),
        }
    }

    /// Use `history` to find the committed version of each path
    pub fn with_history(mut self, history: Arc<dyn CommittedHistory>) -> Self {
        self.history = history;
        self
    }

    /// Fetch objects missing from the cache through `fetcher`
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ObjectFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Bound on `sourceOid` hops before a chain counts as corrupt (at least 1)
    pub fn with_max_chain_depth(mut self, depth: usize) -> Self {
        self.max_chain_depth = depth.max(1);
        self
    }

    /// Whether concurrent `store` calls for one path wait for each other
    pub fn with_path_serialization(mut self, enabled: bool) -> Self {
        self.path_locks = enabled.then(PathLocks::default);
        self
    }

    /// Cache root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of `oid`'s file, whether or not it exists
    pub fn object_path(&self, oid: &Oid) -> PathBuf {
        self.root.join(oid.shard_path())
    }

    /// Whether `oid` is present in the local cache
    pub async fn exists(&self, oid: &Oid) -> bool {
        fs::metadata(self.object_path(oid))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Store one version of the file at `path`
    ///
    /// The new object is written whole. If `path` had a committed version
    /// that is present locally and differs from `content`, it is rewritten
    /// as a delta against the new object when the delta is smaller than its
    /// content. The delta is computed before anything is written, so a codec
    /// failure leaves the cache unchanged.
    #[instrument(skip(self, content), fields(size = content.len()))]
    pub async fn store(&self, content: &[u8], path: &str) -> StoreResult<LocalObject> {
        let _guard = match &self.path_locks {
            Some(locks) => Some(locks.acquire(path).await),
            None => None,
        };

        let oid = Oid::hash(content);
        let prior = self
            .history
            .committed_oid(path)
            .await
            .map_err(|e| StoreError::Lookup {
                path: path.to_string(),
                reason: format!("{:#}", e),
            })?;

        let demotion = match prior {
            Some(prior) if prior != oid => self.plan_demotion(prior, oid, content).await?,
            _ => None,
        };

        let object_path = self
            .write_object(&ContentObject::whole(oid, content.to_vec()))
            .await?;

        if let Some(demoted) = demotion {
            self.write_object(&demoted).await?;
            info!(prior = %demoted.oid, base = %oid, "demoted committed version to delta");
        }

        debug!(%oid, "stored object");
        Ok(LocalObject {
            oid,
            size: content.len() as u64,
            path: object_path,
        })
    }

    /// Decide whether `prior` should become a delta against `new_oid`
    async fn plan_demotion(
        &self,
        prior: Oid,
        new_oid: Oid,
        content: &[u8],
    ) -> StoreResult<Option<ContentObject>> {
        if !self.exists(&prior).await {
            warn!(%prior, "committed version missing from local cache, storing without delta");
            return Ok(None);
        }

        let scratch = ScratchDir::new(&self.scratch_root, "add")?;
        let previous = self.reconstruct_in(&prior, &scratch).await?;
        let delta = self.codec.encode(&scratch, content, &previous).await?;

        if delta.len() < previous.len() {
            Ok(Some(ContentObject::delta(prior, new_oid, delta)))
        } else {
            debug!(
                %prior,
                delta = delta.len(),
                whole = previous.len(),
                "delta not smaller, leaving committed version untouched"
            );
            Ok(None)
        }
    }

    /// Recover the real content of `oid`
    #[instrument(skip(self))]
    pub async fn reconstruct(&self, oid: &Oid) -> StoreResult<Vec<u8>> {
        let scratch = ScratchDir::new(&self.scratch_root, "reconstruct")?;
        self.reconstruct_in(oid, &scratch).await
    }

    async fn reconstruct_in(&self, oid: &Oid, scratch: &ScratchDir) -> StoreResult<Vec<u8>> {
        let chain = self.load_chain(oid).await?;

        let mut objects = chain.into_iter().rev();
        let mut content = match objects.next().map(|o| o.encoding) {
            Some(ObjectEncoding::Whole(content)) => content,
            _ => return Err(StoreError::corrupt_chain(oid, "chain has no whole object")),
        };

        for object in objects {
            if let ObjectEncoding::DeltaAgainst { delta, .. } = object.encoding {
                content = self.codec.decode(scratch, &content, &delta).await?;
            }
        }

        let actual = Oid::hash(&content);
        if actual != *oid {
            return Err(StoreError::corrupt_chain(
                oid,
                format!("reconstructed content hashes to {}", actual),
            ));
        }
        Ok(content)
    }

    /// Read the objects from `oid` up to the first whole one
    async fn load_chain(&self, oid: &Oid) -> StoreResult<Vec<ContentObject>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = *oid;

        loop {
            if !seen.insert(current) {
                return Err(StoreError::corrupt_chain(
                    oid,
                    format!("cycle through {}", current),
                ));
            }
            if chain.len() > self.max_chain_depth {
                return Err(StoreError::corrupt_chain(
                    oid,
                    format!("more than {} hops", self.max_chain_depth),
                ));
            }

            let object = match self.read_object(&current).await {
                Ok(object) => object,
                Err(StoreError::ObjectNotFound(_)) if current != *oid => {
                    return Err(StoreError::corrupt_chain(
                        oid,
                        format!("missing link {}", current),
                    ));
                }
                Err(e) => return Err(e),
            };

            let source = object.source_oid();
            chain.push(object);
            if source.is_zero() {
                return Ok(chain);
            }
            current = source;
        }
    }

    /// Read and parse one object, falling back to the remote if configured
    pub async fn read_object(&self, oid: &Oid) -> StoreResult<ContentObject> {
        let path = self.object_path(oid);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.fetch_missing(oid).await?,
            Err(e) => return Err(e.into()),
        };
        ContentObject::parse(*oid, &bytes)
    }

    async fn fetch_missing(&self, oid: &Oid) -> StoreResult<Vec<u8>> {
        let Some(fetcher) = &self.fetcher else {
            return Err(StoreError::ObjectNotFound(oid.to_hex()));
        };

        debug!(%oid, "object missing locally, asking remote");
        let bytes = fetcher
            .fetch(oid)
            .await
            .map_err(|e| StoreError::RemoteUnavailable(format!("{:#}", e)))?
            .ok_or_else(|| StoreError::ObjectNotFound(oid.to_hex()))?;

        // Validate before caching so a bad download never lands in the store
        let object = ContentObject::parse(*oid, &bytes)?;
        self.write_object(&object).await?;
        Ok(bytes)
    }

    /// Raw object file bytes, header included
    pub async fn read_raw(&self, oid: &Oid) -> StoreResult<Vec<u8>> {
        match fs::read(self.object_path(oid)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::ObjectNotFound(oid.to_hex()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Install raw object bytes received from elsewhere, after validating the header
    pub async fn import_raw(&self, oid: &Oid, bytes: &[u8]) -> StoreResult<PathBuf> {
        let object = ContentObject::parse(*oid, bytes)?;
        self.write_object(&object).await
    }

    /// The `sourceOid` links from `oid` to the nearest whole object, local only
    pub async fn chain(&self, oid: &Oid) -> StoreResult<Vec<ChainLink>> {
        let mut links = Vec::new();
        let mut seen = HashSet::new();
        let mut current = *oid;

        while seen.insert(current) && links.len() <= self.max_chain_depth {
            let bytes = self.read_raw(&current).await?;
            let object = ContentObject::parse(current, &bytes)?;
            let source = object.source_oid();
            links.push(ChainLink {
                oid: current,
                source,
                payload_len: object.payload().len() as u64,
            });
            if source.is_zero() {
                return Ok(links);
            }
            current = source;
        }
        Err(StoreError::corrupt_chain(oid, "chain does not end at a whole object"))
    }

    /// Objects whose hex id starts with `prefix`
    pub async fn find_by_prefix(&self, prefix: &str) -> StoreResult<Vec<Oid>> {
        let prefix = prefix.to_ascii_lowercase();
        if prefix.len() < MIN_PREFIX_LEN
            || prefix.len() > OID_HEX_LEN
            || !prefix.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(StoreError::InvalidOid(prefix));
        }

        let mut found = Vec::new();
        let shard = self.root.join(&prefix[..2]).join(&prefix[2..4]);
        let mut entries = match fs::read_dir(&shard).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(&prefix) {
                if let Ok(oid) = Oid::from_hex(name) {
                    found.push(oid);
                }
            }
        }
        found.sort();
        Ok(found)
    }

    /// Every object in the cache
    pub async fn list(&self) -> StoreResult<Vec<Oid>> {
        let mut found = Vec::new();
        let mut stack = vec![self.root.clone()];

        while let Some(dir) = stack.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    stack.push(entry.path());
                } else if let Some(oid) = entry.file_name().to_str().and_then(|n| n.parse().ok()) {
                    found.push(oid);
                }
            }
        }
        found.sort();
        Ok(found)
    }

    /// Atomically replace the file for `object.oid`
    async fn write_object(&self, object: &ContentObject) -> StoreResult<PathBuf> {
        let path = self.object_path(&object.oid);
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::bad_header(object.oid, "object path has no parent"))?;
        fs::create_dir_all(dir).await?;

        let tmp = dir.join(format!(
            ".{}.{}-{}.tmp",
            object.oid,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let result = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(&object.to_bytes()).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(path)
    }
}

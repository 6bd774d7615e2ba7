// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Storing, demoting and reconstructing versions through the public API

use async_trait::async_trait;
use lfsd_store::testing::AffixCodec;
use lfsd_store::{
    ContentObject, DeltaCodec, MemoryHistory, ObjectFetcher, ObjectStore, Oid, ScratchDir,
    StoreError, StoreResult, VcdiffCodec,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    store: ObjectStore,
    history: Arc<MemoryHistory>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_codec(Arc::new(AffixCodec))
    }

    fn with_codec(codec: Arc<dyn DeltaCodec>) -> Self {
        let dir = TempDir::new().unwrap();
        let history = Arc::new(MemoryHistory::new());
        let store = ObjectStore::new(dir.path().join("objects"), dir.path().join("tmp"), codec)
            .with_history(history.clone());
        Self { dir, store, history }
    }

    /// Store `content` and record it as the committed version of `path`
    async fn commit(&self, content: &[u8], path: &str) -> Oid {
        let oid = self.store.store(content, path).await.unwrap().oid;
        self.history.set(path, oid);
        oid
    }

    async fn source_of(&self, oid: &Oid) -> Oid {
        self.store.read_object(oid).await.unwrap().source_oid()
    }

    fn scratch_entries(&self) -> usize {
        match std::fs::read_dir(self.dir.path().join("tmp")) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

#[derive(Debug, Default)]
struct CountingCodec {
    encodes: AtomicUsize,
}

#[async_trait]
impl DeltaCodec for CountingCodec {
    async fn encode(&self, scratch: &ScratchDir, source: &[u8], target: &[u8]) -> StoreResult<Vec<u8>> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        AffixCodec.encode(scratch, source, target).await
    }

    async fn decode(&self, scratch: &ScratchDir, source: &[u8], delta: &[u8]) -> StoreResult<Vec<u8>> {
        AffixCodec.decode(scratch, source, delta).await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

#[derive(Debug)]
struct FailingCodec;

#[async_trait]
impl DeltaCodec for FailingCodec {
    async fn encode(&self, scratch: &ScratchDir, _source: &[u8], _target: &[u8]) -> StoreResult<Vec<u8>> {
        scratch.write("source", b"partial").await?;
        Err(StoreError::codec("xdelta3 exited with status 1"))
    }

    async fn decode(&self, scratch: &ScratchDir, source: &[u8], delta: &[u8]) -> StoreResult<Vec<u8>> {
        AffixCodec.decode(scratch, source, delta).await
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

#[tokio::test]
async fn test_first_version_is_stored_whole() {
    let fx = Fixture::new();
    let stored = fx.store.store(b"hello world", "a.txt").await.unwrap();

    assert_eq!(
        stored.oid.to_hex(),
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
    );
    assert_eq!(stored.size, 11);
    assert!(stored.path.exists());
    assert!(fx.source_of(&stored.oid).await.is_zero());
    assert_eq!(fx.store.reconstruct(&stored.oid).await.unwrap(), b"hello world");
}

#[tokio::test]
async fn test_committed_version_demoted_when_delta_is_smaller() {
    let fx = Fixture::new();
    let v1 = fx.commit(b"hello world", "a.txt").await;
    let v2 = fx.store.store(b"hello world, v2", "a.txt").await.unwrap().oid;

    assert!(fx.source_of(&v2).await.is_zero());
    assert_eq!(fx.source_of(&v1).await, v2);
    assert_eq!(fx.store.reconstruct(&v1).await.unwrap(), b"hello world");
    assert_eq!(fx.store.reconstruct(&v2).await.unwrap(), b"hello world, v2");
}

fn framed(head: u8, tail: u8) -> Vec<u8> {
    let mut content = vec![head];
    content.extend((0..100_000u32).map(|i| (i * 31 % 251) as u8));
    content.push(tail);
    content
}

#[tokio::test]
async fn test_vcdiff_demotes_version_with_edits_at_both_ends() {
    let fx = Fixture::with_codec(Arc::new(VcdiffCodec::default()));
    let v1_content = framed(b'A', b'Y');
    let v2_content = framed(b'B', b'Z');

    let v1 = fx.commit(&v1_content, "big.bin").await;
    let v2 = fx.commit(&v2_content, "big.bin").await;

    let demoted = fx.store.read_object(&v1).await.unwrap();
    assert_eq!(demoted.source_oid(), v2);
    assert!(
        demoted.payload().len() < 1024,
        "delta is {} bytes",
        demoted.payload().len()
    );
    assert!(fx.source_of(&v2).await.is_zero());
    assert_eq!(fx.store.reconstruct(&v1).await.unwrap(), v1_content);
    assert_eq!(fx.store.reconstruct(&v2).await.unwrap(), v2_content);
}

#[tokio::test]
async fn test_vcdiff_chain_replays_every_version() {
    let fx = Fixture::with_codec(Arc::new(VcdiffCodec::default()));
    let mut versions = Vec::new();
    for i in 0..4u8 {
        let mut content = framed(b'a' + i, b'z' - i);
        content[50_000] = i;
        versions.push((fx.commit(&content, "big.bin").await, content));
    }

    let chain = fx.store.chain(&versions[0].0).await.unwrap();
    assert_eq!(chain.len(), 4);
    for (oid, content) in &versions {
        assert_eq!(&fx.store.reconstruct(oid).await.unwrap(), content);
    }
}

#[tokio::test]
async fn test_committed_version_untouched_when_delta_is_not_smaller() {
    let fx = Fixture::new();
    let v1 = fx.commit(b"abc", "a.txt").await;
    let v2 = fx.store.store(b"xyz", "a.txt").await.unwrap().oid;

    assert!(fx.source_of(&v1).await.is_zero());
    assert!(fx.source_of(&v2).await.is_zero());
}

#[tokio::test]
async fn test_restaging_committed_content_does_not_self_reference() {
    let codec = Arc::new(CountingCodec::default());
    let fx = Fixture::with_codec(codec.clone());
    let v1 = fx.commit(b"hello world", "a.txt").await;

    let again = fx.store.store(b"hello world", "a.txt").await.unwrap();
    assert_eq!(again.oid, v1);
    assert!(fx.source_of(&v1).await.is_zero());
    assert_eq!(codec.encodes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_committed_object_skips_demotion() {
    let fx = Fixture::new();
    fx.history.set("a.txt", Oid::hash(b"only on another machine"));

    let stored = fx.store.store(b"hello world", "a.txt").await.unwrap();
    assert!(fx.source_of(&stored.oid).await.is_zero());
}

#[tokio::test]
async fn test_newest_version_is_always_whole_along_a_chain() {
    let fx = Fixture::new();
    let mut oids = Vec::new();
    for i in 0..6 {
        let content = format!("a long shared prefix that makes deltas worthwhile, version {}", i);
        oids.push((fx.commit(content.as_bytes(), "doc.bin").await, content));
    }

    let (newest, _) = oids.last().unwrap();
    assert!(fx.source_of(newest).await.is_zero());
    for window in oids.windows(2) {
        assert_eq!(fx.source_of(&window[0].0).await, window[1].0);
    }
    for (oid, content) in &oids {
        assert_eq!(fx.store.reconstruct(oid).await.unwrap(), content.as_bytes());
    }

    let chain = fx.store.chain(&oids[0].0).await.unwrap();
    assert_eq!(chain.len(), 6);
    assert!(chain.last().unwrap().source.is_zero());
}

#[tokio::test]
async fn test_codec_failure_leaves_store_untouched() {
    let fx = Fixture::with_codec(Arc::new(FailingCodec));
    let v1 = fx.commit(b"hello world", "a.txt").await;

    let err = fx.store.store(b"hello world, v2", "a.txt").await.unwrap_err();
    assert!(matches!(err, StoreError::DeltaCodecFailure(_)));
    assert!(!fx.store.exists(&Oid::hash(b"hello world, v2")).await);
    assert!(fx.source_of(&v1).await.is_zero());
    assert_eq!(fx.scratch_entries(), 0);
}

#[tokio::test]
async fn test_scratch_directories_are_cleaned_up() {
    let fx = Fixture::new();
    let v1 = fx.commit(b"hello world", "a.txt").await;
    fx.commit(b"hello world, v2", "a.txt").await;
    fx.store.reconstruct(&v1).await.unwrap();

    assert_eq!(fx.scratch_entries(), 0);
}

#[tokio::test]
async fn test_missing_object_is_not_found() {
    let fx = Fixture::new();
    let err = fx.store.reconstruct(&Oid::hash(b"never stored")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_missing_link_is_corrupt_chain() {
    let fx = Fixture::new();
    let oid = Oid::hash(b"orphan");
    let object = ContentObject::delta(oid, Oid::hash(b"gone"), vec![b'A', 0, 0]);
    fx.store.import_raw(&oid, &object.to_bytes()).await.unwrap();

    let err = fx.store.reconstruct(&oid).await.unwrap_err();
    assert!(matches!(err, StoreError::CorruptObjectChain { .. }));
    assert_eq!(fx.scratch_entries(), 0);
}

#[tokio::test]
async fn test_cycle_is_corrupt_chain() {
    let fx = Fixture::new();
    let a = Oid::hash(b"a");
    let b = Oid::hash(b"b");
    fx.store
        .import_raw(&a, &ContentObject::delta(a, b, vec![b'A', 0, 0]).to_bytes())
        .await
        .unwrap();
    fx.store
        .import_raw(&b, &ContentObject::delta(b, a, vec![b'A', 0, 0]).to_bytes())
        .await
        .unwrap();

    let err = fx.store.reconstruct(&a).await.unwrap_err();
    assert!(matches!(err, StoreError::CorruptObjectChain { .. }));
}

#[tokio::test]
async fn test_chain_depth_is_bounded() {
    let dir = TempDir::new().unwrap();
    let history = Arc::new(MemoryHistory::new());
    let store = ObjectStore::new(
        dir.path().join("objects"),
        dir.path().join("tmp"),
        Arc::new(AffixCodec),
    )
    .with_history(history.clone())
    .with_max_chain_depth(2);

    let mut oids = Vec::new();
    for i in 0..4 {
        let content = format!("shared content for every version #{}", i);
        let oid = store.store(content.as_bytes(), "f").await.unwrap().oid;
        history.set("f", oid);
        oids.push(oid);
    }

    // v1 -> v2 -> v3 fits in two hops, v0 needs three
    assert!(store.reconstruct(&oids[1]).await.is_ok());
    let err = store.reconstruct(&oids[0]).await.unwrap_err();
    assert!(matches!(err, StoreError::CorruptObjectChain { .. }));
}

#[tokio::test]
async fn test_bad_header_is_reported() {
    let fx = Fixture::new();
    let oid = Oid::hash(b"garbage");
    let path = fx.store.object_path(&oid);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"not an object").unwrap();

    let err = fx.store.reconstruct(&oid).await.unwrap_err();
    assert!(matches!(err, StoreError::BadObjectHeader { .. }));
}

#[tokio::test]
async fn test_tampered_payload_fails_digest_check() {
    let fx = Fixture::new();
    let oid = fx.commit(b"hello world", "a.txt").await;
    let path = fx.store.object_path(&oid);
    std::fs::write(&path, ContentObject::whole(oid, b"hello w0rld".to_vec()).to_bytes()).unwrap();

    let err = fx.store.reconstruct(&oid).await.unwrap_err();
    assert!(matches!(err, StoreError::CorruptObjectChain { .. }));
}

#[derive(Default)]
struct MapFetcher {
    objects: HashMap<Oid, Vec<u8>>,
    fail: bool,
}

#[async_trait]
impl ObjectFetcher for MapFetcher {
    async fn fetch(&self, oid: &Oid) -> anyhow::Result<Option<Vec<u8>>> {
        if self.fail {
            anyhow::bail!("connection refused");
        }
        Ok(self.objects.get(oid).cloned())
    }
}

#[tokio::test]
async fn test_missing_object_is_fetched_and_cached() {
    let oid = Oid::hash(b"remote content");
    let mut fetcher = MapFetcher::default();
    fetcher.objects.insert(
        oid,
        ContentObject::whole(oid, b"remote content".to_vec()).to_bytes(),
    );

    let fx = Fixture::new();
    let store = ObjectStore::new(
        fx.dir.path().join("objects"),
        fx.dir.path().join("tmp"),
        Arc::new(AffixCodec),
    )
    .with_fetcher(Arc::new(fetcher));

    assert!(!store.exists(&oid).await);
    assert_eq!(store.reconstruct(&oid).await.unwrap(), b"remote content");
    assert!(store.exists(&oid).await);

    let err = store.reconstruct(&Oid::hash(b"nowhere")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_fetch_failure_is_remote_unavailable() {
    let dir = TempDir::new().unwrap();
    let store = ObjectStore::new(dir.path().join("o"), dir.path().join("t"), Arc::new(AffixCodec))
        .with_fetcher(Arc::new(MapFetcher {
            fail: true,
            ..Default::default()
        }));

    let err = store.reconstruct(&Oid::hash(b"x")).await.unwrap_err();
    assert!(matches!(err, StoreError::RemoteUnavailable(_)));
}

#[derive(Debug, Default)]
struct SlowCodec {
    active: AtomicUsize,
    max_active: AtomicUsize,
}

#[async_trait]
impl DeltaCodec for SlowCodec {
    async fn encode(&self, scratch: &ScratchDir, source: &[u8], target: &[u8]) -> StoreResult<Vec<u8>> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        AffixCodec.encode(scratch, source, target).await
    }

    async fn decode(&self, scratch: &ScratchDir, source: &[u8], delta: &[u8]) -> StoreResult<Vec<u8>> {
        AffixCodec.decode(scratch, source, delta).await
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_path_stores_are_serialized() {
    let codec = Arc::new(SlowCodec::default());
    let fx = Fixture::with_codec(codec.clone());
    let v0 = fx.commit(b"base version of a shared file", "a.bin").await;
    let store = Arc::new(fx.store);

    let mut tasks = Vec::new();
    for i in 0..4 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            let content = format!("base version of a shared file {}", i);
            store.store(content.as_bytes(), "a.bin").await.unwrap()
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(codec.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(
        store.reconstruct(&v0).await.unwrap(),
        b"base version of a shared file"
    );
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_every_version_reconstructs(
            versions in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 1..6)
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let fx = Fixture::new();
                let mut oids = Vec::new();
                for content in &versions {
                    oids.push(fx.commit(content, "p.bin").await);
                }

                let newest = oids.last().unwrap();
                prop_assert!(fx.source_of(newest).await.is_zero());
                for (oid, content) in oids.iter().zip(&versions) {
                    prop_assert_eq!(&fx.store.reconstruct(oid).await.unwrap(), content);
                }
                Ok(())
            })?;
        }
    }
}

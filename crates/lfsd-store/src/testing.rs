// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Test doubles for the store
//!
//! Compiled for this crate's tests and for dependants that enable the
//! `test-support` feature in their dev-dependencies.

use crate::codec::DeltaCodec;
use crate::error::{StoreError, StoreResult};
use crate::scratch::ScratchDir;
use async_trait::async_trait;

/// In-memory codec sharing only the common prefix and suffix of two buffers
///
/// Its delta sizes are easy to predict, which makes it convenient for
/// checking when the store demotes an object. Layout: `b'A'`, prefix length
/// and suffix length as little-endian `u32`, then the bytes of `target`
/// between the two.
#[derive(Debug, Clone, Copy, Default)]
pub struct AffixCodec;

const AFFIX_TAG: u8 = b'A';
const HEADER_LEN: usize = 1 + 2 * 4;

impl AffixCodec {
    /// Delta turning `source` into `target`
    pub fn diff(source: &[u8], target: &[u8]) -> Vec<u8> {
        let prefix = source
            .iter()
            .zip(target)
            .take_while(|(a, b)| a == b)
            .count();
        let max_suffix = source.len().min(target.len()) - prefix;
        let suffix = source
            .iter()
            .rev()
            .zip(target.iter().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();

        let middle = &target[prefix..target.len() - suffix];
        let mut delta = Vec::with_capacity(HEADER_LEN + middle.len());
        delta.push(AFFIX_TAG);
        delta.extend_from_slice(&(prefix as u32).to_le_bytes());
        delta.extend_from_slice(&(suffix as u32).to_le_bytes());
        delta.extend_from_slice(middle);
        delta
    }

    /// Apply a delta produced by [`AffixCodec::diff`]
    pub fn apply(source: &[u8], delta: &[u8]) -> StoreResult<Vec<u8>> {
        if delta.len() < HEADER_LEN || delta[0] != AFFIX_TAG {
            return Err(StoreError::codec("not an affix delta"));
        }
        let length = |at: usize| {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&delta[at..at + 4]);
            u32::from_le_bytes(raw) as usize
        };
        let (prefix, suffix) = (length(1), length(5));
        if prefix.checked_add(suffix).is_none_or(|n| n > source.len()) {
            return Err(StoreError::codec(format!(
                "delta shares {} + {} bytes with a {} byte source",
                prefix,
                suffix,
                source.len()
            )));
        }

        let middle = &delta[HEADER_LEN..];
        let mut out = Vec::with_capacity(prefix + middle.len() + suffix);
        out.extend_from_slice(&source[..prefix]);
        out.extend_from_slice(middle);
        out.extend_from_slice(&source[source.len() - suffix..]);
        Ok(out)
    }
}

#[async_trait]
impl DeltaCodec for AffixCodec {
    async fn encode(
        &self,
        _scratch: &ScratchDir,
        source: &[u8],
        target: &[u8],
    ) -> StoreResult<Vec<u8>> {
        Ok(Self::diff(source, target))
    }

    async fn decode(
        &self,
        _scratch: &ScratchDir,
        source: &[u8],
        delta: &[u8],
    ) -> StoreResult<Vec<u8>> {
        Self::apply(source, delta)
    }

    fn name(&self) -> &'static str {
        "affix"
    }
}

// LFSD - Git Large File Storage with Deltas
// Copyright (C) 2026 LFSD Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Object Identifier (OID)
//!
//! An OID is the SHA-256 digest of the *real* content of one version of a
//! tracked file. It is computed once when the version is cleaned and never
//! recomputed, even if the object is later re-encoded as a delta.

use crate::error::{StoreError, StoreResult};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Length of an OID rendered as hex
pub const OID_HEX_LEN: usize = 64;

/// Object Identifier - SHA-256 hash of object content
///
/// # Examples
///
/// ```
/// use lfsd_store::Oid;
///
/// let oid = Oid::hash(b"hello world");
/// assert_eq!(
///     oid.to_hex(),
///     "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
/// );
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid([u8; 32]);

impl Oid {
    /// The all-zero sentinel marking a whole (non-delta) object
    pub const ZERO: Oid = Oid([0u8; 32]);

    /// Create an OID by hashing the given data
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Oid(hasher.finalize().into())
    }

    /// Create OID from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Oid(bytes)
    }

    /// Get the raw bytes of the OID
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the [`Oid::ZERO`] sentinel
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Convert OID to lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse an OID from exactly 64 lowercase hex characters
    ///
    /// Uppercase digits are rejected: pointers and object headers always
    /// carry the lowercase form, and accepting both would give one object two
    /// spellings.
    pub fn from_hex(s: &str) -> StoreResult<Self> {
        if !is_oid_hex(s) {
            return Err(StoreError::InvalidOid(s.to_string()));
        }

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| StoreError::InvalidOid(s.to_string()))?;
        Ok(Oid(bytes))
    }

    /// Sharded location relative to the cache root: `ab/cd/abcd…`
    pub fn shard_path(&self) -> PathBuf {
        let hex = self.to_hex();
        PathBuf::from(&hex[..2]).join(&hex[2..4]).join(&hex)
    }
}

/// Whether `s` is a well-formed OID spelling
pub fn is_oid_hex(s: &str) -> bool {
    s.len() == OID_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl FromStr for Oid {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Oid::from_hex(s)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self.to_hex())
    }
}

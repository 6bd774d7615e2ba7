// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Pointer stubs committed in place of tracked files
//!
//! ## Format
//!
//! ```text
//! version lfsd@1
//! oid sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9
//! size 11
//! ```
//!
//! A pointer never says how its object is stored; whether the object is whole
//! or a delta is only known to the local cache.

use crate::error::{GitError, GitResult};
use lfsd_store::{LocalObject, ObjectStore, Oid};
use std::fmt;
use std::path::PathBuf;

/// Version tag written into every pointer
pub const POINTER_VERSION: &str = "lfsd@1";

/// Anything larger than this cannot be a pointer
pub const MAX_POINTER_SIZE: usize = 1024;

/// A parsed pointer stub
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pointer {
    /// Version tag
    pub version: String,

    /// Digest of the real content
    pub oid: Oid,

    /// Size of the real content in bytes
    pub size: u64,
}

impl Pointer {
    /// Pointer for `oid` with the current version tag
    pub fn new(oid: Oid, size: u64) -> Self {
        Self {
            version: POINTER_VERSION.to_string(),
            oid,
            size,
        }
    }

    /// Pointer text for a freshly stored object
    ///
    /// ```rust
    /// use lfsd_git::Pointer;
    /// use lfsd_store::{LocalObject, Oid};
    ///
    /// let object = LocalObject {
    ///     oid: Oid::hash(b"hello world"),
    ///     size: 11,
    ///     path: "unused".into(),
    /// };
    /// assert_eq!(
    ///     Pointer::generate(&object),
    ///     "version lfsd@1\noid sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9\nsize 11\n"
    /// );
    /// ```
    pub fn generate(object: &LocalObject) -> String {
        Self::new(object.oid, object.size).to_string()
    }

    /// Parse pointer text
    ///
    /// Each field is matched against its own anchored line pattern:
    /// `version <tag>`, `oid sha256:<64 lowercase hex>` and `size <decimal>`.
    /// Lines with other keys are ignored. The object itself is not looked up.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::MalformedPointer`] if a field is absent, repeated or
    /// does not match its pattern.
    pub fn parse(content: &[u8]) -> GitResult<Self> {
        if content.len() > MAX_POINTER_SIZE {
            return Err(GitError::MalformedPointer(format!(
                "{} bytes is too large for a pointer",
                content.len()
            )));
        }
        let text = std::str::from_utf8(content)
            .map_err(|_| GitError::MalformedPointer("pointer is not UTF-8".to_string()))?;

        let mut version: Option<String> = None;
        let mut oid: Option<Oid> = None;
        let mut size: Option<u64> = None;

        for line in text.lines() {
            let Some((key, value)) = line.split_once(' ') else {
                continue;
            };

            match key {
                "version" => {
                    if value.is_empty() || value.contains(char::is_whitespace) {
                        return Err(malformed("version", value));
                    }
                    set_once(&mut version, "version", value.to_string())?;
                }
                "oid" => {
                    let parsed = value
                        .strip_prefix("sha256:")
                        .and_then(|hex| Oid::from_hex(hex).ok())
                        .ok_or_else(|| malformed("oid", value))?;
                    set_once(&mut oid, "oid", parsed)?;
                }
                "size" => {
                    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(malformed("size", value));
                    }
                    let parsed = value.parse::<u64>().map_err(|_| malformed("size", value))?;
                    set_once(&mut size, "size", parsed)?;
                }
                _ => {}
            }
        }

        Ok(Self {
            version: version.ok_or_else(|| missing("version"))?,
            oid: oid.ok_or_else(|| missing("oid"))?,
            size: size.ok_or_else(|| missing("size"))?,
        })
    }

    /// Cheap check used to tell pointers from ordinary blobs
    pub fn is_pointer(content: &[u8]) -> bool {
        content.len() <= MAX_POINTER_SIZE
            && content.starts_with(b"version ")
            && Self::parse(content).is_ok()
    }

    /// Where this pointer's object lives in `store`
    pub fn storage_path(&self, store: &ObjectStore) -> PathBuf {
        store.object_path(&self.oid)
    }

    /// Pointer text as committed to Git
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version {}\noid sha256:{}\nsize {}\n",
            self.version, self.oid, self.size
        )
    }
}

fn set_once<T>(slot: &mut Option<T>, field: &str, value: T) -> GitResult<()> {
    if slot.is_some() {
        return Err(GitError::MalformedPointer(format!("repeated '{}' line", field)));
    }
    *slot = Some(value);
    Ok(())
}

fn malformed(field: &str, value: &str) -> GitError {
    GitError::MalformedPointer(format!("invalid {} '{}'", field, value))
}

fn missing(field: &str) -> GitError {
    GitError::MalformedPointer(format!("missing '{}' line", field))
}

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

//! Object store error types

use std::io;
use thiserror::Error;

/// Result type alias for object store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while storing or reconstructing objects
#[derive(Error, Debug)]
pub enum StoreError {
    /// A string that should have been an object id is not one
    #[error("invalid object id '{0}': expected 64 lowercase hex characters")]
    InvalidOid(String),

    /// The `S <sourceOid>` line of a stored object is malformed
    #[error("bad object header in {oid}: {reason}")]
    BadObjectHeader {
        /// Object whose header failed to parse
        oid: String,
        /// What was wrong with it
        reason: String,
    },

    /// Following `sourceOid` links did not end at a whole object
    #[error("corrupt object chain starting at {oid}: {reason}")]
    CorruptObjectChain {
        /// Object whose reconstruction was requested
        oid: String,
        /// Missing link, cycle, depth overrun or digest mismatch
        reason: String,
    },

    /// The delta codec could not be run or rejected its input
    #[error("delta codec failed: {0}")]
    DeltaCodecFailure(String),

    /// The requested object is not in the local cache (nor on the remote)
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// Fetching a missing object from the remote failed
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// The committed-history collaborator failed
    #[error("failed to look up committed version of '{path}': {reason}")]
    Lookup {
        /// Tracked path being cleaned
        path: String,
        /// Collaborator error message
        reason: String,
    },

    /// I/O error in the cache or scratch area
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Create a BadObjectHeader error
    pub fn bad_header(oid: impl ToString, reason: impl Into<String>) -> Self {
        StoreError::BadObjectHeader {
            oid: oid.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a CorruptObjectChain error
    pub fn corrupt_chain(oid: impl ToString, reason: impl Into<String>) -> Self {
        StoreError::CorruptObjectChain {
            oid: oid.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a DeltaCodecFailure error
    pub fn codec<S: Into<String>>(msg: S) -> Self {
        StoreError::DeltaCodecFailure(msg.into())
    }

    /// Check if this is an ObjectNotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::ObjectNotFound(_))
    }

    /// True for errors that mean the on-disk cache is damaged
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            StoreError::BadObjectHeader { .. } | StoreError::CorruptObjectChain { .. }
        )
    }
}

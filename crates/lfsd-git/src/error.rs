// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Error types for Git integration

use lfsd_store::StoreError;
use thiserror::Error;

/// Result type for Git operations
pub type GitResult<T> = Result<T, GitError>;

/// Error types for Git integration operations
#[derive(Debug, Error)]
pub enum GitError {
    /// Pointer text is missing a field or a field does not match its pattern
    #[error("malformed pointer: {0}")]
    MalformedPointer(String),

    /// Unexpected packet content or framing in the filter-process protocol
    #[error("protocol violation in {state}: expected {expected}, received {received}")]
    ProtocolViolation {
        /// Protocol state the engine was in
        state: &'static str,
        /// What the state accepts
        expected: String,
        /// What actually arrived
        received: String,
    },

    /// Filter-process command other than clean or smudge
    #[error("unknown filter command '{0}'")]
    UnknownCommand(String),

    /// Object store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Git2 library error
    #[error("Git error: {0}")]
    Git2(#[from] git2::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// .gitattributes configuration error
    #[error("Failed to configure .gitattributes: {0}")]
    GitattributesConfig(String),

    /// Repository not initialized
    #[error("Repository not initialized at path: {0}")]
    RepositoryNotFound(String),
}

impl GitError {
    /// Create a ProtocolViolation error
    pub fn violation(
        state: &'static str,
        expected: impl Into<String>,
        received: impl Into<String>,
    ) -> Self {
        GitError::ProtocolViolation {
            state,
            expected: expected.into(),
            received: received.into(),
        }
    }
}

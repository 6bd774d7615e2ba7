// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Remote error types

use thiserror::Error;

/// Result type alias for blob-server operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors talking to the blob server
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The server could not be reached or answered with an error status
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// The server answered, but not with something we understand
    #[error("invalid response from {endpoint}: {reason}")]
    InvalidResponse {
        /// Endpoint that was called
        endpoint: String,
        /// What was wrong with the body
        reason: String,
    },
}

impl RemoteError {
    pub(crate) fn transport(endpoint: &str, error: reqwest::Error) -> Self {
        RemoteError::RemoteUnavailable(format!("{}: {}", endpoint, error))
    }

    pub(crate) fn invalid(endpoint: &str, reason: impl ToString) -> Self {
        RemoteError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}

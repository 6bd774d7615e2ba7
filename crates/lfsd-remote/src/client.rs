// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! HTTP client for the lfsd blob server
//!
//! The server keeps raw object files (header included) under their sharded
//! path `aa/bb/<oid>` and exposes four endpoints:
//!
//! | endpoint | request | response |
//! |---|---|---|
//! | `POST /upload` | multipart `file`, `path` | any 2xx |
//! | `POST /download` | `{"path": ..}` | `{"type": "Buffer", "data": [..]}` |
//! | `POST /not-exist` | `{"paths": [..]}` | paths the server lacks |
//! | `GET /search-oid?prefix=` | | matching object ids |

use crate::error::{RemoteError, RemoteResult};
use async_trait::async_trait;
use lfsd_store::{ObjectFetcher, Oid};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Path of an object on the server, always `/`-separated
pub fn server_path(oid: &Oid) -> String {
    let hex = oid.to_hex();
    format!("{}/{}/{}", &hex[..2], &hex[2..4], hex)
}

#[derive(Serialize)]
struct DownloadRequest<'a> {
    path: &'a str,
}

#[derive(Deserialize)]
struct DownloadResponse {
    #[serde(rename = "type")]
    _kind: Option<String>,
    data: Vec<u8>,
}

#[derive(Serialize)]
struct NotExistRequest<'a> {
    paths: &'a [String],
}

/// Client for one blob server
#[derive(Debug, Clone)]
pub struct HttpRemote {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRemote {
    /// Create a client for the server at `base_url`
    ///
    /// # Arguments
    /// * `base_url` - e.g. `http://localhost:3000`
    /// * `timeout` - per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> RemoteResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::transport(&base_url, e))?;
        Ok(Self { base_url, client })
    }

    /// Server URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    /// Upload the raw object file of `oid`
    pub async fn upload(&self, oid: &Oid, raw: Vec<u8>) -> RemoteResult<()> {
        let url = self.endpoint("upload");
        let path = server_path(oid);
        debug!("POST {} ({})", url, path);

        let file = Part::bytes(raw)
            .file_name(oid.to_hex())
            .mime_str("application/octet-stream")
            .map_err(|e| RemoteError::transport(&url, e))?;
        let form = Form::new().part("file", file).text("path", path);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| RemoteError::transport(&url, e))?;
        ensure_success(&url, response.status())?;

        info!(oid = %oid, "uploaded object");
        Ok(())
    }

    /// Raw object file of `oid`, or `None` if the server does not have it
    pub async fn download(&self, oid: &Oid) -> RemoteResult<Option<Vec<u8>>> {
        let url = self.endpoint("download");
        let path = server_path(oid);
        debug!("POST {} ({})", url, path);

        let response = self
            .client
            .post(&url)
            .json(&DownloadRequest { path: &path })
            .send()
            .await
            .map_err(|e| RemoteError::transport(&url, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(oid = %oid, "object not on server");
            return Ok(None);
        }
        ensure_success(&url, response.status())?;

        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteError::transport(&url, e))?;
        let parsed = parse_download(&url, &body)?;
        info!(oid = %oid, bytes = parsed.len(), "downloaded object");
        Ok(Some(parsed))
    }

    /// The subset of `oids` the server does not have yet
    pub async fn check_not_exist(&self, oids: &[Oid]) -> RemoteResult<Vec<Oid>> {
        if oids.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint("not-exist");
        let paths: Vec<String> = oids.iter().map(server_path).collect();
        debug!("POST {} ({} paths)", url, paths.len());

        let response = self
            .client
            .post(&url)
            .json(&NotExistRequest { paths: &paths })
            .send()
            .await
            .map_err(|e| RemoteError::transport(&url, e))?;
        ensure_success(&url, response.status())?;

        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteError::transport(&url, e))?;
        parse_missing(&url, &body)
    }

    /// Object ids on the server starting with `prefix`
    pub async fn search_oid(&self, prefix: &str) -> RemoteResult<Vec<String>> {
        let url = self.endpoint("search-oid");
        debug!("GET {}?prefix={}", url, prefix);

        let response = self
            .client
            .get(&url)
            .query(&[("prefix", prefix)])
            .send()
            .await
            .map_err(|e| RemoteError::transport(&url, e))?;
        ensure_success(&url, response.status())?;

        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteError::transport(&url, e))?;
        let found: Vec<String> =
            serde_json::from_slice(&body).map_err(|e| RemoteError::invalid(&url, e))?;
        Ok(found.iter().map(|entry| basename(entry).to_string()).collect())
    }
}

#[async_trait]
impl ObjectFetcher for HttpRemote {
    async fn fetch(&self, oid: &Oid) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.download(oid).await?)
    }
}

fn ensure_success(url: &str, status: StatusCode) -> RemoteResult<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(RemoteError::RemoteUnavailable(format!(
            "{} failed with status: {}",
            url, status
        )))
    }
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn parse_download(url: &str, body: &[u8]) -> RemoteResult<Vec<u8>> {
    let parsed: DownloadResponse =
        serde_json::from_slice(body).map_err(|e| RemoteError::invalid(url, e))?;
    Ok(parsed.data)
}

fn parse_missing(url: &str, body: &[u8]) -> RemoteResult<Vec<Oid>> {
    let paths: Vec<String> =
        serde_json::from_slice(body).map_err(|e| RemoteError::invalid(url, e))?;
    paths
        .iter()
        .map(|path| {
            Oid::from_hex(basename(path))
                .map_err(|_| RemoteError::invalid(url, format!("not an object path: {}", path)))
        })
        .collect()
}

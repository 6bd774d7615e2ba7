// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Delta codecs
//!
//! A [`DeltaCodec`] turns a `(source, target)` pair into a delta, and applies
//! a delta to `source` to get `target` back. The store only ever asks for a
//! delta of the *previous* version against the *new* one, so `source` is
//! always the newer content.
//!
//! Two implementations are provided:
//!
//! - [`XDeltaCodec`] drives an external `xdelta3` executable (VCDIFF)
//! - [`VcdiffCodec`] encodes and decodes the same format in process, so no
//!   external tooling is needed

use crate::error::{StoreError, StoreResult};
use crate::scratch::ScratchDir;
use async_trait::async_trait;
use oxidelta::engine::{self, EncodeOptions};
use std::fmt::Debug;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Produces and applies binary deltas
#[async_trait]
pub trait DeltaCodec: Send + Sync + Debug {
    /// Compute a delta that turns `source` into `target`
    ///
    /// `scratch` is a directory owned by the calling operation for the
    /// duration of the call.
    async fn encode(
        &self,
        scratch: &ScratchDir,
        source: &[u8],
        target: &[u8],
    ) -> StoreResult<Vec<u8>>;

    /// Apply `delta` to `source`
    async fn decode(&self, scratch: &ScratchDir, source: &[u8], delta: &[u8])
        -> StoreResult<Vec<u8>>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Options forwarded to `xdelta3`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XDeltaOptions {
    /// `-0` through `-9`
    pub compression_level: u32,
    /// `-B <bytes>`; 0 leaves the codec default
    pub source_window_size: u64,
    /// `-S none`
    pub disable_secondary: bool,
}

impl Default for XDeltaOptions {
    fn default() -> Self {
        Self {
            compression_level: 9,
            source_window_size: 0,
            disable_secondary: false,
        }
    }
}

/// External `xdelta3` process
#[derive(Debug, Clone)]
pub struct XDeltaCodec {
    program: PathBuf,
    options: XDeltaOptions,
}

impl XDeltaCodec {
    /// Codec invoking `program` with default options
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            options: XDeltaOptions::default(),
        }
    }

    /// Replace the encoder options
    pub fn with_options(mut self, options: XDeltaOptions) -> Self {
        self.options = options;
        self
    }

    /// Check that the executable starts and reports its version
    pub async fn check_version(&self) -> StoreResult<()> {
        let status = Command::new(&self.program)
            .arg("-V")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                StoreError::codec(format!(
                    "cannot run '{}' ({}); install xdelta3 or set delta.backend = \"builtin\"",
                    self.program.display(),
                    e
                ))
            })?;
        debug!(program = %self.program.display(), %status, "delta codec responded");
        if !status.success() {
            return Err(StoreError::codec(format!(
                "'{} -V' exited with {}; install xdelta3 or set delta.backend = \"builtin\"",
                self.program.display(),
                status
            )));
        }
        Ok(())
    }

    fn encode_args(&self) -> Vec<String> {
        let mut args = vec![
            "-e".to_string(),
            "-c".to_string(),
            "-f".to_string(),
            format!("-{}", self.options.compression_level.min(9)),
        ];
        if self.options.source_window_size > 0 {
            args.push("-B".to_string());
            args.push(self.options.source_window_size.to_string());
        }
        if self.options.disable_secondary {
            args.push("-S".to_string());
            args.push("none".to_string());
        }
        args
    }

    async fn run(&self, args: Vec<String>, source: PathBuf, input: PathBuf) -> StoreResult<Vec<u8>> {
        let output = Command::new(&self.program)
            .args(&args)
            .arg("-s")
            .arg(&source)
            .arg(&input)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                StoreError::codec(format!("failed to spawn '{}': {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            return Err(StoreError::codec(format!(
                "'{}' exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl DeltaCodec for XDeltaCodec {
    #[instrument(skip_all, fields(source = source.len(), target = target.len()))]
    async fn encode(
        &self,
        scratch: &ScratchDir,
        source: &[u8],
        target: &[u8],
    ) -> StoreResult<Vec<u8>> {
        let source_path = scratch.write("source", source).await?;
        let target_path = scratch.write("target", target).await?;
        self.run(self.encode_args(), source_path, target_path).await
    }

    #[instrument(skip_all, fields(source = source.len(), delta = delta.len()))]
    async fn decode(
        &self,
        scratch: &ScratchDir,
        source: &[u8],
        delta: &[u8],
    ) -> StoreResult<Vec<u8>> {
        let source_path = scratch.write("source", source).await?;
        let delta_path = scratch.write("delta", delta).await?;
        let args = vec!["-d".to_string(), "-c".to_string(), "-f".to_string()];
        self.run(args, source_path, delta_path).await
    }

    fn name(&self) -> &'static str {
        "xdelta3"
    }
}

/// In-process VCDIFF (RFC 3284) codec
///
/// Deltas are in the same format `xdelta3` writes, so a cache can switch
/// between the two backends without rewriting existing objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcdiffCodec {
    level: u32,
}

impl Default for VcdiffCodec {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl VcdiffCodec {
    /// Codec matching at `level` (0 through 9, as `xdelta3 -<level>`)
    pub fn new(level: u32) -> Self {
        Self { level: level.min(9) }
    }
}

#[async_trait]
impl DeltaCodec for VcdiffCodec {
    #[instrument(skip_all, fields(source = source.len(), target = target.len()))]
    async fn encode(
        &self,
        _scratch: &ScratchDir,
        source: &[u8],
        target: &[u8],
    ) -> StoreResult<Vec<u8>> {
        let options = EncodeOptions {
            level: self.level,
            ..EncodeOptions::default()
        };
        let (source, target) = (source.to_vec(), target.to_vec());
        tokio::task::spawn_blocking(move || {
            let mut delta = Vec::new();
            engine::encode_with_options(&source, &target, &mut delta, &options)
                .map_err(|e| StoreError::codec(format!("vcdiff encode failed: {}", e)))?;
            Ok(delta)
        })
        .await
        .map_err(|e| StoreError::codec(format!("vcdiff encoder task failed: {}", e)))?
    }

    #[instrument(skip_all, fields(source = source.len(), delta = delta.len()))]
    async fn decode(
        &self,
        _scratch: &ScratchDir,
        source: &[u8],
        delta: &[u8],
    ) -> StoreResult<Vec<u8>> {
        let (source, delta) = (source.to_vec(), delta.to_vec());
        tokio::task::spawn_blocking(move || {
            engine::decode(&source, &delta)
                .map_err(|e| StoreError::codec(format!("vcdiff decode failed: {}", e)))
        })
        .await
        .map_err(|e| StoreError::codec(format!("vcdiff decoder task failed: {}", e)))?
    }

    fn name(&self) -> &'static str {
        "builtin"
    }
}

// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Show or set the blob server URL (`lfsd.url`)

use crate::output;
use crate::repo::LfsdRepo;
use anyhow::{bail, Result};
use clap::Args;
use lfsd_git::URL_CONFIG_KEY;

#[derive(Debug, Args)]
pub struct ServerCmd {
    /// New server URL; prints the current one when omitted
    #[arg(value_name = "URL")]
    pub url: Option<String>,
}

impl ServerCmd {
    pub async fn execute(self) -> Result<()> {
        let repo = LfsdRepo::open().await?;

        match self.url {
            Some(url) => {
                let url = url.trim();
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    bail!("server url must start with http:// or https://, got '{}'", url);
                }
                repo.git.config_set(URL_CONFIG_KEY, url)?;
                output::success(&format!("Server set to {}", url));
            }
            None => match repo.git.config_get(URL_CONFIG_KEY)? {
                Some(url) => println!("{}", url),
                None => output::warning(
                    "no server found, please set it with \"git lfsd server <server url>\"",
                ),
            },
        }
        Ok(())
    }
}

// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Print the content of an object given an oid prefix

use crate::output;
use crate::repo::LfsdRepo;
use anyhow::{bail, Context, Result};
use clap::Args;
use lfsd_store::{Oid, MIN_PREFIX_LEN};
use tokio::io::AsyncWriteExt;

#[derive(Debug, Args)]
pub struct CatObjectCmd {
    /// Object id or a prefix of at least six hex characters
    #[arg(value_name = "OID")]
    pub prefix: String,

    /// Never ask the server when nothing matches locally
    #[arg(long)]
    pub offline: bool,
}

impl CatObjectCmd {
    pub async fn execute(self) -> Result<()> {
        if self.prefix.len() < MIN_PREFIX_LEN {
            bail!(
                "object id prefix must be at least {} characters long",
                MIN_PREFIX_LEN
            );
        }

        let repo = LfsdRepo::open().await?;
        let mut store = repo.open_store()?;

        let mut matches: Vec<String> = store
            .find_by_prefix(&self.prefix)
            .await?
            .iter()
            .map(Oid::to_hex)
            .collect();

        if matches.is_empty() {
            output::info(&format!(
                "No object with prefix {} found in local storage",
                self.prefix
            ));
            if self.offline {
                return Ok(());
            }
            let remote = repo.remote()?;
            output::info(&format!("Searching {}...", remote.base_url()));
            matches = remote.search_oid(&self.prefix).await?;
            store = repo.open_store_with(Some(remote))?;
        }

        match matches.as_slice() {
            [] => {
                output::info(&format!("No object with prefix {} found", self.prefix));
                Ok(())
            }
            [oid] => {
                let oid = Oid::from_hex(oid)?;
                // Missing chain links are fetched by the store
                let content = store
                    .reconstruct(&oid)
                    .await
                    .with_context(|| format!("Failed to read object {}", oid))?;
                let mut stdout = tokio::io::stdout();
                stdout.write_all(&content).await?;
                stdout.flush().await?;
                Ok(())
            }
            many => {
                println!("Found more than one object matching {}:", self.prefix);
                for oid in many {
                    println!("{}", oid);
                }
                println!(
                    "Use a longer prefix to print the content, e.g. \"git lfsd cat-object {}\"",
                    many[0]
                );
                Ok(())
            }
        }
    }
}

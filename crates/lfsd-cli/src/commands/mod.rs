// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

// Command modules for the git-lfsd CLI
pub mod cat_object;
pub mod filter;
pub mod install;
pub mod ls_files;
pub mod pre_push;
pub mod server;
pub mod track;

pub use cat_object::CatObjectCmd;
pub use filter::{CleanCmd, FilterProcessCmd, SmudgeCmd};
pub use install::{InstallCmd, UninstallCmd};
pub use ls_files::LsFilesCmd;
pub use pre_push::PrePushCmd;
pub use server::ServerCmd;
pub use track::{TrackCmd, UntrackCmd};

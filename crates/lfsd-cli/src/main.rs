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

mod commands;
mod output;
mod progress;
mod repo;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use commands::*;
use lfsd_config::Config;
use lfsd_git::GitRepository;
use lfsd_observability::{init_tracing_with_config, LogConfig, LogFormat, LogOutput};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "git-lfsd")]
#[command(version, about = "Git large file storage with backward deltas")]
#[command(
    long_about = "git-lfsd replaces tracked files with small pointers in Git and keeps their
content in a local object store, where older versions are stored as deltas against newer ones."
)]
#[command(propagate_version = true)]
#[command(author = "LFSD Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Colored output (always|auto|never)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Run as if started in PATH
    #[arg(short = 'C', global = true, value_name = "PATH")]
    directory: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve Git's long-running filter protocol on stdin/stdout
    #[command(name = "filter-process")]
    FilterProcess(FilterProcessCmd),

    /// Clean filter: content on stdin, pointer on stdout
    Clean(CleanCmd),

    /// Smudge filter: pointer on stdin, content on stdout
    Smudge(SmudgeCmd),

    /// Register the lfsd filter driver in Git config
    Install(InstallCmd),

    /// Remove the lfsd filter driver from Git config
    Uninstall(UninstallCmd),

    /// Track file patterns, or list tracked patterns
    Track(TrackCmd),

    /// Stop tracking file patterns
    Untrack(UntrackCmd),

    /// List tracked files of a revision
    #[command(name = "ls-files")]
    LsFiles(LsFilesCmd),

    /// Print an object's content from an oid prefix
    #[command(name = "cat-object")]
    CatObject(CatObjectCmd),

    /// Upload objects for a push (run from Git's pre-push hook)
    #[command(name = "pre-push")]
    PrePush(PrePushCmd),

    /// Show or set the blob server URL
    Server(ServerCmd),

    /// Show version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.color.as_str() {
        "never" => console::set_colors_enabled(false),
        "always" => console::set_colors_enabled(true),
        "auto" => {}
        _ => {
            output::error(&format!("Invalid color option: {}", cli.color));
            std::process::exit(1);
        }
    }

    if let Some(dir) = &cli.directory {
        if let Err(e) = std::env::set_current_dir(dir)
            .with_context(|| format!("Cannot change to {}", dir.display()))
        {
            output::error(&format!("Error: {:#}", e));
            std::process::exit(1);
        }
    }

    init_logging(&cli).await;

    let result = match cli.command {
        Commands::FilterProcess(cmd) => cmd.execute().await,
        Commands::Clean(cmd) => cmd.execute().await,
        Commands::Smudge(cmd) => cmd.execute().await,
        Commands::Install(cmd) => cmd.execute().await,
        Commands::Uninstall(cmd) => cmd.execute().await,
        Commands::Track(cmd) => cmd.execute().await,
        Commands::Untrack(cmd) => cmd.execute().await,
        Commands::LsFiles(cmd) => cmd.execute().await,
        Commands::CatObject(cmd) => cmd.execute().await,
        Commands::PrePush(cmd) => cmd.execute(cli.quiet).await,
        Commands::Server(cmd) => cmd.execute().await,
        Commands::Version => {
            print_version();
            Ok(())
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        output::error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

/// Structured logging to stderr: `-v`/`-q` first, then `RUST_LOG`, then the
/// repository's `[observability]` section
async fn init_logging(cli: &Cli) {
    let config = match std::env::current_dir()
        .ok()
        .and_then(|cwd| GitRepository::discover(&cwd).ok())
    {
        Some(git) => Config::load(git.git_dir()).await.unwrap_or_default(),
        None => Config::default(),
    };

    let level = if cli.verbose {
        Some("debug".to_string())
    } else if cli.quiet {
        Some("error".to_string())
    } else if std::env::var_os("RUST_LOG").is_some() {
        None
    } else {
        Some(config.observability.log_level.clone())
    };

    let format = config
        .observability
        .log_format
        .parse()
        .unwrap_or(LogFormat::Compact);
    let mut log = LogConfig::new()
        .with_format(format)
        .with_output(LogOutput::Stderr)
        .with_color(console::colors_enabled_stderr());
    if let Some(level) = level {
        log = log.with_level(level);
    }
    init_tracing_with_config(log).ok(); // Ignore errors if already initialized
}

fn print_version() {
    println!("git-lfsd {}", env!("CARGO_PKG_VERSION"));
    println!("rust-version: {}", env!("CARGO_PKG_RUST_VERSION"));
    println!("license: {}", env!("CARGO_PKG_LICENSE"));
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "git-lfsd", &mut io::stdout());
}

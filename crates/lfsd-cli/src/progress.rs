// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Progress bars for commands that move objects
//!
//! Bars draw on stderr and are hidden with `--quiet` or when stderr is not
//! a terminal, so they never mix with the lines Git reads from stdout.

use indicatif::{HumanCount, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const OBJECT_TEMPLATE: &str =
    "{spinner:.green} {msg} [{bar:40.green/blue}] {pos}/{len} ({percent}%)";

/// Hands out progress bars, or hidden ones in quiet mode
pub struct ProgressTracker {
    quiet: bool,
}

impl ProgressTracker {
    /// Tracker drawing nothing when `quiet`
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Bar counting `total` objects
    pub fn object_bar(&self, msg: &str, total: u64) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
        let style = ProgressStyle::default_bar()
            .template(OBJECT_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Count with thousands separators
    pub fn format_count(count: u64) -> String {
        format!("{}", HumanCount(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_bar_is_hidden() {
        let pb = ProgressTracker::new(true).object_bar("uploading", 3);
        assert!(pb.is_hidden());
        pb.inc(3);
        pb.finish_and_clear();
    }

    #[test]
    fn test_object_bar_counts() {
        let pb = ProgressTracker::new(false).object_bar("uploading", 2);
        assert_eq!(pb.length(), Some(2));
        pb.inc(1);
        assert_eq!(pb.position(), 1);
        pb.finish_and_clear();
    }

    #[test]
    fn test_format_count() {
        assert_eq!(ProgressTracker::format_count(1234567), "1,234,567");
    }
}

// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Filter-process state machine
//!
//! ```text
//! Init → WaitingVersion → WaitingVersionEnd → CheckingCapabilities ⟲
//!      → WaitingCommand → WaitingPathname → WaitingContentStart → Reading ⟲
//!      → WaitingCommand …
//! ```
//!
//! [`transition`] consumes exactly one packet and returns the next state plus
//! what the driver should do: write a reply, dispatch a request, or nothing.
//! It performs no I/O, so the whole protocol can be exercised packet by packet.

use crate::error::{GitError, GitResult};
use crate::pktline::Packet;

/// Capabilities the server is willing to echo back
pub const CAPABILITIES: [&str; 3] = ["clean", "smudge", "delay"];

/// Per-file metadata keys Git may send before the content
const METADATA_KEYS: [&str; 4] = ["ref=", "treeish=", "blob=", "can-delay="];

/// Protocol position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Expecting `git-filter-client`
    Init,
    /// Expecting `version=2`
    WaitingVersion,
    /// Expecting the flush that ends the version list
    WaitingVersionEnd,
    /// Echoing `capability=` lines until a flush
    CheckingCapabilities,
    /// Expecting `command=<name>`
    WaitingCommand,
    /// Expecting `pathname=<path>`
    WaitingPathname {
        /// Requested command
        command: String,
    },
    /// Expecting metadata lines or the flush before the content
    WaitingContentStart {
        /// Requested command
        command: String,
        /// File being filtered
        pathname: String,
    },
    /// Accumulating content packets until a flush
    Reading {
        /// Requested command
        command: String,
        /// File being filtered
        pathname: String,
        /// Content received so far
        content: Vec<u8>,
    },
}

impl State {
    /// Name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            State::Init => "Init",
            State::WaitingVersion => "WaitingVersion",
            State::WaitingVersionEnd => "WaitingVersionEnd",
            State::CheckingCapabilities => "CheckingCapabilities",
            State::WaitingCommand => "WaitingCommand",
            State::WaitingPathname { .. } => "WaitingPathname",
            State::WaitingContentStart { .. } => "WaitingContentStart",
            State::Reading { .. } => "Reading",
        }
    }
}

/// Which bridge operation a request runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterCommand {
    /// File content to pointer
    Clean,
    /// Pointer to file content
    Smudge,
}

impl FilterCommand {
    fn from_name(name: &str) -> GitResult<Self> {
        match name {
            "clean" => Ok(FilterCommand::Clean),
            "smudge" => Ok(FilterCommand::Smudge),
            other => Err(GitError::UnknownCommand(other.to_string())),
        }
    }
}

/// A fully received clean or smudge request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Operation to run
    pub command: FilterCommand,
    /// Repository-relative path of the file
    pub pathname: String,
    /// Content (clean) or pointer text (smudge)
    pub content: Vec<u8>,
}

/// What the driver must do after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Nothing to write
    None,
    /// Write these packets
    Reply(Vec<Packet>),
    /// Run the request and write its response
    Dispatch(Request),
}

/// Advance the protocol by one packet
pub fn transition(state: State, packet: Packet) -> GitResult<(State, Effect)> {
    match state {
        State::Init => {
            expect_line(state.name(), &packet, "git-filter-client")?;
            Ok((
                State::WaitingVersion,
                Effect::Reply(vec![Packet::text("git-filter-server")]),
            ))
        }
        State::WaitingVersion => {
            expect_line(state.name(), &packet, "version=2")?;
            Ok((
                State::WaitingVersionEnd,
                Effect::Reply(vec![Packet::text("version=2")]),
            ))
        }
        State::WaitingVersionEnd => {
            expect_flush(state.name(), &packet)?;
            Ok((
                State::CheckingCapabilities,
                Effect::Reply(vec![Packet::Flush]),
            ))
        }
        State::CheckingCapabilities => {
            if packet.is_flush() {
                return Ok((State::WaitingCommand, Effect::Reply(vec![Packet::Flush])));
            }
            let capability = text_with_prefix(state.name(), &packet, "capability=")?;
            if !CAPABILITIES.contains(&capability) {
                return Err(GitError::violation(
                    state.name(),
                    "capability=clean, capability=smudge or capability=delay",
                    packet.describe(),
                ));
            }
            let echo = Packet::text(&format!("capability={}", capability));
            Ok((State::CheckingCapabilities, Effect::Reply(vec![echo])))
        }
        State::WaitingCommand => {
            let command = text_with_prefix(state.name(), &packet, "command=")?.to_string();
            Ok((State::WaitingPathname { command }, Effect::None))
        }
        State::WaitingPathname { command } => {
            let pathname = text_with_prefix("WaitingPathname", &packet, "pathname=")?.to_string();
            Ok((
                State::WaitingContentStart { command, pathname },
                Effect::None,
            ))
        }
        State::WaitingContentStart { command, pathname } => {
            if packet.is_flush() {
                return Ok((
                    State::Reading {
                        command,
                        pathname,
                        content: Vec::new(),
                    },
                    Effect::None,
                ));
            }
            match packet.as_text() {
                Some(line) if METADATA_KEYS.iter().any(|key| line.starts_with(key)) => Ok((
                    State::WaitingContentStart { command, pathname },
                    Effect::None,
                )),
                _ => Err(GitError::violation(
                    "WaitingContentStart",
                    "flush packet",
                    packet.describe(),
                )),
            }
        }
        State::Reading {
            command,
            pathname,
            mut content,
        } => match packet {
            Packet::Data(chunk) => {
                content.extend_from_slice(&chunk);
                Ok((
                    State::Reading {
                        command,
                        pathname,
                        content,
                    },
                    Effect::None,
                ))
            }
            Packet::Flush => {
                let command = FilterCommand::from_name(&command)?;
                Ok((
                    State::WaitingCommand,
                    Effect::Dispatch(Request {
                        command,
                        pathname,
                        content,
                    }),
                ))
            }
        },
    }
}

/// Check that the input may end in `state`
pub fn finish(state: &State) -> GitResult<()> {
    match state {
        State::Init | State::WaitingCommand => Ok(()),
        other => Err(GitError::violation(
            other.name(),
            "more packets",
            "end of input",
        )),
    }
}

fn expect_line(state: &'static str, packet: &Packet, line: &str) -> GitResult<()> {
    if packet.as_text() == Some(line) {
        Ok(())
    } else {
        Err(GitError::violation(
            state,
            format!("'{}'", line),
            packet.describe(),
        ))
    }
}

fn expect_flush(state: &'static str, packet: &Packet) -> GitResult<()> {
    if packet.is_flush() {
        Ok(())
    } else {
        Err(GitError::violation(state, "flush packet", packet.describe()))
    }
}

fn text_with_prefix<'a>(
    state: &'static str,
    packet: &'a Packet,
    prefix: &str,
) -> GitResult<&'a str> {
    packet
        .as_text()
        .and_then(|line| line.strip_prefix(prefix))
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            GitError::violation(state, format!("'{}<value>'", prefix), packet.describe())
        })
}

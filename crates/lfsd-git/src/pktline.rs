// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! pkt-line framing
//!
//! Every packet starts with four hex digits giving its total length,
//! including the prefix itself. `0000` is a flush packet with no payload.
//! Text packets end their payload with `\n`; binary packets carry arbitrary
//! bytes.

use crate::error::{GitError, GitResult};

/// Largest payload a single packet may carry
pub const MAX_PACKET_CONTENT_SIZE: usize = 65516;

/// Largest total packet length, prefix included
pub const MAX_PACKET_SIZE: usize = MAX_PACKET_CONTENT_SIZE + 4;

const FLUSH: &[u8; 4] = b"0000";

/// One framed packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// `0000`
    Flush,
    /// Anything else
    Data(Vec<u8>),
}

impl Packet {
    /// Text packet carrying `line` followed by `\n`
    pub fn text(line: &str) -> Self {
        let mut payload = Vec::with_capacity(line.len() + 1);
        payload.extend_from_slice(line.as_bytes());
        payload.push(b'\n');
        Packet::Data(payload)
    }

    /// True for the `0000` flush packet
    pub fn is_flush(&self) -> bool {
        matches!(self, Packet::Flush)
    }

    /// The line carried by a text packet, without its `\n`
    ///
    /// `None` for flush packets, payloads that are not newline-terminated, and
    /// payloads that are not UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Packet::Flush => None,
            Packet::Data(payload) => payload
                .strip_suffix(b"\n")
                .and_then(|line| std::str::from_utf8(line).ok()),
        }
    }

    /// Short rendering for error messages
    pub fn describe(&self) -> String {
        match self {
            Packet::Flush => "flush packet".to_string(),
            Packet::Data(payload) => match self.as_text() {
                Some(line) => format!("'{}'", line),
                None => format!("{} byte binary packet", payload.len()),
            },
        }
    }

    /// Append the wire form of this packet to `out`
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Packet::Flush => out.extend_from_slice(FLUSH),
            Packet::Data(payload) => {
                out.extend_from_slice(format!("{:04x}", payload.len() + 4).as_bytes());
                out.extend_from_slice(payload);
            }
        }
    }

    /// Wire bytes of this packet
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }
}

/// Split `bytes` into binary packets no larger than [`MAX_PACKET_CONTENT_SIZE`]
///
/// Empty input yields no packets.
pub fn data_packets(bytes: &[u8]) -> impl Iterator<Item = Packet> + '_ {
    bytes
        .chunks(MAX_PACKET_CONTENT_SIZE)
        .map(|chunk| Packet::Data(chunk.to_vec()))
}

/// Incremental packet decoder fed by arbitrary byte chunks
#[derive(Debug, Default)]
pub struct PacketDecoder {
    buffer: Vec<u8>,
}

impl PacketDecoder {
    /// Decoder with nothing buffered
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read from the input stream
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Next complete packet, or `None` if more bytes are needed
    pub fn next_packet(&mut self) -> GitResult<Option<Packet>> {
        if self.buffer.len() < 4 {
            return Ok(None);
        }

        let len = parse_length(&self.buffer[..4])?;
        if len == 0 {
            self.buffer.drain(..4);
            return Ok(Some(Packet::Flush));
        }
        if self.buffer.len() < len {
            return Ok(None);
        }

        let payload = self.buffer[4..len].to_vec();
        self.buffer.drain(..len);
        Ok(Some(Packet::Data(payload)))
    }

    /// Whether bytes of an incomplete packet are buffered
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Check that the stream did not end inside a packet
    pub fn finish(&self) -> GitResult<()> {
        if self.has_partial() {
            return Err(GitError::violation(
                "framing",
                "a complete packet",
                format!("end of input after {} buffered bytes", self.buffer.len()),
            ));
        }
        Ok(())
    }
}

fn parse_length(prefix: &[u8]) -> GitResult<usize> {
    let text = std::str::from_utf8(prefix)
        .ok()
        .filter(|s| s.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| {
            GitError::violation(
                "framing",
                "four hex digits",
                format!("{:?}", String::from_utf8_lossy(prefix)),
            )
        })?;

    let len = usize::from_str_radix(text, 16)
        .map_err(|_| GitError::violation("framing", "four hex digits", text.to_string()))?;

    match len {
        0 => Ok(0),
        1..=4 => Err(GitError::violation(
            "framing",
            "flush or a packet longer than its prefix",
            format!("length {}", text),
        )),
        n if n > MAX_PACKET_SIZE => Err(GitError::violation(
            "framing",
            format!("at most {} bytes", MAX_PACKET_SIZE),
            format!("length {}", n),
        )),
        n => Ok(n),
    }
}

// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! Long-running filter process
//!
//! Reads byte chunks from Git, frames them into packets, steps the protocol
//! state machine and writes replies. Requests are handled strictly one at a
//! time; the response to a request is fully written and flushed before the
//! next packet is looked at.
//!
//! Any error ends the session. Git restarts the filter process if it needs
//! another one.

use crate::error::GitResult;
use crate::filter::FilterHandler;
use crate::pktline::{data_packets, Packet, PacketDecoder};
use crate::protocol::{self, Effect, FilterCommand, Request, State};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, trace};

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Counters reported when a session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Clean requests served
    pub cleaned: usize,
    /// Smudge requests served
    pub smudged: usize,
}

/// One filter-process session
pub struct FilterProcess<H> {
    handler: H,
}

impl<H: FilterHandler> FilterProcess<H> {
    /// Session dispatching requests to `handler`
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    /// Serve requests until `input` ends
    ///
    /// Returns an error on any protocol violation, on end of input in the
    /// middle of a request, and on any failure of the handler.
    pub async fn run<R, W>(&self, mut input: R, mut output: W) -> GitResult<SessionStats>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut decoder = PacketDecoder::new();
        let mut state = State::Init;
        let mut stats = SessionStats::default();
        let mut buf = vec![0u8; READ_CHUNK_SIZE];

        loop {
            while let Some(packet) = decoder.next_packet()? {
                trace!(state = state.name(), packet = %packet.describe(), "packet");
                let (next, effect) = protocol::transition(state, packet)?;
                state = next;

                match effect {
                    Effect::None => {}
                    Effect::Reply(packets) => write_packets(&mut output, &packets).await?,
                    Effect::Dispatch(request) => {
                        self.dispatch(request, &mut output, &mut stats).await?;
                    }
                }
            }

            let n = input.read(&mut buf).await?;
            if n == 0 {
                decoder.finish()?;
                protocol::finish(&state)?;
                info!(
                    cleaned = stats.cleaned,
                    smudged = stats.smudged,
                    "filter process finished"
                );
                return Ok(stats);
            }
            decoder.feed(&buf[..n]);
        }
    }

    async fn dispatch<W>(
        &self,
        request: Request,
        output: &mut W,
        stats: &mut SessionStats,
    ) -> GitResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        debug!(
            command = ?request.command,
            path = %request.pathname,
            bytes = request.content.len(),
            "dispatching request"
        );

        let result = match request.command {
            FilterCommand::Clean => {
                stats.cleaned += 1;
                self.handler
                    .clean(&request.content, &request.pathname)
                    .await?
            }
            FilterCommand::Smudge => {
                stats.smudged += 1;
                self.handler
                    .smudge(&request.content, &request.pathname)
                    .await?
            }
        };

        let mut packets = vec![Packet::text("status=success"), Packet::Flush];
        packets.extend(data_packets(&result));
        packets.push(Packet::Flush);
        packets.push(Packet::Flush);
        write_packets(output, &packets).await
    }
}

async fn write_packets<W>(output: &mut W, packets: &[Packet]) -> GitResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut wire = Vec::new();
    for packet in packets {
        packet.encode_into(&mut wire);
    }
    output.write_all(&wire).await?;
    output.flush().await?;
    Ok(())
}

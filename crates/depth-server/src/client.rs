//! Per-connection I/O.
//!
//! The protocol is detected from the first byte:
//! - CSV: newline-separated lines; feed events go to the writer task and
//!   queries are answered straight from a `DepthReader`, one JSON line each.
//! - Binary: u32 BE length-prefixed feed frames (events only).
//!
//! Malformed lines and undecodable frames are logged and skipped; only I/O
//! failures, oversized frames and overlong lines end the connection.

use anyhow::{bail, Context, Result};
use bytes::{Buf, BytesMut};
use depth_core::{DepthReader, FeedEvent, ViewQuery};
use depth_protocol::binary_codec::{self, check_frame_len};
use depth_protocol::csv_codec::{self, FeedLine};
use depth_protocol::wire_types::{looks_like_csv, MAX_LINE_LEN};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::types::{ClientId, FeedRequest, FeedTx, Protocol};

/// Run the I/O loop for a single connection until it closes.
pub async fn run_client(
    client_id: ClientId,
    stream: TcpStream,
    feed_tx: FeedTx,
    reader: DepthReader,
) -> Result<()> {
    stream.set_nodelay(true).ok();

    let mut first_byte = [0u8; 1];
    let n = stream
        .peek(&mut first_byte)
        .await
        .context("peek first byte")?;
    if n == 0 {
        return Ok(());
    }

    let protocol = if looks_like_csv(first_byte[0]) {
        Protocol::Csv
    } else {
        Protocol::Binary
    };
    info!(client = client_id.0, ?protocol, "protocol detected");

    let (read_half, write_half) = stream.into_split();
    let mut conn = Connection {
        client_id,
        read_half,
        buffer: BytesMut::with_capacity(8 * 1024),
        feed_tx,
    };

    match protocol {
        Protocol::Csv => conn.run_csv(write_half, reader).await,
        Protocol::Binary => conn.run_binary().await,
    }
}

struct Connection {
    client_id: ClientId,
    read_half: OwnedReadHalf,
    buffer: BytesMut,
    feed_tx: FeedTx,
}

impl Connection {
    /// Read more bytes into the buffer. Returns `false` on EOF.
    async fn fill(&mut self) -> Result<bool> {
        let n = self
            .read_half
            .read_buf(&mut self.buffer)
            .await
            .context("socket read")?;
        Ok(n > 0)
    }

    /// Forward an event to the writer task. Returns `false` once the
    /// writer is gone.
    async fn forward(&self, event: FeedEvent) -> bool {
        let req = FeedRequest {
            client_id: self.client_id,
            event,
        };
        if self.feed_tx.send(req).await.is_err() {
            warn!(client = self.client_id.0, "feed channel closed");
            return false;
        }
        true
    }

    async fn run_csv(&mut self, mut write_half: OwnedWriteHalf, reader: DepthReader) -> Result<()> {
        loop {
            while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let raw = self.buffer.split_to(pos + 1);
                let line = String::from_utf8_lossy(&raw);

                match csv_codec::parse_feed_line(&line) {
                    Ok(Some(FeedLine::Event(event))) => {
                        if !self.forward(event).await {
                            return Ok(());
                        }
                    }
                    Ok(Some(FeedLine::Query(query))) => {
                        respond(&mut write_half, &reader, query).await?;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!(client = self.client_id.0, line = %line.trim(), %err, "skipping malformed line");
                    }
                }
            }

            // No newline in sight; the peer is not speaking the line protocol.
            if self.buffer.len() > MAX_LINE_LEN {
                warn!(
                    client = self.client_id.0,
                    buffered = self.buffer.len(),
                    max = MAX_LINE_LEN,
                    "csv line too long, closing"
                );
                bail!("csv line exceeds {} bytes", MAX_LINE_LEN);
            }

            if !self.fill().await? {
                if !self.buffer.is_empty() {
                    // Last line without a trailing newline.
                    self.buffer.extend_from_slice(b"\n");
                    continue;
                }
                debug!(client = self.client_id.0, "csv client disconnected");
                return Ok(());
            }
        }
    }

    async fn run_binary(&mut self) -> Result<()> {
        loop {
            while self.buffer.len() >= 4 {
                let len = u32::from_be_bytes([
                    self.buffer[0],
                    self.buffer[1],
                    self.buffer[2],
                    self.buffer[3],
                ]) as usize;
                let len = check_frame_len(len)?;
                if self.buffer.len() < 4 + len {
                    self.buffer.reserve(4 + len - self.buffer.len());
                    break;
                }

                self.buffer.advance(4);
                let frame = self.buffer.split_to(len);
                if frame.is_empty() {
                    continue;
                }

                match binary_codec::decode_event(&frame) {
                    Ok(event) => {
                        if !self.forward(event).await {
                            return Ok(());
                        }
                    }
                    Err(err) => {
                        warn!(client = self.client_id.0, %err, "skipping undecodable frame");
                    }
                }
            }

            if !self.fill().await? {
                debug!(client = self.client_id.0, "binary client disconnected");
                return Ok(());
            }
        }
    }
}

async fn respond(
    write_half: &mut OwnedWriteHalf,
    reader: &DepthReader,
    query: ViewQuery,
) -> Result<()> {
    let response = reader.answer(query);
    let mut line = serde_json::to_string(&response).context("encode query response")?;
    line.push('\n');

    write_half
        .write_all(line.as_bytes())
        .await
        .context("write query response")?;
    write_half.flush().await.context("flush query response")?;
    Ok(())
}

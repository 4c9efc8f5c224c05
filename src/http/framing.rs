//! Client side of response framing.
//!
//! Plain mode copies the whole stream to the sink. Length-prefixed mode reads
//! a `u32` prefix, then separates the header block from the body as chunks
//! arrive and writes only the body.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::{ClientConfig, DelimiterScan};
use crate::error::TransferError;
use crate::http::parser::{DELIMITER, find_headers_end, parse_response_header};
use crate::http::response::ResponseHeader;

/// Header bytes kept for parsing. Bytes past this are still counted as header.
const MAX_RETAINED_HEADER: usize = 64 * 1024;

const CARRY: usize = DELIMITER.len() - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Delimiter not seen yet, bytes belong to the header block
    Header,
    /// Delimiter seen, every further byte is body
    Body,
}

/// Classifies each received byte as header or body exactly once.
#[derive(Debug)]
pub struct BodySplitter {
    scan: DelimiterScan,
    state: TransferState,
    header: BytesMut,
    header_len: u64,
    tail: [u8; CARRY],
    tail_len: usize,
}

impl BodySplitter {
    pub fn new(scan: DelimiterScan) -> Self {
        Self {
            scan,
            state: TransferState::Header,
            header: BytesMut::new(),
            header_len: 0,
            tail: [0; CARRY],
            tail_len: 0,
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Header bytes retained so far, delimiter included once found.
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Total bytes classified as header, retained or not.
    pub fn header_len(&self) -> u64 {
        self.header_len
    }

    /// Feeds one received chunk and returns the part of it that is body.
    pub fn feed<'a>(&mut self, chunk: &'a [u8]) -> &'a [u8] {
        if self.state == TransferState::Body {
            return chunk;
        }

        match self.locate(chunk) {
            Some(end) => {
                self.push_header(&chunk[..end]);
                self.state = TransferState::Body;
                &chunk[end..]
            }
            None => {
                self.push_header(chunk);
                &[]
            }
        }
    }

    /// Index in `chunk` just past the delimiter, if the delimiter ends in it.
    fn locate(&self, chunk: &[u8]) -> Option<usize> {
        if self.scan == DelimiterScan::CarryOver && self.tail_len > 0 {
            let take = chunk.len().min(CARRY);
            let mut seam = [0u8; 2 * CARRY];
            seam[..self.tail_len].copy_from_slice(&self.tail[..self.tail_len]);
            seam[self.tail_len..self.tail_len + take].copy_from_slice(&chunk[..take]);

            if let Some(pos) = find_headers_end(&seam[..self.tail_len + take]) {
                if pos < self.tail_len {
                    return Some(pos + DELIMITER.len() - self.tail_len);
                }
            }
        }

        find_headers_end(chunk).map(|pos| pos + DELIMITER.len())
    }

    fn push_header(&mut self, bytes: &[u8]) {
        self.header_len += bytes.len() as u64;

        let room = MAX_RETAINED_HEADER.saturating_sub(self.header.len());
        self.header.extend_from_slice(&bytes[..bytes.len().min(room)]);

        let take = bytes.len().min(CARRY);
        let mut joined = [0u8; 2 * CARRY];
        joined[..self.tail_len].copy_from_slice(&self.tail[..self.tail_len]);
        joined[self.tail_len..self.tail_len + take].copy_from_slice(&bytes[bytes.len() - take..]);

        let total = self.tail_len + take;
        let keep = total.min(CARRY);
        self.tail[..keep].copy_from_slice(&joined[total - keep..total]);
        self.tail_len = keep;
    }
}

/// Result of a plain-mode receive.
#[derive(Debug)]
pub struct PlainReport {
    pub body_bytes: u64,
    /// Read error that ended the stream early, if any
    pub read_error: Option<std::io::Error>,
}

/// Copies the stream to `sink` until end-of-stream, then writes a newline.
///
/// A read error ends the copy but keeps what was already written.
pub async fn receive_plain<R, W>(
    reader: &mut R,
    sink: &mut W,
    chunk_size: usize,
) -> Result<PlainReport, TransferError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut chunk = vec![0u8; chunk_size.max(1)];
    let mut body_bytes = 0u64;
    let mut read_error = None;

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::error!(error = %e, received = body_bytes, "Receive failed");
                read_error = Some(e);
                break;
            }
        };

        sink.write_all(&chunk[..n]).await.map_err(TransferError::Write)?;
        body_bytes += n as u64;
    }

    sink.write_all(b"\n").await.map_err(TransferError::Write)?;
    sink.flush().await.map_err(TransferError::Write)?;

    Ok(PlainReport {
        body_bytes,
        read_error,
    })
}

/// Result of a length-prefixed receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixedReport {
    /// The prefix value as sent
    pub declared_total: u32,
    /// Parsed header block, `None` if the delimiter was never found
    pub header: Option<ResponseHeader>,
    pub header_bytes: u64,
    pub body_bytes: u64,
}

/// Reads the length prefix, then writes only the body to `sink`.
///
/// A stream that closes inside the prefix is a framing error. A read error
/// later on is returned after the sink has been flushed.
pub async fn receive_length_prefixed<R, W>(
    reader: &mut R,
    sink: &mut W,
    config: &ClientConfig,
) -> Result<PrefixedReport, TransferError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut prefix = [0u8; 4];
    reader
        .read_exact(&mut prefix)
        .await
        .map_err(TransferError::Framing)?;
    let declared_total = config.byte_order.decode(prefix);
    tracing::debug!(declared_total, "Read length prefix");

    let mut splitter = BodySplitter::new(config.delimiter_scan);
    let mut chunk = vec![0u8; config.chunk_size.max(1)];
    let mut body_bytes = 0u64;

    let outcome = loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break Ok(()),
            Ok(n) => n,
            Err(e) => break Err(TransferError::Recv(e)),
        };

        let body = splitter.feed(&chunk[..n]);
        if body.is_empty() {
            continue;
        }

        if let Err(e) = sink.write_all(body).await {
            break Err(TransferError::Write(e));
        }
        body_bytes += body.len() as u64;
    };

    let flushed = sink.flush().await.map_err(TransferError::Write);
    outcome?;
    flushed?;

    let header = match splitter.state() {
        TransferState::Body => match parse_response_header(splitter.header()) {
            Ok(header) => {
                tracing::info!(
                    status = header.code,
                    reason = %header.reason,
                    content_length = ?header.content_length,
                    "Received response header"
                );
                Some(header)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not parse response header");
                None
            }
        },
        TransferState::Header => {
            tracing::warn!(
                withheld = splitter.header_len(),
                "Header delimiter never found, no body written"
            );
            None
        }
    };

    if let Some(declared) = header.as_ref().and_then(|h| h.content_length) {
        if declared != body_bytes {
            tracing::warn!(declared, received = body_bytes, "Body length differs from Content-Length");
        }
    }

    let received_total = splitter.header_len() + body_bytes;
    if received_total != u64::from(declared_total) {
        tracing::warn!(
            declared = declared_total,
            received = received_total,
            "Received byte count differs from length prefix"
        );
    }

    Ok(PrefixedReport {
        declared_total,
        header,
        header_bytes: splitter.header_len(),
        body_bytes,
    })
}

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::ByteOrder;
use crate::http::request::HTTP_VERSION;
use crate::http::response::Response;

pub fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Writes one response: optional length prefix, head, then a streamed body.
pub struct ResponseWriter {
    head: Vec<u8>,
    prefix: Option<[u8; 4]>,
    chunk_size: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response, chunk_size: usize) -> Self {
        Self {
            head: serialize_head(response),
            prefix: None,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Prefixes the response with its total length (head plus `body_len`).
    ///
    /// Totals beyond `u32::MAX` saturate.
    pub fn with_length_prefix(mut self, order: ByteOrder, body_len: u64) -> Self {
        let total = self.head.len() as u64 + body_len;
        let value = u32::try_from(total).unwrap_or_else(|_| {
            tracing::warn!(total, "Response too large for length prefix, saturating");
            u32::MAX
        });
        self.prefix = Some(order.encode(value));
        self
    }

    pub fn head(&self) -> &[u8] {
        &self.head
    }

    pub async fn write_head<W>(&self, stream: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        if let Some(prefix) = &self.prefix {
            stream.write_all(prefix).await?;
        }
        stream.write_all(&self.head).await?;
        stream.flush().await
    }

    /// Copies `body` to `stream` in chunks of at most `chunk_size` bytes.
    ///
    /// Stops at the first failed write. Returns the number of body bytes sent.
    pub async fn stream_body<R, W>(&self, body: &mut R, stream: &mut W) -> std::io::Result<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut chunk = vec![0u8; self.chunk_size];
        let mut sent = 0u64;

        loop {
            let n = body.read(&mut chunk).await?;
            if n == 0 {
                break;
            }

            stream.write_all(&chunk[..n]).await?;
            sent += n as u64;
        }

        stream.flush().await?;
        Ok(sent)
    }
}

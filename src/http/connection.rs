use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::{Framing, ServerConfig};
use crate::http::files::{self, Lookup};
use crate::http::parser::parse_request_line;
use crate::http::request::{Method, RequestLine};
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;

/// One accepted connection, served by exactly one worker.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    config: Arc<ServerConfig>,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(RequestLine),
    Writing(Reply),
    Closed,
}

/// What goes back to the client.
pub enum Reply {
    /// Status line and headers only
    Status(Response),
    /// 200 OK followed by the file
    File { file: File, len: u64 },
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr, config: Arc<ServerConfig>) -> Self {
        Self {
            stream,
            peer,
            config,
            state: ConnectionState::Reading,
        }
    }

    /// Serves a single request and closes the connection.
    ///
    /// The stream is shut down whether or not the exchange succeeded.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let result = self.drive().await;

        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(peer = %self.peer, error = %e, "Shutdown after response failed");
        }

        result
    }

    async fn drive(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = self.read_request().await?;
                }

                ConnectionState::Processing(req) => {
                    let reply = self.handle_request(&req).await;
                    self.state = ConnectionState::Writing(reply);
                }

                ConnectionState::Writing(reply) => {
                    self.write_reply(reply).await?;
                    self.state = ConnectionState::Closed;
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Reads the request in a single receive of at most `max_request_size` bytes.
    async fn read_request(&mut self) -> anyhow::Result<ConnectionState> {
        let mut buffer = vec![0u8; self.config.max_request_size];
        let n = self
            .stream
            .read(&mut buffer)
            .await
            .context("Failed to read request")?;

        if n == 0 {
            tracing::debug!(peer = %self.peer, "Client closed connection before sending a request");
            return Ok(ConnectionState::Closed);
        }

        match parse_request_line(&buffer[..n]) {
            Ok(req) => {
                tracing::info!(
                    peer = %self.peer,
                    method = req.method.as_str(),
                    path = %req.path,
                    "Received request"
                );
                Ok(ConnectionState::Processing(req))
            }
            Err(e) => {
                tracing::warn!(peer = %self.peer, error = %e, "Rejecting malformed request");
                Ok(ConnectionState::Writing(Reply::Status(Response::bad_request())))
            }
        }
    }

    async fn handle_request(&self, req: &RequestLine) -> Reply {
        if req.method != Method::GET {
            return Reply::Status(Response::bad_request());
        }

        match files::open(&self.config.root, &req.path).await {
            Lookup::Found { file, len } => Reply::File { file, len },
            Lookup::Missing => Reply::Status(Response::not_found()),
            Lookup::Forbidden => {
                tracing::warn!(peer = %self.peer, path = %req.path, "Refusing path outside serving root");
                Reply::Status(Response::forbidden())
            }
        }
    }

    async fn write_reply(&mut self, reply: Reply) -> anyhow::Result<()> {
        let chunk_size = self.config.chunk_size;

        match reply {
            Reply::Status(response) => {
                let writer = self.writer_for(&response, chunk_size, 0);
                writer
                    .write_head(&mut self.stream)
                    .await
                    .context("Failed to send response head")?;

                tracing::info!(peer = %self.peer, status = response.status.as_u16(), "Response sent");
            }

            Reply::File { mut file, len } => {
                let response = Response::ok(len);
                let writer = self.writer_for(&response, chunk_size, len);
                writer
                    .write_head(&mut self.stream)
                    .await
                    .context("Failed to send response head")?;

                let sent = match writer.stream_body(&mut file, &mut self.stream).await {
                    Ok(sent) => sent,
                    Err(e) => {
                        tracing::warn!(peer = %self.peer, error = %e, "File transfer aborted");
                        return Err(anyhow::Error::new(e).context("Failed to send file content"));
                    }
                };

                if sent != len {
                    tracing::warn!(
                        peer = %self.peer,
                        declared = len,
                        sent,
                        "File length changed while streaming"
                    );
                }

                tracing::info!(peer = %self.peer, status = 200, bytes = sent, "Response sent");
            }
        }

        Ok(())
    }

    fn writer_for(&self, response: &Response, chunk_size: usize, body_len: u64) -> ResponseWriter {
        let writer = ResponseWriter::new(response, chunk_size);
        match self.config.framing {
            Framing::Plain => writer,
            Framing::LengthPrefixed => writer.with_length_prefix(self.config.byte_order, body_len),
        }
    }
}

use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::client::connector::{Connected, connect_first};
use crate::client::endpoint::{Endpoint, resolve};
use crate::client::target::Target;
use crate::config::{ClientConfig, Framing};
use crate::error::TransferError;
use crate::http::framing::{PlainReport, PrefixedReport, receive_length_prefixed, receive_plain};
use crate::http::request::encode_request;

/// Outcome of the receive half, per framing mode.
#[derive(Debug)]
pub enum BodyReport {
    Plain(PlainReport),
    LengthPrefixed(PrefixedReport),
}

impl BodyReport {
    pub fn body_bytes(&self) -> u64 {
        match self {
            BodyReport::Plain(report) => report.body_bytes,
            BodyReport::LengthPrefixed(report) => report.body_bytes,
        }
    }
}

#[derive(Debug)]
pub struct FetchReport {
    pub endpoint: Endpoint,
    pub attempts: usize,
    pub body: BodyReport,
}

/// Fetches one resource per call over a fresh connection.
pub struct Client {
    config: ClientConfig,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Fetches `target` into the sink the framing mode calls for.
    ///
    /// Plain mode writes to standard output. Length-prefixed mode writes the
    /// body to the configured output file, created after the connection is up.
    pub async fn run(&self, target: &Target) -> Result<FetchReport, TransferError> {
        let connected = self.connect(target).await?;

        match self.config.framing {
            Framing::Plain => {
                let mut stdout = tokio::io::stdout();
                self.exchange(connected, target, &mut stdout).await
            }
            Framing::LengthPrefixed => {
                let path = &self.config.output;
                let mut output = File::create(path).await.map_err(|source| TransferError::File {
                    path: path.clone(),
                    source,
                })?;

                let result = self.exchange(connected, target, &mut output).await;

                if let Err(e) = output.shutdown().await {
                    tracing::warn!(path = %path.display(), error = %e, "Closing output failed");
                }
                drop(output);

                result
            }
        }
    }

    /// Resolves and connects, then exchanges with `sink` as the body sink.
    pub async fn fetch_to<W>(&self, target: &Target, sink: &mut W) -> Result<FetchReport, TransferError>
    where
        W: AsyncWrite + Unpin,
    {
        let connected = self.connect(target).await?;
        self.exchange(connected, target, sink).await
    }

    pub async fn connect(&self, target: &Target) -> Result<Connected, TransferError> {
        let endpoints = resolve(&target.host, target.port).await?;
        connect_first(&endpoints).await
    }

    /// Sends the request and receives the response.
    ///
    /// The connection is consumed and closed on every path out of here.
    pub async fn exchange<W>(
        &self,
        connected: Connected,
        target: &Target,
        sink: &mut W,
    ) -> Result<FetchReport, TransferError>
    where
        W: AsyncWrite + Unpin,
    {
        let Connected {
            mut stream,
            endpoint,
            attempts,
        } = connected;

        let request = encode_request(&target.path, &target.host_header());
        let written = stream.write(&request).await.map_err(TransferError::Send)?;
        if written != request.len() {
            return Err(TransferError::ShortSend {
                written,
                expected: request.len(),
            });
        }
        tracing::debug!(endpoint = %endpoint, path = %target.path, bytes = written, "Request sent");

        let body = match self.config.framing {
            Framing::Plain => {
                BodyReport::Plain(receive_plain(&mut stream, sink, self.config.chunk_size).await?)
            }
            Framing::LengthPrefixed => {
                BodyReport::LengthPrefixed(receive_length_prefixed(&mut stream, sink, &self.config).await?)
            }
        };

        tracing::debug!(endpoint = %endpoint, bytes = body.body_bytes(), "Transfer complete");

        Ok(FetchReport {
            endpoint,
            attempts,
            body,
        })
    }
}

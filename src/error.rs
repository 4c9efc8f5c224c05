//! Error taxonomy shared by the client and the server workers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Longest host name accepted from a URL.
pub const MAX_HOST_LEN: usize = 255;

/// Longest request path accepted on either side of the wire.
pub const MAX_PATH_LEN: usize = 1023;

/// Failures of a single transfer.
///
/// Nothing is retried. On the client every variant ends the process, on the
/// server it ends one worker.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Bad arguments or an unsupported URL
    #[error("{0}")]
    Usage(String),

    #[error("host name is longer than {max} bytes")]
    HostTooLong { max: usize },

    #[error("path is longer than {max} bytes")]
    PathTooLong { max: usize },

    #[error("could not resolve {host}:{port}: {source}")]
    Resolution {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Every resolved endpoint refused or failed to connect
    #[error("failed to connect to any of {attempts} candidate endpoint(s)")]
    Connection { attempts: usize },

    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    #[error("short send: {written} of {expected} request bytes accepted")]
    ShortSend { written: usize, expected: usize },

    #[error("receive failed: {0}")]
    Recv(#[source] io::Error),

    #[error("writing output failed: {0}")]
    Write(#[source] io::Error),

    /// The length prefix could not be read in full
    #[error("framing error: {0}")]
    Framing(#[source] io::Error),

    #[error("cannot open {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    /// Process exit status for this failure.
    ///
    /// Connection exhaustion gets its own code so "no such host" and
    /// "host unreachable" can be told apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            TransferError::Connection { .. } => 2,
            _ => 1,
        }
    }
}

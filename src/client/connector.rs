use tokio::net::{TcpSocket, TcpStream};

use crate::client::endpoint::{AddressFamily, Endpoint};
use crate::error::TransferError;

/// An established connection and how it was reached.
#[derive(Debug)]
pub struct Connected {
    pub stream: TcpStream,
    pub endpoint: Endpoint,
    /// Candidates tried, the successful one included
    pub attempts: usize,
}

/// Connects to the first endpoint that accepts, trying them in order.
///
/// A failed attempt closes its socket before the next candidate is tried.
/// No candidate after the first success is touched.
pub async fn connect_first(endpoints: &[Endpoint]) -> Result<Connected, TransferError> {
    for (index, endpoint) in endpoints.iter().enumerate() {
        tracing::info!(endpoint = %endpoint, "Attempting connection");

        let socket = match endpoint.family {
            AddressFamily::V4 => TcpSocket::new_v4(),
            AddressFamily::V6 => TcpSocket::new_v6(),
        };
        let socket = match socket {
            Ok(socket) => socket,
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "Could not open socket");
                continue;
            }
        };

        match socket.connect(endpoint.socket_addr()).await {
            Ok(stream) => {
                tracing::info!(endpoint = %endpoint, attempt = index + 1, "Connected");
                return Ok(Connected {
                    stream,
                    endpoint: *endpoint,
                    attempts: index + 1,
                });
            }
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "Connection attempt failed");
            }
        }
    }

    tracing::error!(candidates = endpoints.len(), "Failed to connect");
    Err(TransferError::Connection {
        attempts: endpoints.len(),
    })
}

//! Address resolution.

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};

use tokio::net::lookup_host;

use crate::error::TransferError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

/// A resolved address a connection can be attempted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub family: AddressFamily,
    pub address: IpAddr,
    pub port: u16,
}

impl Endpoint {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        let family = match addr.ip() {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        };

        Self {
            family,
            address: addr.ip(),
            port: addr.port(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}

/// Resolves `host` into endpoints of every address family, in resolver order.
///
/// An empty answer is a failure too. Nothing is retried.
pub async fn resolve(host: &str, port: u16) -> Result<Vec<Endpoint>, TransferError> {
    let resolution_error = |source: io::Error| TransferError::Resolution {
        host: host.to_string(),
        port,
        source,
    };

    let endpoints: Vec<Endpoint> = lookup_host((host, port))
        .await
        .map_err(resolution_error)?
        .map(Endpoint::from)
        .collect();

    if endpoints.is_empty() {
        return Err(resolution_error(io::Error::new(
            io::ErrorKind::NotFound,
            "no addresses returned",
        )));
    }

    tracing::debug!(host, port, candidates = endpoints.len(), "Resolved host");
    Ok(endpoints)
}

/// Splits `host:port`, dropping brackets around an IPv6 host.
pub fn split_host_port(addr: &str) -> Option<(&str, u16)> {
    let (host, port) = addr.rsplit_once(':')?;
    let port = port.parse().ok()?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    Some((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_host_and_port() {
        assert_eq!(split_host_port("0.0.0.0:8080"), Some(("0.0.0.0", 8080)));
        assert_eq!(split_host_port("[::1]:9000"), Some(("::1", 9000)));
        assert_eq!(split_host_port("localhost"), None);
        assert_eq!(split_host_port("localhost:http"), None);
    }

    #[test]
    fn endpoint_family_follows_address() {
        let v6: Endpoint = "[::1]:80".parse::<SocketAddr>().unwrap().into();
        assert_eq!(v6.family, AddressFamily::V6);
        assert_eq!(v6.to_string(), "[::1]:80");
    }
}

use std::str::FromStr;

use url::{Host, Url};

use crate::error::{MAX_HOST_LEN, MAX_PATH_LEN, TransferError};

pub const DEFAULT_PORT: u16 = 80;

/// What to fetch: `http://host[:port]/path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Host to resolve, without IPv6 brackets
    pub host: String,
    pub port: u16,
    /// Everything from the first `/` after the authority, as written
    pub path: String,
    ipv6: bool,
}

impl Target {
    /// Parses a URL. Only `http://` is accepted and a path is required.
    ///
    /// The authority is checked with the `url` crate, but the path is taken
    /// from the raw input so that it reaches the request line unencoded and
    /// unnormalised. Over-long hosts and paths are rejected, never truncated.
    pub fn parse(raw: &str) -> Result<Self, TransferError> {
        let rest = raw
            .strip_prefix("http://")
            .ok_or_else(|| TransferError::Usage("Only http:// URLs are supported".to_string()))?;
        let slash = rest
            .find('/')
            .ok_or_else(|| TransferError::Usage("URL must contain a path".to_string()))?;
        let (authority, path) = rest.split_at(slash);

        let url = Url::parse(&format!("http://{}/", authority))
            .map_err(|e| TransferError::Usage(format!("Invalid URL {}: {}", raw, e)))?;

        let (host, ipv6) = match url.host() {
            Some(Host::Domain(domain)) => (domain.to_string(), false),
            Some(Host::Ipv4(addr)) => (addr.to_string(), false),
            Some(Host::Ipv6(addr)) => (addr.to_string(), true),
            None => return Err(TransferError::Usage("URL is missing a host".to_string())),
        };
        if host.len() > MAX_HOST_LEN {
            return Err(TransferError::HostTooLong { max: MAX_HOST_LEN });
        }

        if path.len() > MAX_PATH_LEN {
            return Err(TransferError::PathTooLong { max: MAX_PATH_LEN });
        }

        Ok(Self {
            host,
            port: url.port_or_known_default().unwrap_or(DEFAULT_PORT),
            path: path.to_string(),
            ipv6,
        })
    }

    /// Value of the `Host` header: the host name alone.
    pub fn host_header(&self) -> String {
        if self.ipv6 {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

impl FromStr for Target {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::parse(s)
    }
}

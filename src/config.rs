use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_CHUNK_SIZE: usize = 4096;
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 2048;
pub const DEFAULT_BACKLOG: u32 = 10;
pub const DEFAULT_OUTPUT: &str = "output";

/// How a response travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Framing {
    /// Status line, headers, blank line, body
    Plain,
    /// A `u32` total length followed by the plain response
    LengthPrefixed,
}

/// Byte order of the length prefix.
///
/// `Native` matches peers that write the prefix straight from memory and only
/// interoperates between like-endian hosts. `Network` is big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ByteOrder {
    Native,
    Network,
}

impl ByteOrder {
    pub fn encode(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::Native => value.to_ne_bytes(),
            ByteOrder::Network => value.to_be_bytes(),
        }
    }

    pub fn decode(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Native => u32::from_ne_bytes(bytes),
            ByteOrder::Network => u32::from_be_bytes(bytes),
        }
    }
}

/// How the client looks for the header/body delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DelimiterScan {
    /// Search every chunk on its own; a delimiter straddling two chunks is missed
    PerChunk,
    /// Carry the last three header bytes into the next search
    CarryOver,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Directory request paths are resolved against
    pub root: PathBuf,
    pub backlog: u32,
    pub max_request_size: usize,
    pub chunk_size: usize,
    pub framing: Framing,
    pub byte_order: ByteOrder,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            root: PathBuf::from("."),
            backlog: DEFAULT_BACKLOG,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            framing: Framing::Plain,
            byte_order: ByteOrder::Native,
        }
    }
}

impl ServerConfig {
    /// Builds the server configuration.
    ///
    /// Layers, last wins: built-in defaults, the YAML file if given,
    /// `FERRY_ROOT` from the environment, then the listening port.
    pub fn load(port: Option<&str>, file: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Ok(root) = std::env::var("FERRY_ROOT") {
            cfg.root = PathBuf::from(root);
        }

        if let Some(port) = port {
            cfg.listen_addr = format!("0.0.0.0:{}", port);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than zero");
        }
        if self.max_request_size == 0 {
            anyhow::bail!("max_request_size must be greater than zero");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Destination of length-prefixed downloads
    pub output: PathBuf,
    pub framing: Framing,
    pub byte_order: ByteOrder,
    pub delimiter_scan: DelimiterScan,
    pub chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            framing: Framing::Plain,
            byte_order: ByteOrder::Native,
            delimiter_scan: DelimiterScan::CarryOver,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ClientConfig {
    /// Defaults, then the YAML file if given, then `FERRY_OUTPUT`.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match file {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_yaml_str(&text)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => Self::default(),
        };

        if let Ok(output) = std::env::var("FERRY_OUTPUT") {
            cfg.output = PathBuf::from(output);
        }

        Ok(cfg)
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_yaml::from_str(text)?;
        if cfg.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than zero");
        }
        Ok(cfg)
    }
}

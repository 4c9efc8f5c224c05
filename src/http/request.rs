/// Request methods the server recognises.
///
/// Only `GET` is served. Anything else is answered with 400 Bad Request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// Any other token in the method position
    Other(String),
}

impl Method {
    /// Parses the method token. Case-sensitive, so `get` is not `GET`.
    ///
    /// # Example
    ///
    /// ```
    /// # use ferry::http::request::Method;
    /// assert_eq!(Method::parse("GET"), Method::GET);
    /// assert_eq!(Method::parse("get"), Method::Other("get".to_string()));
    /// ```
    pub fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::Other(token) => token.as_str(),
        }
    }
}

/// The first line of a request.
///
/// Built once per connection and never modified. Header lines that follow it
/// are not retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// The request method token
    pub method: Method,
    /// The request path exactly as sent (e.g., "/index.html")
    pub path: String,
    /// Protocol version token, not validated
    pub version: String,
}

pub const HTTP_VERSION: &str = "HTTP/1.1";

pub const USER_AGENT: &str = concat!("ferry/", env!("CARGO_PKG_VERSION"));

/// Builds the client's retrieval request.
///
/// The `Connection: Keep-Alive` line states intent only; the client never
/// reuses the connection.
pub fn encode_request(path: &str, host: &str) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(128 + path.len() + host.len());

    buffer.extend_from_slice(format!("GET {} {}\r\n", path, HTTP_VERSION).as_bytes());
    buffer.extend_from_slice(format!("User-Agent: {}\r\n", USER_AGENT).as_bytes());
    buffer.extend_from_slice(format!("Host: {}\r\n", host).as_bytes());
    buffer.extend_from_slice(b"Connection: Keep-Alive\r\n");

    // End of headers
    buffer.extend_from_slice(b"\r\n");

    buffer
}

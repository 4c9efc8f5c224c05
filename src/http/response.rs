/// Status codes the server emits.
///
/// - `Ok` (200): File found, body follows
/// - `BadRequest` (400): Method other than GET, or an unparseable request line
/// - `Forbidden` (403): Path escapes the serving root
/// - `NotFound` (404): No readable file at that path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
}

impl StatusCode {
    /// Returns the numeric status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use ferry::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
        }
    }

    /// Returns the reason phrase sent after the code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
        }
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            200 => Some(StatusCode::Ok),
            400 => Some(StatusCode::BadRequest),
            403 => Some(StatusCode::Forbidden),
            404 => Some(StatusCode::NotFound),
            _ => None,
        }
    }
}

/// Status line and headers of an outgoing response.
///
/// The body is never held here; the writer streams it separately. Headers
/// keep insertion order so the wire format is stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The status code
    pub status: StatusCode,
    /// Header lines in the order they are sent
    pub headers: Vec<(String, String)>,
}

/// Builder for response heads.
///
/// # Example
///
/// ```ignore
/// let head = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Length", "12")
///     .header("Connection", "close")
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    /// Adds a header, replacing an earlier one with the same name.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();

        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some(existing) => existing.1 = value,
            None => self.headers.push((key, value)),
        }
        self
    }

    pub fn build(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
        }
    }
}

impl Response {
    /// 200 OK announcing a body of `content_length` bytes.
    pub fn ok(content_length: u64) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Length", content_length.to_string())
            .header("Connection", "close")
            .build()
    }

    /// 400 Bad Request, no headers and no body.
    pub fn bad_request() -> Self {
        ResponseBuilder::new(StatusCode::BadRequest).build()
    }

    /// 403 Forbidden with an empty body.
    pub fn forbidden() -> Self {
        ResponseBuilder::new(StatusCode::Forbidden)
            .header("Connection", "close")
            .build()
    }

    /// 404 Not Found with an empty body.
    pub fn not_found() -> Self {
        ResponseBuilder::new(StatusCode::NotFound)
            .header("Connection", "close")
            .build()
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// A response header block as the client received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    pub code: u16,
    pub reason: String,
    /// Declared body length, if a `Content-Length` line was present
    pub content_length: Option<u64>,
}

impl ResponseHeader {
    pub fn status(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.code)
    }
}

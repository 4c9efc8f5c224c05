use crate::error::MAX_PATH_LEN;
use crate::http::request::{Method, RequestLine};
use crate::http::response::ResponseHeader;

/// Marker between the header block and the body.
pub const DELIMITER: &[u8; 4] = b"\r\n\r\n";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("request line is missing a method or path")]
    InvalidRequest,
    #[error("path is longer than {max} bytes")]
    PathTooLong { max: usize },
    #[error("status line is malformed")]
    InvalidStatusLine,
    #[error("status code is not a number")]
    InvalidStatusCode,
    #[error("text is not valid UTF-8")]
    InvalidEncoding,
}

/// Parses the request line at the start of `buf`.
///
/// Only the first line is looked at; header lines are ignored. The first
/// token is the method. When at least two more tokens follow, the last one
/// is the version and everything between is the path, so a path may contain
/// spaces. The version is optional and never checked.
pub fn parse_request_line(buf: &[u8]) -> Result<RequestLine, ParseError> {
    let end = buf.iter().position(|&b| b == b'\n').unwrap_or(buf.len());
    let line = std::str::from_utf8(&buf[..end]).map_err(|_| ParseError::InvalidEncoding)?;

    let (method, rest) = line
        .trim()
        .split_once(char::is_whitespace)
        .ok_or(ParseError::InvalidRequest)?;
    let rest = rest.trim_start();

    let (path, version) = match rest.rsplit_once(char::is_whitespace) {
        Some((path, version)) => (path.trim_end(), version),
        None => (rest, ""),
    };

    if path.len() > MAX_PATH_LEN {
        return Err(ParseError::PathTooLong { max: MAX_PATH_LEN });
    }

    Ok(RequestLine {
        method: Method::parse(method),
        path: path.to_string(),
        version: version.to_string(),
    })
}

/// Parses a response header block (status line plus header lines).
///
/// The trailing delimiter may or may not be included. Only `Content-Length`
/// is interpreted; other header lines are skipped.
pub fn parse_response_header(buf: &[u8]) -> Result<ResponseHeader, ParseError> {
    let text = std::str::from_utf8(buf).map_err(|_| ParseError::InvalidEncoding)?;
    let mut lines = text.split("\r\n");

    let status_line = lines.next().ok_or(ParseError::InvalidStatusLine)?;
    let mut parts = status_line.splitn(3, ' ');

    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(ParseError::InvalidStatusLine);
    }

    let code = parts
        .next()
        .ok_or(ParseError::InvalidStatusLine)?
        .parse::<u16>()
        .map_err(|_| ParseError::InvalidStatusCode)?;
    let reason = parts.next().unwrap_or_default().trim().to_string();

    let mut content_length = None;
    for line in lines {
        if line.is_empty() {
            break;
        }

        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("Content-Length") {
                content_length = value.trim().parse::<u64>().ok();
            }
        }
    }

    Ok(ResponseHeader {
        code,
        reason,
        content_length,
    })
}

/// Position of the first delimiter in `buf`.
pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(DELIMITER.len())
        .position(|w| w == DELIMITER)
}

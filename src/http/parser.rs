use crate::http::request::{Method, Request};

/// Bodies longer than this are cut down and flagged as truncated
pub const MAX_BODY_SIZE: usize = 1024;

/// Longest accepted request path
pub const MAX_PATH_LEN: usize = 255;

const LINE_END: &[u8] = b"\r\n";
const HEADERS_END: &[u8] = b"\r\n\r\n";

/// Why a buffer could not be parsed as a request.
///
/// Every variant is a malformed request: the connection answers with an
/// error response and keeps reading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no line terminator in request")]
    MissingLineTerminator,

    #[error("request line is not valid UTF-8")]
    InvalidEncoding,

    #[error("request line has no path")]
    MissingPath,

    #[error("path does not start with '/'")]
    InvalidPath,

    #[error("path longer than {} bytes", MAX_PATH_LEN)]
    PathTooLong,
}

/// Parses one request from a single receive buffer.
///
/// The buffer is assumed to hold the whole request; there is no reassembly
/// across reads.
pub fn parse_request(buf: &[u8]) -> Result<Request<'_>, ParseError> {
    let line_end = find(buf, LINE_END).ok_or(ParseError::MissingLineTerminator)?;

    let request_line = std::str::from_utf8(&buf[..line_end])
        .map_err(|_| ParseError::InvalidEncoding)?;

    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or(ParseError::MissingPath)?;
    let path = parts.next().ok_or(ParseError::MissingPath)?;

    if !path.starts_with('/') {
        return Err(ParseError::InvalidPath);
    }
    if path.len() > MAX_PATH_LEN {
        return Err(ParseError::PathTooLong);
    }

    // The blank line may directly follow the request line, in which case
    // the separator starts at `line_end`.
    let headers_start = line_end + LINE_END.len();
    let (headers, body) = match find(buf, HEADERS_END) {
        Some(sep) => {
            let headers = if sep > headers_start { &buf[headers_start..sep] } else { &[][..] };
            (headers, &buf[sep + HEADERS_END.len()..])
        }
        None => (&buf[headers_start..], &[][..]),
    };

    let body_truncated = body.len() > MAX_BODY_SIZE;
    let body = &body[..body.len().min(MAX_BODY_SIZE)];

    Ok(Request {
        method: Method::from_token(method),
        path,
        headers,
        body,
        body_truncated,
    })
}

pub(crate) fn find(buf: &[u8], needle: &[u8]) -> Option<usize> {
    buf.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_request() {
        let req = parse_request(b"GET /status\r\n\r\n").unwrap();

        assert_eq!(req.method, Method::GET);
        assert_eq!(req.path, "/status");
        assert!(req.headers.is_empty());
        assert!(req.body.is_empty());
        assert!(!req.body_truncated);
    }

    #[test]
    fn find_locates_first_match() {
        assert_eq!(find(b"ab\r\ncd\r\n", b"\r\n"), Some(2));
        assert_eq!(find(b"abc", b"\r\n"), None);
        assert_eq!(find(b"", b"\r\n"), None);
    }
}

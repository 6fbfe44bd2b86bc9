use std::fmt;

/// Request methods.
///
/// Recognized verbs plus `Unknown` for any other token. Routing decides what
/// each method is allowed to do; parsing never rejects a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// Any other token
    Unknown,
}

impl Method {
    /// Maps a request-line token to a method.
    ///
    /// Matching is case-sensitive; unrecognized tokens become `Unknown`.
    ///
    /// # Example
    ///
    /// ```
    /// # use turnstile::http::request::Method;
    /// assert_eq!(Method::from_token("GET"), Method::GET);
    /// assert_eq!(Method::from_token("get"), Method::Unknown);
    /// ```
    pub fn from_token(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            _ => Method::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed request borrowing from the receive buffer.
///
/// `headers` and `body` are slices of the original bytes; nothing is copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<'buf> {
    /// The request method
    pub method: Method,
    /// The request path, always starting with `/`
    pub path: &'buf str,
    /// Raw header block between the request line and the blank line
    pub headers: &'buf [u8],
    /// Request body, at most `MAX_BODY_SIZE` bytes
    pub body: &'buf [u8],
    /// Set when the body was cut down to `MAX_BODY_SIZE`
    pub body_truncated: bool,
}

impl<'buf> Request<'buf> {
    /// Looks up a header in the raw header block (name is case-insensitive).
    pub fn header(&self, name: &str) -> Option<&'buf str> {
        let block = std::str::from_utf8(self.headers).ok()?;

        block
            .split("\r\n")
            .filter_map(|line| line.split_once(':'))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim())
    }

    /// The body as text, if it is valid UTF-8.
    pub fn body_str(&self) -> Option<&'buf str> {
        std::str::from_utf8(self.body).ok()
    }
}

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::parser::find;
use crate::http::response::Response;

const PROTOCOL_VERSION: &str = "HTTP/1.1";

/// Serializes a response as `STATUS-LINE CRLF [headers] CRLF body`.
pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64 + resp.body.len());

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        PROTOCOL_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf.extend_from_slice(&resp.body);

    buf
}

/// A response as seen by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedResponse {
    pub code: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("no header/body separator")]
    MissingSeparator,

    #[error("invalid status line")]
    InvalidStatusLine,
}

/// Parses serialized response bytes back into their parts.
pub fn decode_response(buf: &[u8]) -> Result<DecodedResponse, DecodeError> {
    let sep = find(buf, b"\r\n\r\n").ok_or(DecodeError::MissingSeparator)?;
    let head = std::str::from_utf8(&buf[..sep]).map_err(|_| DecodeError::InvalidStatusLine)?;

    let mut lines = head.split("\r\n");
    let status_line = lines.next().ok_or(DecodeError::InvalidStatusLine)?;

    let mut parts = status_line.splitn(3, ' ');
    let _version = parts.next().ok_or(DecodeError::InvalidStatusLine)?;
    let code = parts
        .next()
        .and_then(|c| c.parse::<u16>().ok())
        .ok_or(DecodeError::InvalidStatusLine)?;
    let reason = parts.next().unwrap_or_default().to_string();

    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    Ok(DecodedResponse {
        code,
        reason,
        headers,
        body: buf[sep + 4..].to_vec(),
    })
}

/// Holds a serialized response until the connection writes it.
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response),
            written: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Issues a single write call.
    ///
    /// Returns the number of bytes accepted. A short write is not retried.
    pub async fn write_once<W>(&mut self, stream: &mut W) -> std::io::Result<usize>
    where
        W: AsyncWrite + Unpin,
    {
        let n = stream.write(&self.buffer[self.written..]).await?;
        if n == 0 && !self.is_empty() {
            return Err(std::io::ErrorKind::WriteZero.into());
        }

        self.written += n;
        Ok(n)
    }
}

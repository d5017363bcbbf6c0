use std::collections::hash_map::Entry;
use std::collections::HashMap;

use bytes::{Buf, BytesMut};

use crate::http::request::{Method, RequestHead};

/// Request heads larger than this are rejected.
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Longest chunk-size line (size plus extensions) the decoder will buffer.
pub const MAX_CHUNK_LINE: usize = 4 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid request line")]
    InvalidRequest,
    #[error("invalid method token")]
    InvalidMethod,
    #[error("invalid header line")]
    InvalidHeader,
    #[error("invalid Content-Length")]
    InvalidContentLength,
    #[error("invalid chunked body")]
    InvalidChunk,
    #[error("request head too large")]
    HeadTooLarge,
    #[error("incomplete request")]
    Incomplete,
}

/// Parses the request line and headers at the start of `buf`.
///
/// Returns the head and the number of bytes it occupied, separator included.
/// The body, if any, is left for the caller to read.
pub fn parse_request_head(buf: &[u8]) -> Result<(RequestHead, usize), ParseError> {
    let headers_end = match find_headers_end(buf) {
        Some(end) => end,
        None if buf.len() > MAX_HEAD_SIZE => return Err(ParseError::HeadTooLarge),
        None => return Err(ParseError::Incomplete),
    };

    let headers_str = std::str::from_utf8(&buf[..headers_end])
        .map_err(|_| ParseError::InvalidRequest)?;

    let mut lines = headers_str.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let mut parts = request_line.split_whitespace();

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let target = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;

    if parts.next().is_some() || !version.starts_with("HTTP/") {
        return Err(ParseError::InvalidRequest);
    }

    let method = Method::from_str(method_str).ok_or(ParseError::InvalidMethod)?;

    // Headers
    let mut headers: HashMap<String, String> = HashMap::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once(':')
            .ok_or(ParseError::InvalidHeader)?;

        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match headers.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value.to_string());
            }
            // Two lengths that disagree leave the body boundary ambiguous.
            Entry::Occupied(slot) if slot.key() == "content-length" => {
                if slot.get() != value {
                    return Err(ParseError::InvalidContentLength);
                }
            }
            Entry::Occupied(mut slot) => {
                let joined = slot.get_mut();
                joined.push_str(", ");
                joined.push_str(value);
            }
        }
    }

    let head = RequestHead {
        method,
        target: target.to_string(),
        version: version.to_string(),
        headers,
    };

    if let Some(len) = head.header("content-length") {
        len.parse::<usize>()
            .map_err(|_| ParseError::InvalidContentLength)?;
    }

    Ok((head, headers_end + 4))
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
}

fn find_line_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2)
        .position(|w| w == b"\r\n")
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    #[default]
    Size,
    Data(usize),
    DataEnd,
    Trailers,
    Done,
}

/// Incremental decoder for `Transfer-Encoding: chunked` bodies.
///
/// Feed it the connection buffer as data arrives; it consumes whatever
/// complete framing it finds and keeps the decoded bytes.
///
/// Framing is bounded too: a size line longer than [`MAX_CHUNK_LINE`] or
/// trailers longer than [`MAX_HEAD_SIZE`] are rejected as invalid.
#[derive(Debug, Default)]
pub struct ChunkedDecoder {
    body: Vec<u8>,
    state: ChunkState,
    trailer_len: usize,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes chunk framing from `buf`.
    ///
    /// Returns `Ok(true)` once the terminating chunk and trailers are read,
    /// `Ok(false)` when more data is needed. Bytes after the end of the body
    /// stay in `buf`.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<bool, ParseError> {
        loop {
            match self.state {
                ChunkState::Size => {
                    let Some(end) = find_line_end(buf) else {
                        if buf.len() > MAX_CHUNK_LINE {
                            return Err(ParseError::InvalidChunk);
                        }
                        return Ok(false);
                    };
                    if end > MAX_CHUNK_LINE {
                        return Err(ParseError::InvalidChunk);
                    }
                    let line = buf.split_to(end + 2);
                    let line = std::str::from_utf8(&line[..end])
                        .map_err(|_| ParseError::InvalidChunk)?;

                    // Chunk extensions after ';' are ignored.
                    let size = line.split(';').next().unwrap_or_default().trim();
                    let size = usize::from_str_radix(size, 16)
                        .map_err(|_| ParseError::InvalidChunk)?;

                    self.state = if size == 0 {
                        ChunkState::Trailers
                    } else {
                        ChunkState::Data(size)
                    };
                }

                ChunkState::Data(remaining) => {
                    if buf.is_empty() {
                        return Ok(false);
                    }
                    let n = remaining.min(buf.len());
                    self.body.extend_from_slice(&buf[..n]);
                    buf.advance(n);

                    self.state = if n == remaining {
                        ChunkState::DataEnd
                    } else {
                        ChunkState::Data(remaining - n)
                    };
                }

                ChunkState::DataEnd => {
                    if buf.len() < 2 {
                        return Ok(false);
                    }
                    if &buf[..2] != b"\r\n" {
                        return Err(ParseError::InvalidChunk);
                    }
                    buf.advance(2);
                    self.state = ChunkState::Size;
                }

                ChunkState::Trailers => {
                    let pending = find_line_end(buf).map_or(buf.len(), |end| end + 2);
                    if self.trailer_len + pending > MAX_HEAD_SIZE {
                        return Err(ParseError::InvalidChunk);
                    }
                    let Some(end) = find_line_end(buf) else {
                        return Ok(false);
                    };
                    self.trailer_len += end + 2;
                    buf.advance(end + 2);
                    if end == 0 {
                        self.state = ChunkState::Done;
                    }
                }

                ChunkState::Done => return Ok(true),
            }
        }
    }

    /// Number of body bytes decoded so far.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Encodes `resp` as an HTTP/1.1 message.
///
/// Headers go out sorted by name so the same response always produces the
/// same bytes.
fn encode(resp: &Response) -> Bytes {
    let mut headers: Vec<_> = resp.headers.iter().collect();
    headers.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut buf = BytesMut::with_capacity(128 + resp.body.len());
    buf.put_slice(format!("{} {}\r\n", HTTP_VERSION, resp.status).as_bytes());

    for (name, value) in headers {
        buf.put_slice(name.as_bytes());
        buf.put_slice(b": ");
        buf.put_slice(value.as_bytes());
        buf.put_slice(b"\r\n");
    }

    buf.put_slice(b"\r\n");
    buf.put_slice(&resp.body);
    buf.freeze()
}

/// A finalized response waiting to go out on the socket.
pub struct ResponseWriter {
    pending: Bytes,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            pending: encode(response),
        }
    }

    /// The bytes not yet written, status line through body before the
    /// first write.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pending
    }

    /// Writes the remaining bytes, resuming after partial writes, and flushes.
    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.pending.has_remaining() {
            if stream.write_buf(&mut self.pending).await? == 0 {
                anyhow::bail!("connection closed while writing");
            }
        }

        stream.flush().await?;
        Ok(())
    }
}

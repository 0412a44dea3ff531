//! Streaming HTTP transport.
//!
//! Issues the signed POST and exposes the response body as a [`ByteCursor`]:
//! an exclusively-owned, append-only read cursor the frame decoder pulls
//! exact byte counts from. The body is never materialized; each `read` call
//! suspends until enough bytes arrive or the connection ends. Dropping the
//! cursor drops the underlying response body and releases the connection, so
//! abandonment behaves exactly like completion.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt};
use std::env;
use std::pin::Pin;
use std::time::Duration;

use crate::signing::SignedRequest;
use crate::{Error, Result};

/// The raw byte source a cursor reads from.
pub type ByteStream =
    Pin<Box<dyn Stream<Item = std::result::Result<Bytes, TransportError>> + Send + 'static>>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Other(String),
}

/// HTTP transport for signed Bedrock requests.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        // Connect timeout only. A whole-request timeout would kill long
        // generations mid-stream; a stalled-but-open connection is the
        // caller's problem to bound (documented design gap).
        let connect_timeout_secs = env::var("BEDROCK_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10);

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self { client })
    }

    /// Send a signed streaming request and return a cursor over its body.
    ///
    /// A non-success status before any frame bytes is a [`TransportError`];
    /// the error body text is captured for observability.
    pub async fn open(&self, request: SignedRequest) -> Result<ByteCursor> {
        let response = self.send(request).await?;
        let stream = response.bytes_stream().map_err(TransportError::Http);
        Ok(ByteCursor::new(Box::pin(stream)))
    }

    /// Send a signed request and parse the complete response body as JSON.
    /// Used by the non-streaming title call.
    pub async fn execute(&self, request: SignedRequest) -> Result<serde_json::Value> {
        let response = self.send(request).await?;
        let json = response
            .json()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;
        Ok(json)
    }

    async fn send(&self, request: SignedRequest) -> Result<reqwest::Response> {
        let mut req = self
            .client
            .request(
                request.method.parse().unwrap_or(reqwest::Method::POST),
                &request.url,
            )
            .body(request.body);
        for (name, value) in &request.headers {
            req = req.header(name, value);
        }

        let response = req
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transport(TransportError::Status {
                status: status.as_u16(),
                body,
            }));
        }
        Ok(response)
    }
}

/// Exclusively-owned read cursor over a response body.
///
/// Advances monotonically; never seeks backward. Holds only the bytes the
/// upstream has pushed beyond what the decoder consumed so far, which in
/// practice is bounded by one transport chunk plus one partial frame.
pub struct ByteCursor {
    inner: ByteStream,
    buf: BytesMut,
}

impl ByteCursor {
    pub fn new(inner: ByteStream) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
        }
    }

    /// Read exactly `n` bytes, suspending until they arrive.
    ///
    /// Returns fewer than `n` bytes (possibly zero) only when the stream
    /// ends first; distinguishing clean end-of-stream from a truncated frame
    /// is the decoder's job, since only it knows whether more bytes were
    /// promised.
    pub async fn read(&mut self, n: usize) -> Result<Bytes> {
        while self.buf.len() < n {
            match self.inner.next().await {
                Some(Ok(chunk)) => self.buf.extend_from_slice(&chunk),
                Some(Err(e)) => return Err(Error::Transport(e)),
                None => break,
            }
        }
        let take = n.min(self.buf.len());
        Ok(self.buf.split_to(take).freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn cursor_over(chunks: Vec<&'static [u8]>) -> ByteCursor {
        let s = stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, TransportError>(Bytes::from_static(c))),
        );
        ByteCursor::new(Box::pin(s))
    }

    #[tokio::test]
    async fn test_read_spans_chunk_boundaries() {
        let mut cursor = cursor_over(vec![b"ab", b"cd", b"ef"]);
        assert_eq!(cursor.read(3).await.unwrap().as_ref(), b"abc");
        assert_eq!(cursor.read(3).await.unwrap().as_ref(), b"def");
    }

    #[tokio::test]
    async fn test_short_read_only_at_end_of_stream() {
        let mut cursor = cursor_over(vec![b"abcde"]);
        assert_eq!(cursor.read(4).await.unwrap().len(), 4);
        assert_eq!(cursor.read(4).await.unwrap().as_ref(), b"e");
        assert!(cursor.read(4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let s = stream::iter(vec![
            Ok(Bytes::from_static(b"ab")),
            Err(TransportError::Other("reset".into())),
        ]);
        let mut cursor = ByteCursor::new(Box::pin(s));
        assert!(matches!(
            cursor.read(4).await,
            Err(Error::Transport(TransportError::Other(_)))
        ));
    }
}

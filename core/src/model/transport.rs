//! HTTP transport
//!
//! A fetch-like seam between the client and the network. [ReqwestTransport]
//! is the production implementation; tests plug in scripted doubles.

use std::error::Error as _;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt, stream};
use reqwest::Client;
use thiserror::Error;

use super::provider::{HttpMethod, WireRequest};

/// Byte chunks of a response body
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Network-level failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
  #[error("connection refused: {0}")]
  ConnectionRefused(String),

  #[error("DNS resolution failed: {0}")]
  Dns(String),

  #[error("request timed out: {0}")]
  Timeout(String),

  #[error("{0}")]
  Network(String),
}

/// Response head plus a lazily read body
pub struct TransportResponse {
  pub status: u16,
  pub status_text: String,
  pub body: ByteStream,
}

impl std::fmt::Debug for TransportResponse {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TransportResponse")
      .field("status", &self.status)
      .field("status_text", &self.status_text)
      .finish_non_exhaustive()
  }
}

impl TransportResponse {
  /// Response whose body is delivered as the given chunks
  pub fn from_chunks<I, C>(status: u16, chunks: I) -> Self
  where
    I: IntoIterator<Item = C>,
    C: Into<Bytes>,
  {
    let chunks: Vec<Result<Bytes, TransportError>> =
      chunks.into_iter().map(|chunk| Ok(chunk.into())).collect();
    Self {
      status,
      status_text: status_text(status),
      body: Box::pin(stream::iter(chunks)),
    }
  }

  pub fn ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Read the whole body
  pub async fn bytes(self) -> Result<Vec<u8>, TransportError> {
    let chunks: Vec<Bytes> = self.body.try_collect().await?;
    Ok(chunks.concat())
  }

  pub async fn text(self) -> Result<String, TransportError> {
    let bytes = self.bytes().await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
  }
}

/// Network transport contract
#[async_trait]
pub trait HttpTransport: Send + Sync {
  /// Dispatch one request and return once the response head arrives
  async fn send(&self, request: &WireRequest) -> Result<TransportResponse, TransportError>;
}

/// Transport backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
  client: Client,
}

impl ReqwestTransport {
  pub fn new() -> Self {
    Self {
      client: create_client(),
    }
  }

  pub fn with_client(client: Client) -> Self {
    Self { client }
  }
}

impl Default for ReqwestTransport {
  fn default() -> Self {
    Self::new()
  }
}

/// Deadlines are applied per call by the client, not on the connection pool.
fn create_client() -> Client {
  Client::builder()
    .build()
    .unwrap_or_else(|_| Client::new())
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
  async fn send(&self, request: &WireRequest) -> Result<TransportResponse, TransportError> {
    let mut builder = match request.method {
      HttpMethod::Get => self.client.get(request.url.clone()),
      HttpMethod::Post => self.client.post(request.url.clone()),
    };
    for (name, value) in &request.headers {
      builder = builder.header(name, value);
    }
    if let Some(body) = &request.body {
      builder = builder.body(body.to_string());
    }

    let response = builder.send().await.map_err(classify)?;
    let status = response.status();
    let body = response.bytes_stream().map(|chunk| chunk.map_err(classify));

    Ok(TransportResponse {
      status: status.as_u16(),
      status_text: status.canonical_reason().unwrap_or_default().to_string(),
      body: Box::pin(body),
    })
  }
}

fn status_text(status: u16) -> String {
  reqwest::StatusCode::from_u16(status)
    .ok()
    .and_then(|code| code.canonical_reason())
    .unwrap_or_default()
    .to_string()
}

/// Map a reqwest failure onto the transport taxonomy by walking its source chain.
fn classify(err: reqwest::Error) -> TransportError {
  let message = err.to_string();
  if err.is_timeout() {
    return TransportError::Timeout(message);
  }

  let mut source = err.source();
  while let Some(cause) = source {
    if let Some(io) = cause.downcast_ref::<std::io::Error>() {
      if io.kind() == std::io::ErrorKind::ConnectionRefused {
        return TransportError::ConnectionRefused(message);
      }
    }
    let text = cause.to_string().to_ascii_lowercase();
    if text.contains("dns error") || text.contains("failed to lookup address") {
      return TransportError::Dns(message);
    }
    if text.contains("connection refused") {
      return TransportError::ConnectionRefused(message);
    }
    source = cause.source();
  }

  TransportError::Network(message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[tokio::test]
  async fn test_chunked_body_is_concatenated() {
    let response = TransportResponse::from_chunks(200, ["hel", "lo"]);
    assert!(response.ok());
    assert_eq!(response.status_text, "OK");
    assert_eq!(response.text().await.expect("text"), "hello");
  }

  #[tokio::test]
  async fn test_status_text_for_errors() {
    let response = TransportResponse::from_chunks(429, Vec::<Bytes>::new());
    assert!(!response.ok());
    assert_eq!(response.status_text, "Too Many Requests");
  }

  #[tokio::test]
  async fn test_refused_connection_is_classified() {
    // Bind then drop to find a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let url = url::Url::parse(&format!("http://127.0.0.1:{port}/api/generate")).expect("url");
    let err = ReqwestTransport::new()
      .send(&WireRequest::get(url))
      .await
      .expect_err("nothing is listening");
    assert!(matches!(err, TransportError::ConnectionRefused(_)), "{err:?}");
  }
}

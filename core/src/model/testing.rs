//! Scripted transport double for unit tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use serde_json::Value;

use super::provider::WireRequest;
use super::transport::{HttpTransport, TransportError, TransportResponse};

pub enum Reply {
  Chunks(u16, Vec<String>),
  Fail(TransportError),
  /// Never answers
  Hang,
  /// 200 head, then these chunks, then a body that never ends
  Stall(Vec<String>),
}

impl Reply {
  pub fn json(status: u16, body: Value) -> Self {
    Reply::Chunks(status, vec![body.to_string()])
  }

  pub fn sse(chunks: &[&str]) -> Self {
    Reply::Chunks(200, chunks.iter().map(|c| c.to_string()).collect())
  }
}

/// Answers requests from a queue and records what was sent
#[derive(Default)]
pub struct ScriptedTransport {
  replies: Mutex<VecDeque<Reply>>,
  requests: Mutex<Vec<WireRequest>>,
}

impl ScriptedTransport {
  pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
    Self {
      replies: Mutex::new(replies.into_iter().collect()),
      requests: Mutex::new(Vec::new()),
    }
  }

  pub fn requests(&self) -> Vec<WireRequest> {
    self.requests.lock().expect("requests lock").clone()
  }

  pub fn calls(&self) -> usize {
    self.requests.lock().expect("requests lock").len()
  }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
  async fn send(&self, request: &WireRequest) -> Result<TransportResponse, TransportError> {
    self.requests.lock().expect("requests lock").push(request.clone());
    let reply = self.replies.lock().expect("replies lock").pop_front();
    match reply {
      Some(Reply::Chunks(status, chunks)) => Ok(TransportResponse::from_chunks(status, chunks)),
      Some(Reply::Fail(err)) => Err(err),
      Some(Reply::Hang) => futures::future::pending().await,
      Some(Reply::Stall(chunks)) => {
        let mut response = TransportResponse::from_chunks(200, Vec::<Bytes>::new());
        let head = stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))));
        response.body = Box::pin(head.chain(stream::pending()));
        Ok(response)
      }
      None => Err(TransportError::Network("no scripted reply".to_string())),
    }
  }
}

//! Generic Bearer Adapter
//!
//! OpenAI body shape with the classic `max_tokens` field. The response shape
//! is unknown up front, so every known shape is tried in a fixed order.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use super::super::provider::{ParsedResponse, ProviderAdapter, RequestContext, fallback_text};
use super::super::types::ConversationTurn;
use super::{
  AnthropicAdapter, GoogleAdapter, OpenAiAdapter, bearer_headers, chat_messages, object_at,
};

pub struct GenericAdapter;

impl ProviderAdapter for GenericAdapter {
  fn build_body(&self, turns: &[ConversationTurn], ctx: &RequestContext<'_>) -> Value {
    json!({
      "model": ctx.model,
      "messages": chat_messages(turns),
      "stream": ctx.stream,
      "max_tokens": ctx.max_tokens,
    })
  }

  fn headers(&self, credential: &str) -> BTreeMap<String, String> {
    if credential.is_empty() {
      BTreeMap::new()
    } else {
      bearer_headers(credential)
    }
  }

  fn parse_response(&self, body: &Value) -> ParsedResponse {
    if let Some(text) = OpenAiAdapter::message_text(body) {
      return ParsedResponse {
        text: text.to_string(),
        usage: object_at(body, "usage"),
      };
    }
    if let Some(text) = AnthropicAdapter::block_text(body) {
      return ParsedResponse {
        text,
        usage: object_at(body, "usage"),
      };
    }
    if body.pointer("/candidates/0").is_some() {
      return GoogleAdapter.parse_response(body);
    }
    ParsedResponse {
      text: fallback_text(body),
      usage: object_at(body, "usage"),
    }
  }

  fn stream_delta<'a>(&self, event: &'a Value) -> Option<&'a str> {
    event
      .get("response")
      .and_then(Value::as_str)
      .or_else(|| OpenAiAdapter::delta_text(event))
      .or_else(|| AnthropicAdapter::delta_text(event))
      .or_else(|| GoogleAdapter::candidate_text(event))
  }
}

#[cfg(test)]
mod tests {
  use super::super::fixtures;
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_body_uses_max_tokens() {
    let body = GenericAdapter.build_body(&fixtures::system_user(), &fixtures::ctx(false));
    assert_eq!(
      body,
      json!({
        "model": "test-model",
        "messages": [
          {"role": "system", "content": "S"},
          {"role": "user", "content": "U"}
        ],
        "stream": false,
        "max_tokens": 4096
      })
    );
  }

  #[test]
  fn test_bearer_only_with_credential() {
    assert!(GenericAdapter.headers("").is_empty());
    assert_eq!(
      GenericAdapter.headers("tok").get("Authorization").map(String::as_str),
      Some("Bearer tok")
    );
  }

  #[test]
  fn test_parse_tries_known_shapes() {
    let openai = json!({"choices": [{"message": {"content": "X"}}]});
    assert_eq!(GenericAdapter.parse_response(&openai).text, "X");

    let anthropic = json!({"content": [{"text": "Y"}]});
    assert_eq!(GenericAdapter.parse_response(&anthropic).text, "Y");

    let google = json!({"candidates": [{"content": {"parts": [{"text": "Z"}]}}]});
    assert_eq!(GenericAdapter.parse_response(&google).text, "Z");

    let unknown = json!({"message": {"content": "W"}});
    assert_eq!(GenericAdapter.parse_response(&unknown).text, "W");
  }

  #[test]
  fn test_stream_delta_shapes() {
    assert_eq!(GenericAdapter.stream_delta(&json!({"response": "o"})), Some("o"));
    assert_eq!(
      GenericAdapter.stream_delta(&json!({"choices": [{"delta": {"content": "p"}}]})),
      Some("p")
    );
    assert_eq!(GenericAdapter.stream_delta(&json!({"id": 1})), None);
  }
}

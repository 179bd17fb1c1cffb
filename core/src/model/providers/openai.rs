//! OpenAI Adapter
//!
//! Chat completions with the newer `max_completion_tokens` limit field.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use super::super::provider::{ParsedResponse, ProviderAdapter, RequestContext, fallback_text};
use super::super::types::ConversationTurn;
use super::{bearer_headers, chat_messages, object_at, str_at};

pub struct OpenAiAdapter;

impl OpenAiAdapter {
  /// `choices[0].message.content`, when the body has that shape
  pub(crate) fn message_text(body: &Value) -> Option<&str> {
    str_at(body, "/choices/0/message/content")
  }

  pub(crate) fn delta_text(event: &Value) -> Option<&str> {
    str_at(event, "/choices/0/delta/content")
  }
}

impl ProviderAdapter for OpenAiAdapter {
  fn build_body(&self, turns: &[ConversationTurn], ctx: &RequestContext<'_>) -> Value {
    json!({
      "model": ctx.model,
      "messages": chat_messages(turns),
      "stream": ctx.stream,
      "max_completion_tokens": ctx.max_tokens,
    })
  }

  fn headers(&self, credential: &str) -> BTreeMap<String, String> {
    bearer_headers(credential)
  }

  fn parse_response(&self, body: &Value) -> ParsedResponse {
    let text = Self::message_text(body)
      .map(str::to_string)
      .unwrap_or_else(|| fallback_text(body));
    ParsedResponse {
      text,
      usage: object_at(body, "usage"),
    }
  }

  fn stream_delta<'a>(&self, event: &'a Value) -> Option<&'a str> {
    Self::delta_text(event)
  }
}

#[cfg(test)]
mod tests {
  use super::super::fixtures;
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_body_keeps_system_message() {
    let body = OpenAiAdapter.build_body(&fixtures::system_user(), &fixtures::ctx(true));
    assert_eq!(
      body,
      json!({
        "model": "test-model",
        "messages": [
          {"role": "system", "content": "S"},
          {"role": "user", "content": "U"}
        ],
        "stream": true,
        "max_completion_tokens": 4096
      })
    );
  }

  #[test]
  fn test_headers() {
    let headers = OpenAiAdapter.headers("sk-test");
    assert_eq!(headers.get("Authorization").map(String::as_str), Some("Bearer sk-test"));
    assert_eq!(headers.len(), 1);
  }

  #[test]
  fn test_parse_choices() {
    let parsed = OpenAiAdapter.parse_response(&json!({
      "choices": [{"message": {"role": "assistant", "content": "X"}}],
      "usage": {"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3}
    }));
    assert_eq!(parsed.text, "X");
    assert_eq!(
      parsed.usage,
      Some(json!({"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3}))
    );
  }

  #[test]
  fn test_stream_delta() {
    let event = json!({"choices": [{"delta": {"content": "a"}}]});
    assert_eq!(OpenAiAdapter.stream_delta(&event), Some("a"));
    assert_eq!(OpenAiAdapter.stream_delta(&json!({"choices": [{"delta": {}}]})), None);
  }
}

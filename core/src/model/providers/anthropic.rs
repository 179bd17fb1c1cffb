//! Anthropic Adapter
//!
//! Messages API. The system prompt travels as a top-level field.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use super::super::provider::{ParsedResponse, ProviderAdapter, RequestContext, fallback_text};
use super::super::types::{ConversationTurn, Role};
use super::{chat_messages, object_at, str_at};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicAdapter;

impl AnthropicAdapter {
  /// Concatenated `text` of every content block, when `content` is a block array
  pub(crate) fn block_text(body: &Value) -> Option<String> {
    let blocks = body.get("content")?.as_array()?;
    Some(
      blocks
        .iter()
        .map(|block| block.get("text").and_then(Value::as_str).unwrap_or_default())
        .collect(),
    )
  }

  pub(crate) fn delta_text(event: &Value) -> Option<&str> {
    if event.get("type").and_then(Value::as_str) != Some("content_block_delta") {
      return None;
    }
    str_at(event, "/delta/text")
  }
}

impl ProviderAdapter for AnthropicAdapter {
  fn build_body(&self, turns: &[ConversationTurn], ctx: &RequestContext<'_>) -> Value {
    let system = turns.iter().find(|turn| turn.role == Role::System);
    let messages = chat_messages(turns.iter().filter(|turn| turn.role != Role::System));

    let mut body = json!({
      "model": ctx.model,
      "messages": messages,
      "stream": ctx.stream,
      "max_tokens": ctx.max_tokens,
    });
    if let (Some(system), Some(fields)) = (system, body.as_object_mut()) {
      fields.insert("system".to_string(), Value::String(system.content.clone()));
    }
    body
  }

  fn headers(&self, credential: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
      ("x-api-key".to_string(), credential.to_string()),
      ("anthropic-version".to_string(), ANTHROPIC_VERSION.to_string()),
    ])
  }

  fn parse_response(&self, body: &Value) -> ParsedResponse {
    ParsedResponse {
      text: Self::block_text(body).unwrap_or_else(|| fallback_text(body)),
      usage: object_at(body, "usage"),
    }
  }

  fn stream_delta<'a>(&self, event: &'a Value) -> Option<&'a str> {
    Self::delta_text(event)
  }

  /// `message_start` carries input counts, `message_delta` the output counts.
  fn stream_usage(&self, event: &Value, current: &mut Option<Value>) {
    let usage = event
      .pointer("/message/usage")
      .or_else(|| event.get("usage"))
      .and_then(Value::as_object);
    let Some(usage) = usage else {
      return;
    };

    let mut merged = current
      .take()
      .and_then(|value| match value {
        Value::Object(map) => Some(map),
        _ => None,
      })
      .unwrap_or_else(Map::new);
    for (key, value) in usage {
      merged.insert(key.clone(), value.clone());
    }
    *current = Some(Value::Object(merged));
  }
}

//! Google Adapter
//!
//! generateContent. There is no system role; assistant turns are `model`.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use super::super::provider::{ParsedResponse, ProviderAdapter, RequestContext, fallback_text};
use super::super::types::{ConversationTurn, Role};
use super::{bearer_headers, object_at, str_at};

pub struct GoogleAdapter;

impl GoogleAdapter {
  pub(crate) fn candidate_text(body: &Value) -> Option<&str> {
    str_at(body, "/candidates/0/content/parts/0/text")
  }

  fn role(role: Role) -> &'static str {
    match role {
      Role::System | Role::User => "user",
      Role::Assistant => "model",
    }
  }
}

impl ProviderAdapter for GoogleAdapter {
  fn build_body(&self, turns: &[ConversationTurn], ctx: &RequestContext<'_>) -> Value {
    let contents: Vec<Value> = turns
      .iter()
      .map(|turn| json!({"role": Self::role(turn.role), "parts": [{"text": turn.content}]}))
      .collect();

    json!({
      "model": ctx.model,
      "contents": contents,
      "generationConfig": {"maxOutputTokens": ctx.max_tokens},
      "stream": ctx.stream,
    })
  }

  fn headers(&self, credential: &str) -> BTreeMap<String, String> {
    bearer_headers(credential)
  }

  fn parse_response(&self, body: &Value) -> ParsedResponse {
    let text = match body.pointer("/candidates/0") {
      Some(_) => Self::candidate_text(body).unwrap_or_default().to_string(),
      None => fallback_text(body),
    };
    ParsedResponse {
      text,
      usage: object_at(body, "usageMetadata"),
    }
  }

  fn stream_delta<'a>(&self, event: &'a Value) -> Option<&'a str> {
    Self::candidate_text(event)
  }

  fn stream_usage(&self, event: &Value, current: &mut Option<Value>) {
    if let Some(usage) = object_at(event, "usageMetadata") {
      *current = Some(usage);
    }
  }
}

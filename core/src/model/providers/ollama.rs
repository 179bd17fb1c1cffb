//! Ollama Adapter
//!
//! Local generate endpoint. Turns are flattened into one prompt string.

use std::collections::BTreeMap;

use serde_json::{Value, json};
use url::{Host, Url};

use super::super::provider::{ParsedResponse, ProviderAdapter, RequestContext, fallback_text};
use super::super::types::ConversationTurn;

pub struct OllamaAdapter;

impl OllamaAdapter {
  /// `"Role: content\n\n"` per turn, then the `Assistant:` cue
  pub fn build_prompt(turns: &[ConversationTurn]) -> String {
    let mut prompt = String::new();
    for turn in turns {
      prompt.push_str(turn.role.label());
      prompt.push_str(": ");
      prompt.push_str(&turn.content);
      prompt.push_str("\n\n");
    }
    prompt.push_str("Assistant:");
    prompt
  }

  /// Rewrite a literal `localhost` host to `127.0.0.1`. Ollama binds IPv4 only
  /// by default.
  pub fn loopback_url(url: &Url) -> Url {
    let mut rewritten = url.clone();
    if url.host() == Some(Host::Domain("localhost")) {
      // Only fails for cannot-be-a-base URLs, which have no host to match.
      let _ = rewritten.set_host(Some("127.0.0.1"));
    }
    rewritten
  }

  fn usage(body: &Value) -> Value {
    let count = |key: &str| body.get(key).and_then(Value::as_u64).unwrap_or(0);
    let prompt_tokens = count("prompt_eval_count");
    let completion_tokens = count("eval_count");
    json!({
      "prompt_tokens": prompt_tokens,
      "completion_tokens": completion_tokens,
      "total_tokens": prompt_tokens + completion_tokens,
    })
  }
}

impl ProviderAdapter for OllamaAdapter {
  fn build_body(&self, turns: &[ConversationTurn], ctx: &RequestContext<'_>) -> Value {
    json!({
      "model": ctx.model,
      "prompt": Self::build_prompt(turns),
      "stream": ctx.stream,
    })
  }

  fn headers(&self, _credential: &str) -> BTreeMap<String, String> {
    BTreeMap::new()
  }

  fn request_url(&self, endpoint: &Url) -> Url {
    Self::loopback_url(endpoint)
  }

  fn parse_response(&self, body: &Value) -> ParsedResponse {
    let text = body
      .get("response")
      .and_then(Value::as_str)
      .map(str::to_string)
      .unwrap_or_else(|| fallback_text(body));
    ParsedResponse {
      text,
      usage: Some(Self::usage(body)),
    }
  }

  fn stream_delta<'a>(&self, event: &'a Value) -> Option<&'a str> {
    event.get("response").and_then(Value::as_str)
  }

  fn stream_usage(&self, event: &Value, current: &mut Option<Value>) {
    if event.get("done").and_then(Value::as_bool) == Some(true) {
      *current = Some(Self::usage(event));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::super::fixtures;
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_prompt_concatenation() {
    assert_eq!(
      OllamaAdapter::build_prompt(&fixtures::system_user()),
      "System: S\n\nUser: U\n\nAssistant:"
    );
    assert_eq!(OllamaAdapter::build_prompt(&[]), "Assistant:");
  }

  #[test]
  fn test_body_and_headers() {
    let mut ctx = fixtures::ctx(true);
    ctx.model = "llama3";
    let body = OllamaAdapter.build_body(&[ConversationTurn::user("hi")], &ctx);
    assert_eq!(
      body,
      json!({"model": "llama3", "prompt": "User: hi\n\nAssistant:", "stream": true})
    );
    assert!(OllamaAdapter.headers("ignored").is_empty());
  }

  #[test]
  fn test_localhost_rewrite() {
    let url = Url::parse("http://localhost:11434/api/generate").expect("url");
    let rewritten = OllamaAdapter.request_url(&url);
    assert_eq!(rewritten.as_str(), "http://127.0.0.1:11434/api/generate");

    let remote = Url::parse("http://gpu-box:11434/api/generate").expect("url");
    assert_eq!(OllamaAdapter.request_url(&remote), remote);
  }

  #[test]
  fn test_parse_usage() {
    let parsed = OllamaAdapter.parse_response(&json!({
      "response": "ok", "prompt_eval_count": 10, "eval_count": 4, "done": true
    }));
    assert_eq!(parsed.text, "ok");
    assert_eq!(
      parsed.usage,
      Some(json!({"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}))
    );

    let missing = OllamaAdapter.parse_response(&json!({"response": "x"}));
    assert_eq!(missing.usage.map(|u| u["total_tokens"].clone()), Some(json!(0)));
  }
}

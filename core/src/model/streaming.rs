//! Streaming normalizer
//!
//! Accepts SSE (`data: {...}`) and newline-delimited JSON in the same pass.

use serde_json::Value;

use super::provider::ProviderAdapter;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Cumulative-text progress callback
pub type ProgressCallback<'a> = &'a mut (dyn FnMut(&str) + Send);

/// Stateful line parser over a chunked body.
pub struct StreamAccumulator {
  adapter: &'static dyn ProviderAdapter,
  buffer: Vec<u8>,
  text: String,
  usage: Option<Value>,
}

impl StreamAccumulator {
  pub fn new(adapter: &'static dyn ProviderAdapter) -> Self {
    Self {
      adapter,
      buffer: Vec::new(),
      text: String::new(),
      usage: None,
    }
  }

  /// Feeds one chunk. Complete lines are parsed; a trailing partial line waits for the next chunk.
  pub fn push(&mut self, chunk: &[u8], on_update: &mut (dyn FnMut(&str) + Send)) {
    self.buffer.extend_from_slice(chunk);
    while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
      let line: Vec<u8> = self.buffer.drain(..=pos).collect();
      self.process_line(&line, on_update);
    }
  }

  /// Flushes an unterminated last line at end-of-body.
  pub fn finish(&mut self, on_update: &mut (dyn FnMut(&str) + Send)) {
    if self.buffer.is_empty() {
      return;
    }
    let line = std::mem::take(&mut self.buffer);
    self.process_line(&line, on_update);
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn into_parts(self) -> (String, Option<Value>) {
    (self.text, self.usage)
  }

  fn process_line(&mut self, raw: &[u8], on_update: &mut (dyn FnMut(&str) + Send)) {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    if line.is_empty() {
      return;
    }

    let delta = if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
      let payload = payload.trim_start();
      if payload == DONE_SENTINEL {
        return;
      }
      let Ok(event) = serde_json::from_str::<Value>(payload) else {
        tracing::trace!("skipping malformed stream line");
        return;
      };
      self.adapter.stream_usage(&event, &mut self.usage);
      self.adapter.stream_delta(&event).map(str::to_string)
    } else if line.starts_with('{') {
      let Ok(event) = serde_json::from_str::<Value>(line) else {
        tracing::trace!("skipping malformed stream line");
        return;
      };
      self.adapter.stream_usage(&event, &mut self.usage);
      self
        .adapter
        .stream_delta(&event)
        .or_else(|| event.get("text").and_then(Value::as_str))
        .or_else(|| event.get("content").and_then(Value::as_str))
        .map(str::to_string)
    } else {
      None
    };

    if let Some(delta) = delta.filter(|d| !d.is_empty()) {
      self.text.push_str(&delta);
      on_update(&self.text);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::provider::ProviderKind;
  use pretty_assertions::assert_eq;

  fn run(kind: ProviderKind, chunks: &[&str]) -> (Vec<String>, String, Option<Value>) {
    let mut seen = Vec::new();
    let mut on_update = |text: &str| seen.push(text.to_string());
    let mut acc = StreamAccumulator::new(kind.adapter());
    for chunk in chunks {
      acc.push(chunk.as_bytes(), &mut on_update);
    }
    acc.finish(&mut on_update);
    let (text, usage) = acc.into_parts();
    (seen, text, usage)
  }

  fn openai_delta(text: &str) -> String {
    format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{text}\"}}}}]}}\n\n")
  }

  #[test]
  fn test_cumulative_updates() {
    let chunks = [
      openai_delta("a"),
      openai_delta("b"),
      openai_delta("c"),
      "data: [DONE]\n\n".to_string(),
    ];
    let chunks: Vec<&str> = chunks.iter().map(String::as_str).collect();
    let (seen, text, _) = run(ProviderKind::OpenAi, &chunks);
    assert_eq!(seen, vec!["a", "ab", "abc"]);
    assert_eq!(text, "abc");
  }

  #[test]
  fn test_malformed_line_is_skipped() {
    let chunks = [openai_delta("a"), "data: {not json\n\n".to_string(), openai_delta("b")];
    let chunks: Vec<&str> = chunks.iter().map(String::as_str).collect();
    let (seen, text, _) = run(ProviderKind::OpenAi, &chunks);
    assert_eq!(seen, vec!["a", "ab"]);
    assert_eq!(text, "ab");
  }

  #[test]
  fn test_lines_split_across_chunks() {
    let (seen, text, _) = run(
      ProviderKind::OpenAi,
      &["data: {\"choices\":[{\"del", "ta\":{\"content\":\"héllo\"}}]}\n", "\n"],
    );
    assert_eq!(seen, vec!["héllo"]);
    assert_eq!(text, "héllo");
  }

  #[test]
  fn test_ollama_ndjson_with_usage() {
    let (seen, text, usage) = run(
      ProviderKind::Ollama,
      &[
        "{\"response\":\"Hi\",\"done\":false}\n{\"response\":\" there\",\"done\":false}\n",
        "{\"response\":\"\",\"done\":true,\"prompt_eval_count\":3,\"eval_count\":2}",
      ],
    );
    assert_eq!(seen, vec!["Hi", "Hi there"]);
    assert_eq!(text, "Hi there");
    assert_eq!(usage.map(|u| u["total_tokens"].clone()), Some(serde_json::json!(5)));
  }

  #[test]
  fn test_anthropic_events() {
    let (seen, text, usage) = run(
      ProviderKind::Anthropic,
      &[
        "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"usage\":{\"input_tokens\":4}}}\n\n",
        "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"x\"}}\n\n",
        "event: message_delta\ndata: {\"type\":\"message_delta\",\"usage\":{\"output_tokens\":1}}\n\n",
      ],
    );
    assert_eq!(seen, vec!["x"]);
    assert_eq!(text, "x");
    assert_eq!(usage, Some(serde_json::json!({"input_tokens": 4, "output_tokens": 1})));
  }

  #[test]
  fn test_raw_json_text_field() {
    let (_, text, _) = run(
      ProviderKind::GenericBearer,
      &["{\"text\":\"t\"}\n{\"content\":\"u\"}\n"],
    );
    assert_eq!(text, "tu");
  }

  #[test]
  fn test_crlf_framing() {
    let (_, text, _) = run(
      ProviderKind::Google,
      &["data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"g\"}]}}]}\r\n\r\n"],
    );
    assert_eq!(text, "g");
  }
}

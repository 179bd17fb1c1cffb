//! Provider adapters
//!
//! One unit struct per wire protocol, selected through
//! [ProviderKind::adapter](super::provider::ProviderKind::adapter).

use std::collections::BTreeMap;

use serde_json::{Value, json};

use super::types::ConversationTurn;

pub mod anthropic;
pub mod generic;
pub mod google;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicAdapter;
pub use generic::GenericAdapter;
pub use google::GoogleAdapter;
pub use ollama::OllamaAdapter;
pub use openai::OpenAiAdapter;

/// `[{role, content}]` in conversation order
pub(crate) fn chat_messages<'a>(
  turns: impl IntoIterator<Item = &'a ConversationTurn>,
) -> Vec<Value> {
  turns
    .into_iter()
    .map(|turn| json!({"role": turn.role.as_str(), "content": turn.content}))
    .collect()
}

pub(crate) fn bearer_headers(credential: &str) -> BTreeMap<String, String> {
  BTreeMap::from([("Authorization".to_string(), format!("Bearer {credential}"))])
}

pub(crate) fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
  value.pointer(pointer).and_then(Value::as_str)
}

pub(crate) fn object_at(value: &Value, key: &str) -> Option<Value> {
  value.get(key).filter(|v| v.is_object()).cloned()
}

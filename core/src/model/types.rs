//! Model layer types
//!
//! Conversation turns going in, the unified chat result coming out.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ChatError, ErrorCode};

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  System,
  User,
  Assistant,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::System => "system",
      Role::User => "user",
      Role::Assistant => "assistant",
    }
  }

  /// Capitalized label used in flattened prompts
  pub fn label(&self) -> &'static str {
    match self {
      Role::System => "System",
      Role::User => "User",
      Role::Assistant => "Assistant",
    }
  }
}

/// One turn in an ordered conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
  pub role: Role,
  pub content: String,
}

impl ConversationTurn {
  pub fn new(role: Role, content: impl Into<String>) -> Self {
    Self {
      role,
      content: content.into(),
    }
  }

  pub fn system(content: impl Into<String>) -> Self {
    Self::new(Role::System, content)
  }

  pub fn user(content: impl Into<String>) -> Self {
    Self::new(Role::User, content)
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    Self::new(Role::Assistant, content)
  }
}

/// A block of response text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
  pub text: String,
}

/// Where a response came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
  /// Model name the request was sent with
  pub model: String,
  /// Display name of the provider profile
  pub provider: String,
  /// Token usage as reported by the provider
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub usage: Option<Value>,
}

/// Successful chat call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
  pub content: Vec<ContentBlock>,
  pub metadata: ResponseMetadata,
}

impl ChatResponse {
  pub fn new(text: impl Into<String>, metadata: ResponseMetadata) -> Self {
    Self {
      content: vec![ContentBlock { text: text.into() }],
      metadata,
    }
  }

  /// Concatenated response text
  pub fn text(&self) -> String {
    self
      .content
      .iter()
      .map(|block| block.text.as_str())
      .collect()
  }

  /// Normalized view of the reported usage
  pub fn token_usage(&self) -> Option<TokenUsage> {
    self.metadata.usage.as_ref().and_then(TokenUsage::from_value)
  }
}

/// Result of every chat call; callers never branch on provider type
pub type ChatResult = std::result::Result<ChatResponse, ChatError>;

/// Token counts recognized across the provider usage shapes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
  pub input_tokens: u64,
  pub output_tokens: u64,
  pub total_tokens: u64,
}

impl TokenUsage {
  pub fn from_value(value: &Value) -> Option<Self> {
    let input_tokens =
      first_count(value, &["prompt_tokens", "input_tokens", "promptTokenCount"]).unwrap_or(0);
    let output_tokens =
      first_count(value, &["completion_tokens", "output_tokens", "candidatesTokenCount"])
        .unwrap_or(0);
    let total_tokens = first_count(value, &["total_tokens", "totalTokenCount"])
      .unwrap_or(input_tokens + output_tokens);

    if input_tokens == 0 && output_tokens == 0 && total_tokens == 0 {
      return None;
    }

    Some(Self {
      input_tokens,
      output_tokens,
      total_tokens,
    })
  }
}

fn first_count(value: &Value, keys: &[&str]) -> Option<u64> {
  keys
    .iter()
    .find_map(|key| value.get(*key).and_then(Value::as_u64))
}

/// `{success, data | error}` envelope for UI layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatOutcome {
  pub success: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<ChatResponse>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub code: Option<ErrorCode>,
}

impl From<ChatResult> for ChatOutcome {
  fn from(result: ChatResult) -> Self {
    match result {
      Ok(response) => Self {
        success: true,
        data: Some(response),
        error: None,
        code: None,
      },
      Err(err) => Self {
        success: false,
        data: None,
        error: Some(err.to_string()),
        code: Some(err.code()),
      },
    }
  }
}

/// Successful connection probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionReport {
  pub message: String,
}

/// `{success, message | error}` envelope for connection probes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOutcome {
  pub success: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub code: Option<ErrorCode>,
}

impl From<std::result::Result<ConnectionReport, ChatError>> for ConnectionOutcome {
  fn from(result: std::result::Result<ConnectionReport, ChatError>) -> Self {
    match result {
      Ok(report) => Self {
        success: true,
        message: Some(report.message),
        error: None,
        code: None,
      },
      Err(err) => Self {
        success: false,
        message: None,
        error: Some(err.to_string()),
        code: Some(err.code()),
      },
    }
  }
}

//! Provider variants
//!
//! [ProviderKind] is resolved once per configuration load. Each kind maps to a
//! [ProviderAdapter] that builds the wire request and normalizes responses.

use std::collections::BTreeMap;

use daxchat_config::{ProviderConfiguration, ProviderType};
use serde_json::{Map, Value};
use url::Url;

use super::error::{ChatError, Result};
use super::providers::{
  AnthropicAdapter, GenericAdapter, GoogleAdapter, OllamaAdapter, OpenAiAdapter,
};
use super::types::ConversationTurn;

const OPENAI_HOST: &str = "openai.com";
const ANTHROPIC_HOST: &str = "anthropic.com";
const GOOGLE_HOST: &str = "googleapis.com";

/// Closed set of wire protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
  OpenAi,
  Anthropic,
  Google,
  Ollama,
  GenericBearer,
}

impl ProviderKind {
  /// Declared types win; `generic-bearer` is upgraded by the endpoint host.
  pub fn resolve(provider_type: ProviderType, endpoint_url: &str) -> Self {
    match provider_type {
      ProviderType::Ollama => ProviderKind::Ollama,
      ProviderType::OpenaiCompatible => ProviderKind::OpenAi,
      ProviderType::Anthropic => ProviderKind::Anthropic,
      ProviderType::Google => ProviderKind::Google,
      ProviderType::GenericBearer => Self::from_host(endpoint_url),
    }
  }

  pub fn for_config(config: &ProviderConfiguration) -> Self {
    Self::resolve(config.provider_type, &config.endpoint_url)
  }

  fn from_host(endpoint_url: &str) -> Self {
    let host = Url::parse(endpoint_url)
      .ok()
      .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
      .unwrap_or_default();
    let matches = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

    if matches(OPENAI_HOST) {
      ProviderKind::OpenAi
    } else if matches(ANTHROPIC_HOST) {
      ProviderKind::Anthropic
    } else if matches(GOOGLE_HOST) {
      ProviderKind::Google
    } else {
      ProviderKind::GenericBearer
    }
  }

  pub fn adapter(&self) -> &'static dyn ProviderAdapter {
    match self {
      ProviderKind::OpenAi => &OpenAiAdapter,
      ProviderKind::Anthropic => &AnthropicAdapter,
      ProviderKind::Google => &GoogleAdapter,
      ProviderKind::Ollama => &OllamaAdapter,
      ProviderKind::GenericBearer => &GenericAdapter,
    }
  }

  pub fn is_ollama(&self) -> bool {
    matches!(self, ProviderKind::Ollama)
  }
}

/// Everything an adapter needs to build one request
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
  pub model: &'a str,
  pub credential: &'a str,
  pub max_tokens: u32,
  pub stream: bool,
}

/// Per-provider request adapter and response normalizer
pub trait ProviderAdapter: Send + Sync {
  /// Request body for the ordered turns
  fn build_body(&self, turns: &[ConversationTurn], ctx: &RequestContext<'_>) -> Value;

  /// Provider headers, excluding `Content-Type`
  fn headers(&self, credential: &str) -> BTreeMap<String, String>;

  /// Endpoint the request is dispatched to
  fn request_url(&self, endpoint: &Url) -> Url {
    endpoint.clone()
  }

  /// Text and usage from a buffered response body
  fn parse_response(&self, body: &Value) -> ParsedResponse;

  /// Incremental text carried by one `data:` payload
  fn stream_delta<'a>(&self, event: &'a Value) -> Option<&'a str>;

  /// Usage reported inside the stream, merged into `current`
  fn stream_usage(&self, event: &Value, current: &mut Option<Value>) {
    if let Some(usage) = event.get("usage").filter(|u| u.is_object()) {
      *current = Some(usage.clone());
    }
  }

  /// Build the complete wire request
  fn build_request(
    &self,
    endpoint: &Url,
    turns: &[ConversationTurn],
    ctx: &RequestContext<'_>,
  ) -> WireRequest {
    let mut headers = self.headers(ctx.credential);
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    WireRequest {
      method: HttpMethod::Post,
      url: self.request_url(endpoint),
      headers,
      body: Some(self.build_body(turns, ctx)),
    }
  }
}

/// Normalized buffered response
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
  pub text: String,
  pub usage: Option<Value>,
}

/// Text for bodies no provider shape recognizes
pub fn fallback_text(body: &Value) -> String {
  if let Some(text) = body.get("text").and_then(Value::as_str) {
    return text.to_string();
  }
  if let Some(text) = body.pointer("/message/content").and_then(Value::as_str) {
    return text.to_string();
  }
  if let Some(text) = body.get("message").and_then(Value::as_str) {
    return text.to_string();
  }
  body.to_string()
}

/// Parse the profile endpoint
pub fn parse_endpoint(endpoint_url: &str) -> Result<Url> {
  Url::parse(endpoint_url.trim()).map_err(|e| {
    ChatError::InvalidConfiguration(format!("invalid endpoint URL {endpoint_url}: {e}"))
  })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
  Get,
  Post,
}

impl HttpMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      HttpMethod::Get => "GET",
      HttpMethod::Post => "POST",
    }
  }
}

/// A fully adapted request, ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
  pub method: HttpMethod,
  pub url: Url,
  pub headers: BTreeMap<String, String>,
  pub body: Option<Value>,
}

impl WireRequest {
  pub fn get(url: Url) -> Self {
    Self {
      method: HttpMethod::Get,
      url,
      headers: BTreeMap::new(),
      body: None,
    }
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(key, _)| key.eq_ignore_ascii_case(name))
      .map(|(_, value)| value.as_str())
  }

  /// The same request with `max_completion_tokens` renamed to `max_tokens`
  pub fn legacy_token_fallback(&self) -> Option<WireRequest> {
    let body = self.body.as_ref()?.as_object()?;
    let limit = body.get("max_completion_tokens")?.clone();

    let mut fallback: Map<String, Value> = body.clone();
    fallback.remove("max_completion_tokens");
    fallback.insert("max_tokens".to_string(), limit);

    Some(WireRequest {
      body: Some(Value::Object(fallback)),
      ..self.clone()
    })
  }
}

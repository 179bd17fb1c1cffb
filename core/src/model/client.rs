//! API client
//!
//! One entry point for every provider: resolve the active profile, adapt the
//! request, send it, and normalize whatever comes back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use daxchat_config::{ClientSettings, ConfigStore, ModelDescriptor, ProviderConfiguration};
use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::{ChatError, Result};
use super::provider::{ProviderKind, RequestContext, WireRequest, parse_endpoint};
use super::resolver::{ActiveConfiguration, ConfigurationResolver};
use super::streaming::{ProgressCallback, StreamAccumulator};
use super::transport::{HttpTransport, TransportError, TransportResponse};
use super::types::{ChatResponse, ChatResult, ConversationTurn, ResponseMetadata};

const UNNAMED_CONFIGURATION: &str = "Unnamed Configuration";

const OLLAMA_REFUSED: &str =
  "Cannot connect to Ollama. Make sure Ollama is running and try: curl http://localhost:11434/api/generate";
const OLLAMA_SLOW: &str = "Your model might be too large or slow. Try a smaller/faster model.";
const OLLAMA_UNRESOLVED: &str =
  "Cannot resolve the Ollama host. Make sure Ollama is running on localhost:11434";

/// Per-call deadline and cancellation
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
  /// Overrides the per-provider default deadline
  pub timeout: Option<Duration>,
  pub cancel: Option<CancellationToken>,
}

impl CallOptions {
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
    self.cancel = Some(cancel);
    self
  }
}

/// Multi-provider chat client
pub struct ApiClient {
  resolver: ConfigurationResolver,
  pub(super) transport: Arc<dyn HttpTransport>,
  pub(super) settings: ClientSettings,
}

impl ApiClient {
  /// Create an unconfigured client; call [ApiClient::reload] to read the store.
  pub fn new(
    store: Arc<dyn ConfigStore>,
    transport: Arc<dyn HttpTransport>,
    settings: ClientSettings,
  ) -> Self {
    Self {
      resolver: ConfigurationResolver::new(store),
      transport,
      settings,
    }
  }

  /// Create and load the active configuration
  pub async fn load(
    store: Arc<dyn ConfigStore>,
    transport: Arc<dyn HttpTransport>,
    settings: ClientSettings,
  ) -> Self {
    let client = Self::new(store, transport, settings);
    client.reload().await;
    client
  }

  pub fn settings(&self) -> &ClientSettings {
    &self.settings
  }

  /// Re-read the active configuration, returning whether the client is usable
  pub async fn reload(&self) -> bool {
    self
      .resolver
      .reload()
      .await
      .is_some_and(|active| active.is_configured())
  }

  pub fn is_configured(&self) -> bool {
    self
      .resolver
      .current()
      .is_some_and(|active| active.is_configured())
  }

  pub fn available_models(&self) -> Vec<ModelDescriptor> {
    self
      .resolver
      .current()
      .map(|active| active.config.models.clone())
      .unwrap_or_default()
  }

  pub fn current_model(&self) -> Option<String> {
    self.resolver.current().and_then(|active| active.model_name.clone())
  }

  pub fn config_name(&self) -> String {
    match self.resolver.current() {
      Some(active) => display_name(&active.config),
      None => UNNAMED_CONFIGURATION.to_string(),
    }
  }

  pub fn provider_kind(&self) -> Option<ProviderKind> {
    self.resolver.current().map(|active| active.kind)
  }

  pub fn active_configuration(&self) -> Option<Arc<ActiveConfiguration>> {
    self.resolver.current()
  }

  /// Activate a stored profile, then reload
  pub async fn set_active_config(
    &self,
    id: &str,
    model_name: Option<&str>,
  ) -> daxchat_config::Result<()> {
    self.resolver.store().set_active(id, model_name).await?;
    self.reload().await;
    Ok(())
  }

  /// Pin a model on the active profile, then reload
  pub async fn set_selected_model(&self, model_name: &str) -> daxchat_config::Result<()> {
    self.resolver.store().set_selected_model(model_name).await?;
    self.reload().await;
    Ok(())
  }

  /// Send a conversation. Supplying `on_update` switches to streaming; it is
  /// called with the cumulative text after every delta.
  pub async fn send_message(
    &self,
    turns: &[ConversationTurn],
    on_update: Option<ProgressCallback<'_>>,
  ) -> ChatResult {
    self
      .send_message_with(turns, on_update, CallOptions::default())
      .await
  }

  pub async fn send_message_with(
    &self,
    turns: &[ConversationTurn],
    on_update: Option<ProgressCallback<'_>>,
    options: CallOptions,
  ) -> ChatResult {
    let Some(active) = self.resolver.current().filter(|a| a.is_configured()) else {
      return Err(ChatError::NotConfigured);
    };

    let kind = active.kind;
    let model = active.model_name.clone().unwrap_or_default();
    let endpoint = parse_endpoint(&active.config.endpoint_url)?;
    let ctx = RequestContext {
      model: &model,
      credential: active.config.credential_str(),
      max_tokens: self.settings.max_output_tokens,
      stream: on_update.is_some(),
    };
    let request = kind.adapter().build_request(&endpoint, turns, &ctx);
    let deadline = options.timeout.unwrap_or_else(|| self.default_timeout(kind));

    debug!(
      kind = ?kind,
      model = %model,
      turns = turns.len(),
      stream = ctx.stream,
      "Sending chat request"
    );

    let exchange = async move {
      let response = self.dispatch(kind, &request).await?;
      match on_update {
        Some(on_update) => read_stream(kind, response, on_update).await,
        None => read_buffered(kind, response).await,
      }
    };
    let (text, usage) = guarded(exchange, deadline, options.cancel.as_ref(), kind).await?;

    Ok(ChatResponse::new(
      text,
      ResponseMetadata {
        model,
        provider: display_name(&active.config),
        usage,
      },
    ))
  }

  fn default_timeout(&self, kind: ProviderKind) -> Duration {
    if kind.is_ollama() {
      self.settings.ollama_timeout()
    } else {
      self.settings.hosted_timeout()
    }
  }

  /// Send with the one-shot OpenAI `max_tokens` fallback
  pub(super) async fn dispatch(
    &self,
    kind: ProviderKind,
    request: &WireRequest,
  ) -> Result<TransportResponse> {
    let response = self.send(kind, request).await?;
    if response.ok() {
      return Ok(response);
    }

    let (status, message) = rejection(response).await;
    if kind == ProviderKind::OpenAi && mentions_token_limit(&message) {
      if let Some(retry) = request.legacy_token_fallback() {
        warn!(status, "Retrying with max_tokens parameter for older OpenAI model");
        let response = self.send(kind, &retry).await?;
        if response.ok() {
          return Ok(response);
        }
        let (status, message) = rejection(response).await;
        return Err(ChatError::Rejected { status, message });
      }
    }

    Err(ChatError::Rejected { status, message })
  }

  async fn send(&self, kind: ProviderKind, request: &WireRequest) -> Result<TransportResponse> {
    debug!(method = request.method.as_str(), url = %request.url, "Dispatching request");
    self
      .transport
      .send(request)
      .await
      .map_err(|e| transport_failure(kind, e))
  }
}

fn display_name(config: &ProviderConfiguration) -> String {
  let name = config.name.trim();
  if name.is_empty() {
    UNNAMED_CONFIGURATION.to_string()
  } else {
    name.to_string()
  }
}

fn mentions_token_limit(message: &str) -> bool {
  message.contains("max_completion_tokens") || message.contains("max_tokens")
}

/// Status plus the best available error message of a failed response
async fn rejection(response: TransportResponse) -> (u16, String) {
  let status = response.status;
  let status_text = response.status_text.clone();
  let body = response.text().await.unwrap_or_default();
  (status, error_message(&body, status, &status_text))
}

pub(super) fn error_message(body: &str, status: u16, status_text: &str) -> String {
  let parsed = serde_json::from_str::<Value>(body).ok();
  parsed
    .as_ref()
    .and_then(|value| {
      value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .or_else(|| value.get("message").and_then(Value::as_str))
        .or_else(|| value.get("error").and_then(Value::as_str))
    })
    .filter(|message| !message.is_empty())
    .map(str::to_string)
    .unwrap_or_else(|| format!("HTTP {status}: {status_text}"))
}

async fn read_buffered(
  kind: ProviderKind,
  response: TransportResponse,
) -> Result<(String, Option<Value>)> {
  let body = response.text().await.map_err(|e| transport_failure(kind, e))?;
  let value: Value =
    serde_json::from_str(&body).map_err(|e| ChatError::MalformedResponse(e.to_string()))?;
  let parsed = kind.adapter().parse_response(&value);
  Ok((parsed.text, parsed.usage))
}

async fn read_stream(
  kind: ProviderKind,
  response: TransportResponse,
  on_update: ProgressCallback<'_>,
) -> Result<(String, Option<Value>)> {
  let mut accumulator = StreamAccumulator::new(kind.adapter());
  let mut body = response.body;
  while let Some(chunk) = body.next().await {
    let chunk = chunk.map_err(|e| transport_failure(kind, e))?;
    accumulator.push(&chunk, on_update);
  }
  accumulator.finish(on_update);
  Ok(accumulator.into_parts())
}

/// Run `fut` under a deadline and an optional cancellation token
pub(super) async fn guarded<T>(
  fut: impl Future<Output = Result<T>>,
  deadline: Duration,
  cancel: Option<&CancellationToken>,
  kind: ProviderKind,
) -> Result<T> {
  let timed = tokio::time::timeout(deadline, fut);
  let outcome = match cancel {
    Some(token) => tokio::select! {
      biased;
      _ = token.cancelled() => return Err(ChatError::Aborted),
      outcome = timed => outcome,
    },
    None => timed.await,
  };
  outcome.unwrap_or_else(|_| Err(timeout_failure(kind, deadline)))
}

fn timeout_failure(kind: ProviderKind, deadline: Duration) -> ChatError {
  let secs = deadline.as_secs_f64();
  let message = if kind.is_ollama() {
    format!("Ollama request timed out after {secs} seconds. {OLLAMA_SLOW}")
  } else {
    format!("Request timed out after {secs} seconds")
  };
  ChatError::Timeout { message }
}

pub(super) fn transport_failure(kind: ProviderKind, err: TransportError) -> ChatError {
  if kind.is_ollama() {
    match err {
      TransportError::ConnectionRefused(_) => {
        return ChatError::ConnectionRefused {
          message: OLLAMA_REFUSED.to_string(),
        };
      }
      TransportError::Timeout(_) => {
        return ChatError::Timeout {
          message: format!("Ollama request timed out. {OLLAMA_SLOW}"),
        };
      }
      TransportError::Dns(_) => {
        return ChatError::DnsResolution {
          message: OLLAMA_UNRESOLVED.to_string(),
        };
      }
      TransportError::Network(_) => {}
    }
  }

  let message = err.to_string();
  match err {
    TransportError::ConnectionRefused(_) => ChatError::ConnectionRefused { message },
    TransportError::Dns(_) => ChatError::DnsResolution { message },
    TransportError::Timeout(_) => ChatError::Timeout { message },
    TransportError::Network(_) => ChatError::Network(message),
  }
}

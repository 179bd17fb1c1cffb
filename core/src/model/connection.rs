//! Connection test
//!
//! Minimal round trip against an explicit profile. The active configuration
//! is left untouched.

use daxchat_config::ProviderConfiguration;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::client::{ApiClient, guarded, transport_failure};
use super::error::{ChatError, Result};
use super::provider::{ProviderKind, RequestContext, WireRequest, parse_endpoint};
use super::providers::OllamaAdapter;
use super::transport::TransportError;
use super::types::{ConnectionReport, ConversationTurn};

const PROBE_SYSTEM: &str = "You are a helpful assistant.";
const PROBE_USER: &str = "Test";

impl ApiClient {
  pub async fn test_connection(&self, config: &ProviderConfiguration) -> Result<ConnectionReport> {
    let mut config = config.clone();
    config.normalize();

    let kind = ProviderKind::for_config(&config);
    let endpoint = parse_endpoint(&config.endpoint_url)?;
    let model = config
      .default_model()
      .map(|m| m.name.clone())
      .ok_or_else(|| ChatError::InvalidConfiguration("no model configured".to_string()))?;

    if kind.is_ollama() {
      self.ping_ollama(&endpoint).await?;
    }

    let turns = if kind.is_ollama() {
      vec![ConversationTurn::system(PROBE_SYSTEM), ConversationTurn::user(PROBE_USER)]
    } else {
      vec![ConversationTurn::user(PROBE_USER)]
    };
    let ctx = RequestContext {
      model: &model,
      credential: config.credential_str(),
      max_tokens: self.settings.connection_test_max_tokens,
      stream: false,
    };
    let request = kind.adapter().build_request(&endpoint, &turns, &ctx);
    let deadline = if kind.is_ollama() {
      self.settings.ollama_connection_test_timeout()
    } else {
      self.settings.connection_test_timeout()
    };

    debug!(kind = ?kind, model = %model, "Testing connection");
    let probe = async {
      let response = self.dispatch(kind, &request).await?;
      let body = response.text().await.map_err(|e| transport_failure(kind, e))?;
      Ok(serde_json::from_str::<Value>(&body).ok())
    };
    let body = guarded(probe, deadline, None, kind).await?;

    probe_report(kind, body.as_ref())
  }

  /// GET the endpoint origin before probing
  async fn ping_ollama(&self, endpoint: &Url) -> Result<()> {
    let mut origin = OllamaAdapter::loopback_url(endpoint);
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    let base = origin.as_str().trim_end_matches('/').to_string();

    let deadline = self.settings.ollama_ping_timeout();
    let ping_request = WireRequest::get(origin);
    let ping = self.transport.send(&ping_request);
    match tokio::time::timeout(deadline, ping).await {
      Ok(Ok(response)) if response.ok() => Ok(()),
      Ok(Ok(response)) => Err(ChatError::Rejected {
        status: response.status,
        message: format!(
          "Ollama service not responding on {base}. Status: {}",
          response.status
        ),
      }),
      Ok(Err(err)) => Err(unreachable_ollama(&base, err)),
      Err(_) => Err(unreachable_ollama(
        &base,
        TransportError::Timeout(format!("no answer within {} seconds", deadline.as_secs())),
      )),
    }
  }
}

fn unreachable_ollama(base: &str, err: TransportError) -> ChatError {
  let message =
    format!("Cannot reach Ollama service. Make sure Ollama is running on {base}. Error: {err}");
  match err {
    TransportError::ConnectionRefused(_) => ChatError::ConnectionRefused { message },
    TransportError::Dns(_) => ChatError::DnsResolution { message },
    TransportError::Timeout(_) => ChatError::Timeout { message },
    TransportError::Network(_) => ChatError::Network(message),
  }
}

fn probe_report(kind: ProviderKind, body: Option<&Value>) -> Result<ConnectionReport> {
  let message = if kind.is_ollama() {
    if !body.and_then(|b| b.get("response")).is_some_and(Value::is_string) {
      return Err(ChatError::MalformedResponse(
        "Invalid Ollama response format".to_string(),
      ));
    }
    "Ollama connection successful"
  } else {
    let recognized = body.is_some_and(|b| {
      ["choices", "content", "candidates"]
        .iter()
        .any(|key| b.get(*key).is_some())
    });
    if recognized {
      "API connection successful"
    } else {
      "Connection successful (response format may vary)"
    }
  };

  Ok(ConnectionReport {
    message: message.to_string(),
  })
}

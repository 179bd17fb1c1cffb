// Provider Profile Types
// Saved connection profiles for chat-completion providers

use serde::{Deserialize, Serialize};

// ============================================================================
// PROVIDER TYPE
// ============================================================================

/// Provider family tag stored with each profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderType {
  /// OpenAI chat completions (`max_completion_tokens`)
  OpenaiCompatible,
  /// Anthropic messages API
  Anthropic,
  /// Google generateContent
  Google,
  /// Local Ollama generate endpoint
  Ollama,
  /// Anything else speaking the OpenAI body shape with an optional bearer token
  #[default]
  #[serde(alias = "standard")]
  GenericBearer,
}

impl ProviderType {
  /// Wire tag for this provider type
  pub fn as_str(&self) -> &'static str {
    match self {
      ProviderType::OpenaiCompatible => "openai-compatible",
      ProviderType::Anthropic => "anthropic",
      ProviderType::Google => "google",
      ProviderType::Ollama => "ollama",
      ProviderType::GenericBearer => "generic-bearer",
    }
  }
}

impl std::fmt::Display for ProviderType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for ProviderType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "openai-compatible" | "openai" => Ok(ProviderType::OpenaiCompatible),
      "anthropic" => Ok(ProviderType::Anthropic),
      "google" => Ok(ProviderType::Google),
      "ollama" => Ok(ProviderType::Ollama),
      "generic-bearer" | "standard" => Ok(ProviderType::GenericBearer),
      other => Err(format!("unknown provider type: {other}")),
    }
  }
}

// ============================================================================
// MODELS
// ============================================================================

/// A model offered by a provider profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
  /// Identifier understood by the provider
  pub name: String,
  /// Whether this model is used when none is selected
  #[serde(default)]
  pub is_default: bool,
}

impl ModelDescriptor {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      is_default: false,
    }
  }

  pub fn default_model(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      is_default: true,
    }
  }
}

// ============================================================================
// PROFILES
// ============================================================================

/// One saved connection profile
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfiguration {
  /// Opaque identifier, stable across saves
  #[serde(default)]
  pub id: String,
  /// Display name
  #[serde(default)]
  pub name: String,
  /// Provider family
  #[serde(default)]
  pub provider_type: ProviderType,
  /// Endpoint URL requests are posted to
  #[serde(rename = "apiUrl", alias = "endpointUrl", default)]
  pub endpoint_url: String,
  /// API key or token
  #[serde(
    rename = "apiKey",
    alias = "credential",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub credential: Option<String>,
  /// Models offered by this profile
  #[serde(default)]
  pub models: Vec<ModelDescriptor>,
  /// Single-model field written by older releases
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub model_name: Option<String>,
}

impl ProviderConfiguration {
  pub fn new(
    name: impl Into<String>,
    provider_type: ProviderType,
    endpoint_url: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      provider_type,
      endpoint_url: endpoint_url.into(),
      ..Default::default()
    }
  }

  pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
    self.credential = Some(credential.into());
    self
  }

  pub fn with_model(mut self, model: ModelDescriptor) -> Self {
    self.models.push(model);
    self
  }

  /// Credential as a string slice, empty when absent
  pub fn credential_str(&self) -> &str {
    self.credential.as_deref().unwrap_or_default()
  }

  /// Migrates the legacy `modelName` field and enforces the default-model invariant.
  pub fn normalize(&mut self) {
    if let Some(legacy) = self.model_name.take() {
      if self.models.is_empty() && !legacy.is_empty() {
        self.models.push(ModelDescriptor::default_model(legacy));
      }
    }

    if !self.models.is_empty() && !self.models.iter().any(|m| m.is_default) {
      self.models[0].is_default = true;
    }
  }

  /// The default-flagged model, else the first one
  pub fn default_model(&self) -> Option<&ModelDescriptor> {
    self
      .models
      .iter()
      .find(|m| m.is_default)
      .or_else(|| self.models.first())
  }

  pub fn model_named(&self, name: &str) -> Option<&ModelDescriptor> {
    self.models.iter().find(|m| m.name == name)
  }
}

/// The active profile together with the model resolved for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSelection {
  pub config: ProviderConfiguration,
  pub model_name: Option<String>,
}

impl ActiveSelection {
  /// Resolves the model: the selected name when the profile offers it, else the default.
  pub fn resolve(mut config: ProviderConfiguration, selected: Option<&str>) -> Self {
    config.normalize();
    let model_name = selected
      .and_then(|name| config.model_named(name))
      .or_else(|| config.default_model())
      .map(|m| m.name.clone());
    Self { config, model_name }
  }
}

/// Every saved profile plus the active id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
  pub configs: Vec<ProviderConfiguration>,
  pub active_config_id: Option<String>,
}

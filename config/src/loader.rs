// Settings Loader
// Layered loading of client tuning settings

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::layered::{ConfigLayerSource, LayeredConfig};

/// Tunables for the chat client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSettings {
  /// Token limit sent with every chat request
  pub max_output_tokens: u32,
  /// Token limit sent with connection probes
  pub connection_test_max_tokens: u32,
  /// Deadline for hosted API calls
  pub hosted_timeout_secs: u64,
  /// Deadline for local Ollama calls
  pub ollama_timeout_secs: u64,
  /// Deadline for hosted connection probes
  pub connection_test_timeout_secs: u64,
  /// Deadline for Ollama connection probes
  pub ollama_connection_test_timeout_secs: u64,
  /// Deadline for the Ollama reachability ping
  pub ollama_ping_timeout_secs: u64,
}

impl Default for ClientSettings {
  fn default() -> Self {
    Self {
      max_output_tokens: 4096,
      connection_test_max_tokens: 5,
      hosted_timeout_secs: 60,
      ollama_timeout_secs: 600, // local inference can be slow
      connection_test_timeout_secs: 10,
      ollama_connection_test_timeout_secs: 120,
      ollama_ping_timeout_secs: 5,
    }
  }
}

impl ClientSettings {
  pub fn hosted_timeout(&self) -> Duration {
    Duration::from_secs(self.hosted_timeout_secs)
  }

  pub fn ollama_timeout(&self) -> Duration {
    Duration::from_secs(self.ollama_timeout_secs)
  }

  pub fn connection_test_timeout(&self) -> Duration {
    Duration::from_secs(self.connection_test_timeout_secs)
  }

  pub fn ollama_connection_test_timeout(&self) -> Duration {
    Duration::from_secs(self.ollama_connection_test_timeout_secs)
  }

  pub fn ollama_ping_timeout(&self) -> Duration {
    Duration::from_secs(self.ollama_ping_timeout_secs)
  }
}

/// Settings loader with layered support
pub struct SettingsLoader {
  /// Global config directory
  global_dir: Option<PathBuf>,
  /// Project config directory
  project_dir: Option<PathBuf>,
}

impl SettingsLoader {
  pub fn new() -> Self {
    Self {
      global_dir: dirs::home_dir().map(|home| home.join(".daxchat")),
      project_dir: None,
    }
  }

  pub fn with_global_dir(mut self, dir: PathBuf) -> Self {
    self.global_dir = Some(dir);
    self
  }

  pub fn with_project_dir(mut self, dir: PathBuf) -> Self {
    self.project_dir = Some(dir);
    self
  }

  pub fn load(&self) -> Result<ClientSettings> {
    self.load_with_cli_overrides(Vec::new())
  }

  /// Load settings with CLI overrides
  pub fn load_with_cli_overrides(
    &self,
    cli_overrides: Vec<(String, String)>,
  ) -> Result<ClientSettings> {
    let layered = self.layers(cli_overrides)?;
    tracing::debug!(sources = ?layered.sources(), "Merging settings layers");

    let merged = toml::Value::Table(layered.merge());
    merged.try_into().map_err(|e: toml::de::Error| ConfigError::InvalidOverride {
      key: "settings".to_string(),
      message: e.to_string(),
    })
  }

  /// Collect the settings layers that exist on disk, lowest precedence first
  pub fn layers(&self, cli_overrides: Vec<(String, String)>) -> Result<LayeredConfig> {
    // Layers in order:
    // 1. Built-in defaults
    // 2. Global config (~/.daxchat/config.toml)
    // 3. Project config (.daxchat/config.toml)
    // 4. CLI overrides
    let mut layered = LayeredConfig::new();

    let defaults = toml::Value::try_from(ClientSettings::default()).map_err(|e| ConfigError::Toml {
      path: PathBuf::from("<defaults>"),
      message: e.to_string(),
    })?;
    if let toml::Value::Table(defaults) = defaults {
      layered.add_layer(ConfigLayerSource::Default, defaults);
    }

    if let Some(global_dir) = &self.global_dir {
      if let Some(table) = read_table(&global_dir.join("config.toml"))? {
        layered.add_layer(ConfigLayerSource::GlobalConfig, table);
      }
    }

    if let Some(project_dir) = &self.project_dir {
      if let Some(table) = read_table(&project_dir.join(".daxchat").join("config.toml"))? {
        layered.add_layer(ConfigLayerSource::ProjectConfig, table);
      }
    }

    let mut overrides = toml::Table::new();
    for (key, value) in cli_overrides {
      if !ClientSettings::is_known_key(&key) {
        return Err(ConfigError::InvalidOverride {
          key,
          message: "unknown setting".to_string(),
        });
      }
      overrides.insert(key, parse_override_value(&value));
    }
    if !overrides.is_empty() {
      layered.add_layer(ConfigLayerSource::CliOverride, overrides);
    }

    Ok(layered)
  }
}

impl ClientSettings {
  fn is_known_key(key: &str) -> bool {
    matches!(
      key,
      "max_output_tokens"
        | "connection_test_max_tokens"
        | "hosted_timeout_secs"
        | "ollama_timeout_secs"
        | "connection_test_timeout_secs"
        | "ollama_connection_test_timeout_secs"
        | "ollama_ping_timeout_secs"
    )
  }
}

impl Default for SettingsLoader {
  fn default() -> Self {
    Self::new()
  }
}

/// Parse `KEY=VALUE` pairs as given on the command line
pub fn parse_overrides(raw: &[String]) -> Result<Vec<(String, String)>> {
  raw
    .iter()
    .map(|item| match item.split_once('=') {
      Some((key, value)) if !key.trim().is_empty() => {
        Ok((key.trim().to_string(), value.trim().to_string()))
      }
      _ => Err(ConfigError::InvalidOverride {
        key: item.clone(),
        message: "expected KEY=VALUE".to_string(),
      }),
    })
    .collect()
}

fn read_table(path: &Path) -> Result<Option<toml::Table>> {
  if !path.exists() {
    return Ok(None);
  }
  let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  let table = toml::from_str(&content).map_err(|e: toml::de::Error| ConfigError::Toml {
    path: path.to_path_buf(),
    message: e.to_string(),
  })?;
  tracing::debug!("Loaded settings layer from {}", path.display());
  Ok(Some(table))
}

fn parse_override_value(raw: &str) -> toml::Value {
  toml::from_str::<toml::Table>(&format!("value = {raw}"))
    .ok()
    .and_then(|mut table| table.remove("value"))
    .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn isolated() -> (tempfile::TempDir, SettingsLoader) {
    let dir = tempfile::tempdir().expect("tempdir");
    let loader = SettingsLoader::new().with_global_dir(dir.path().join("global"));
    (dir, loader)
  }

  #[test]
  fn test_defaults() {
    let (_dir, loader) = isolated();
    let settings = loader.load().expect("load");
    assert_eq!(settings, ClientSettings::default());
    assert_eq!(settings.max_output_tokens, 4096);
    assert!(settings.ollama_timeout() > settings.hosted_timeout());
  }

  #[test]
  fn test_global_then_project_then_cli() {
    let (dir, loader) = isolated();
    let global = dir.path().join("global");
    std::fs::create_dir_all(&global).expect("mkdir");
    std::fs::write(
      global.join("config.toml"),
      "hosted_timeout_secs = 30\nmax_output_tokens = 1000\n",
    )
    .expect("write");

    let project = dir.path().join("project");
    std::fs::create_dir_all(project.join(".daxchat")).expect("mkdir");
    std::fs::write(project.join(".daxchat").join("config.toml"), "hosted_timeout_secs = 45\n")
      .expect("write");

    let settings = loader
      .with_project_dir(project)
      .load_with_cli_overrides(vec![("max_output_tokens".to_string(), "2048".to_string())])
      .expect("load");
    assert_eq!(settings.hosted_timeout_secs, 45);
    assert_eq!(settings.max_output_tokens, 2048);
  }

  #[test]
  fn test_missing_files_contribute_no_layer() {
    let (dir, loader) = isolated();
    let project = dir.path().join("project");
    std::fs::create_dir_all(project.join(".daxchat")).expect("mkdir");
    std::fs::write(project.join(".daxchat").join("config.toml"), "ollama_timeout_secs = 900\n")
      .expect("write");

    let layers = loader
      .with_project_dir(project)
      .layers(vec![("hosted_timeout_secs".to_string(), "5".to_string())])
      .expect("layers");
    assert_eq!(
      layers.sources(),
      vec![
        ConfigLayerSource::Default,
        ConfigLayerSource::ProjectConfig,
        ConfigLayerSource::CliOverride
      ]
    );
  }

  #[test]
  fn test_unknown_override_rejected() {
    let (_dir, loader) = isolated();
    let err = loader.load_with_cli_overrides(vec![("nope".to_string(), "1".to_string())]);
    assert!(matches!(err, Err(ConfigError::InvalidOverride { .. })));
  }

  #[test]
  fn test_non_numeric_override_rejected() {
    let (_dir, loader) = isolated();
    let err = loader.load_with_cli_overrides(vec![(
      "hosted_timeout_secs".to_string(),
      "soon".to_string(),
    )]);
    assert!(err.is_err());
  }

  #[test]
  fn test_parse_overrides() {
    let parsed = parse_overrides(&["a=1".to_string(), " b = x ".to_string()]).expect("parse");
    assert_eq!(
      parsed,
      vec![("a".to_string(), "1".to_string()), ("b".to_string(), "x".to_string())]
    );
    assert!(parse_overrides(&["novalue".to_string()]).is_err());
  }
}

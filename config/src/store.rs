//! Provider profile storage
//!
//! Persists saved profiles, the active profile id and the separately selected model.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::types::{ActiveSelection, ConfigSnapshot, ProviderConfiguration};

/// Profile storage contract
#[async_trait::async_trait]
pub trait ConfigStore: Send + Sync {
  /// Active profile with its resolved model, `None` when nothing is saved
  async fn load(&self) -> Result<Option<ActiveSelection>>;

  /// Insert or replace a profile, returning its id
  async fn save(&self, config: ProviderConfiguration) -> Result<String>;

  /// All profiles and the active id
  async fn get_all(&self) -> Result<ConfigSnapshot>;

  /// Make a profile active, optionally pinning a model
  async fn set_active(&self, id: &str, model_name: Option<&str>) -> Result<()>;

  /// Pin a model for the active profile
  async fn set_selected_model(&self, model_name: &str) -> Result<()>;

  /// Remove a profile
  async fn delete(&self, id: &str) -> Result<()>;
}

/// On-disk document shared by the store implementations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreDocument {
  #[serde(default)]
  configs: Vec<ProviderConfiguration>,
  #[serde(default)]
  active_config_id: Option<String>,
  #[serde(default)]
  selected_model_name: Option<String>,
}

impl StoreDocument {
  fn load(&self) -> Option<ActiveSelection> {
    let active = self
      .active_config_id
      .as_deref()
      .and_then(|id| self.configs.iter().find(|c| c.id == id));

    match active {
      Some(config) => Some(ActiveSelection::resolve(
        config.clone(),
        self.selected_model_name.as_deref(),
      )),
      None => self
        .configs
        .first()
        .map(|config| ActiveSelection::resolve(config.clone(), None)),
    }
  }

  fn save(&mut self, mut config: ProviderConfiguration) -> String {
    if config.id.is_empty() {
      config.id = uuid::Uuid::new_v4().to_string();
    }
    config.normalize();
    let id = config.id.clone();

    match self.configs.iter_mut().find(|c| c.id == id) {
      Some(existing) => *existing = config,
      None => self.configs.push(config),
    }

    if self.active_config_id.is_none() || self.configs.len() == 1 {
      self.active_config_id = Some(id.clone());
    }
    id
  }

  fn snapshot(&self) -> ConfigSnapshot {
    ConfigSnapshot {
      configs: self.configs.clone(),
      active_config_id: self.active_config_id.clone(),
    }
  }

  fn set_active(&mut self, id: &str, model_name: Option<&str>) -> Result<()> {
    if !self.configs.iter().any(|c| c.id == id) {
      return Err(ConfigError::NotFound(id.to_string()));
    }
    self.active_config_id = Some(id.to_string());
    self.selected_model_name = model_name.map(ToString::to_string);
    Ok(())
  }

  fn set_selected_model(&mut self, model_name: &str) {
    self.selected_model_name = Some(model_name.to_string());
  }

  fn delete(&mut self, id: &str) {
    self.configs.retain(|c| c.id != id);
    if self.active_config_id.as_deref() == Some(id) {
      self.active_config_id = self.configs.first().map(|c| c.id.clone());
      self.selected_model_name = None;
    }
  }
}

/// JSON file backed profile store
pub struct FileConfigStore {
  path: PathBuf,
}

impl FileConfigStore {
  pub fn new(path: impl AsRef<Path>) -> Self {
    Self {
      path: path.as_ref().to_path_buf(),
    }
  }

  /// Default location: `~/.daxchat/providers.json`
  pub fn default_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".daxchat").join("providers.json"))
  }

  pub fn default_store() -> Result<Self> {
    Ok(Self::new(Self::default_path()?))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  async fn read(&self) -> Result<StoreDocument> {
    match tokio::fs::read_to_string(&self.path).await {
      Ok(content) if content.trim().is_empty() => Ok(StoreDocument::default()),
      Ok(content) => Ok(serde_json::from_str(&content)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreDocument::default()),
      Err(source) => Err(ConfigError::Io {
        path: self.path.clone(),
        source,
      }),
    }
  }

  async fn write(&self, doc: &StoreDocument) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      tokio::fs::create_dir_all(parent)
        .await
        .map_err(|source| ConfigError::Io {
          path: parent.to_path_buf(),
          source,
        })?;
    }

    let content = serde_json::to_string_pretty(doc)?;
    tokio::fs::write(&self.path, content)
      .await
      .map_err(|source| ConfigError::Io {
        path: self.path.clone(),
        source,
      })
  }
}

#[async_trait::async_trait]
impl ConfigStore for FileConfigStore {
  async fn load(&self) -> Result<Option<ActiveSelection>> {
    Ok(self.read().await?.load())
  }

  async fn save(&self, config: ProviderConfiguration) -> Result<String> {
    let mut doc = self.read().await?;
    let id = doc.save(config);
    self.write(&doc).await?;
    tracing::debug!("Saved provider configuration {} to {}", id, self.path.display());
    Ok(id)
  }

  async fn get_all(&self) -> Result<ConfigSnapshot> {
    Ok(self.read().await?.snapshot())
  }

  async fn set_active(&self, id: &str, model_name: Option<&str>) -> Result<()> {
    let mut doc = self.read().await?;
    doc.set_active(id, model_name)?;
    self.write(&doc).await
  }

  async fn set_selected_model(&self, model_name: &str) -> Result<()> {
    let mut doc = self.read().await?;
    doc.set_selected_model(model_name);
    self.write(&doc).await
  }

  async fn delete(&self, id: &str) -> Result<()> {
    let mut doc = self.read().await?;
    doc.delete(id);
    self.write(&doc).await
  }
}

/// In-memory profile store (for testing and embedding)
#[derive(Default)]
pub struct MemoryConfigStore {
  doc: Mutex<StoreDocument>,
}

impl MemoryConfigStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store pre-populated with one active profile
  pub fn with_config(config: ProviderConfiguration) -> Self {
    let store = Self::default();
    store.lock().save(config);
    store
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, StoreDocument> {
    self
      .doc
      .lock()
      .unwrap_or_else(std::sync::PoisonError::into_inner)
  }
}

#[async_trait::async_trait]
impl ConfigStore for MemoryConfigStore {
  async fn load(&self) -> Result<Option<ActiveSelection>> {
    Ok(self.lock().load())
  }

  async fn save(&self, config: ProviderConfiguration) -> Result<String> {
    Ok(self.lock().save(config))
  }

  async fn get_all(&self) -> Result<ConfigSnapshot> {
    Ok(self.lock().snapshot())
  }

  async fn set_active(&self, id: &str, model_name: Option<&str>) -> Result<()> {
    self.lock().set_active(id, model_name)
  }

  async fn set_selected_model(&self, model_name: &str) -> Result<()> {
    self.lock().set_selected_model(model_name);
    Ok(())
  }

  async fn delete(&self, id: &str) -> Result<()> {
    self.lock().delete(id);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{ModelDescriptor, ProviderType};
  use pretty_assertions::assert_eq;

  fn profile(name: &str, models: &[&str]) -> ProviderConfiguration {
    let mut config =
      ProviderConfiguration::new(name, ProviderType::GenericBearer, "http://host/v1");
    for model in models {
      config = config.with_model(ModelDescriptor::new(*model));
    }
    config
  }

  #[tokio::test]
  async fn test_first_save_becomes_active() {
    let store = MemoryConfigStore::new();
    let id = store.save(profile("one", &["m1", "m2"])).await.expect("save");
    assert!(!id.is_empty());

    let active = store.load().await.expect("load").expect("active");
    assert_eq!(active.config.id, id);
    assert_eq!(active.model_name.as_deref(), Some("m1"));
    assert!(active.config.models[0].is_default);
  }

  #[tokio::test]
  async fn test_second_save_keeps_active() {
    let store = MemoryConfigStore::new();
    let first = store.save(profile("one", &["m1"])).await.expect("save");
    store.save(profile("two", &["m2"])).await.expect("save");

    let snapshot = store.get_all().await.expect("all");
    assert_eq!(snapshot.configs.len(), 2);
    assert_eq!(snapshot.active_config_id, Some(first));
  }

  #[tokio::test]
  async fn test_save_replaces_same_id() {
    let store = MemoryConfigStore::new();
    let id = store.save(profile("one", &["m1"])).await.expect("save");
    let mut updated = profile("renamed", &["m9"]);
    updated.id = id.clone();
    store.save(updated).await.expect("save");

    let snapshot = store.get_all().await.expect("all");
    assert_eq!(snapshot.configs.len(), 1);
    assert_eq!(snapshot.configs[0].name, "renamed");
  }

  #[tokio::test]
  async fn test_selected_model_and_reset() {
    let store = MemoryConfigStore::new();
    let id = store.save(profile("one", &["m1", "m2"])).await.expect("save");

    store.set_selected_model("m2").await.expect("select");
    let active = store.load().await.expect("load").expect("active");
    assert_eq!(active.model_name.as_deref(), Some("m2"));

    store.set_active(&id, None).await.expect("activate");
    let active = store.load().await.expect("load").expect("active");
    assert_eq!(active.model_name.as_deref(), Some("m1"));
  }

  #[tokio::test]
  async fn test_set_active_unknown_id() {
    let store = MemoryConfigStore::new();
    let err = store.set_active("missing", None).await;
    assert!(matches!(err, Err(ConfigError::NotFound(_))));
  }

  #[tokio::test]
  async fn test_delete_active_promotes_first_remaining() {
    let store = MemoryConfigStore::new();
    let first = store.save(profile("one", &["m1"])).await.expect("save");
    let second = store.save(profile("two", &["m2"])).await.expect("save");
    store.set_active(&second, None).await.expect("activate");

    store.delete(&second).await.expect("delete");
    let snapshot = store.get_all().await.expect("all");
    assert_eq!(snapshot.active_config_id, Some(first));

    store
      .delete(snapshot.active_config_id.as_deref().unwrap_or_default())
      .await
      .expect("delete");
    assert!(store.load().await.expect("load").is_none());
  }

  #[tokio::test]
  async fn test_file_store_persists() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("providers.json");
    let store = FileConfigStore::new(&path);

    assert!(store.load().await.expect("empty load").is_none());
    let id = store.save(profile("disk", &["m1"])).await.expect("save");

    let reopened = FileConfigStore::new(&path);
    let active = reopened.load().await.expect("load").expect("active");
    assert_eq!(active.config.id, id);
    assert_eq!(active.config.name, "disk");
  }

  #[tokio::test]
  async fn test_file_store_reads_legacy_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("providers.json");
    std::fs::write(
      &path,
      serde_json::json!({
        "configs": [{
          "id": "abc",
          "name": "Local",
          "providerType": "ollama",
          "apiUrl": "http://localhost:11434/api/generate",
          "modelName": "llama3"
        }],
        "activeConfigId": "abc"
      })
      .to_string(),
    )
    .expect("write fixture");

    let active = FileConfigStore::new(&path)
      .load()
      .await
      .expect("load")
      .expect("active");
    assert_eq!(active.config.provider_type, ProviderType::Ollama);
    assert_eq!(active.model_name.as_deref(), Some("llama3"));
  }
}

//! Configuration resolver
//!
//! Caches the active profile in memory. Readers get an `Arc` snapshot, and
//! reload swaps the whole snapshot so no caller sees a half-updated profile.

use std::sync::{Arc, RwLock};

use daxchat_config::{ActiveSelection, ConfigStore, ProviderConfiguration};
use tracing::{debug, warn};

use super::provider::ProviderKind;

/// The active profile, its resolved model and its wire protocol
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveConfiguration {
  pub config: ProviderConfiguration,
  pub model_name: Option<String>,
  pub kind: ProviderKind,
}

impl ActiveConfiguration {
  pub fn from_selection(selection: ActiveSelection) -> Self {
    let kind = ProviderKind::for_config(&selection.config);
    Self {
      config: selection.config,
      model_name: selection.model_name,
      kind,
    }
  }

  /// Endpoint and model are both required; a credential never is.
  pub fn is_configured(&self) -> bool {
    !self.config.endpoint_url.trim().is_empty()
      && self.model_name.as_deref().is_some_and(|m| !m.trim().is_empty())
  }
}

pub struct ConfigurationResolver {
  store: Arc<dyn ConfigStore>,
  active: RwLock<Option<Arc<ActiveConfiguration>>>,
}

impl ConfigurationResolver {
  pub fn new(store: Arc<dyn ConfigStore>) -> Self {
    Self {
      store,
      active: RwLock::new(None),
    }
  }

  pub fn store(&self) -> &Arc<dyn ConfigStore> {
    &self.store
  }

  /// Re-read the active profile. Storage failures leave the resolver unconfigured.
  pub async fn reload(&self) -> Option<Arc<ActiveConfiguration>> {
    let loaded = match self.store.load().await {
      Ok(selection) => selection.map(|s| Arc::new(ActiveConfiguration::from_selection(s))),
      Err(e) => {
        warn!("Failed to load API configuration: {}", e);
        None
      }
    };

    if let Some(active) = &loaded {
      debug!(
        config = %active.config.name,
        kind = ?active.kind,
        model = active.model_name.as_deref().unwrap_or_default(),
        "Loaded active configuration"
      );
    }

    *self.active.write().unwrap_or_else(|e| e.into_inner()) = loaded.clone();
    loaded
  }

  /// Current snapshot
  pub fn current(&self) -> Option<Arc<ActiveConfiguration>> {
    self.active.read().unwrap_or_else(|e| e.into_inner()).clone()
  }
}

// Layered Configuration
// Settings layers merged in precedence order

use serde::{Deserialize, Serialize};

/// Layered configuration wrapper
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayeredConfig {
  /// Configuration layers, lowest precedence first
  layers: Vec<ConfigLayer>,
}

/// Configuration layer with source tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigLayer {
  /// Layer source
  pub source: ConfigLayerSource,
  /// Configuration values
  pub values: toml::Table,
}

/// Configuration layer source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigLayerSource {
  /// Built-in defaults
  Default,
  /// Global user config
  GlobalConfig,
  /// Project-specific config
  ProjectConfig,
  /// CLI override
  CliOverride,
}

impl LayeredConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_layer(&mut self, source: ConfigLayerSource, values: toml::Table) {
    self.layers.push(ConfigLayer { source, values });
  }

  pub fn sources(&self) -> Vec<ConfigLayerSource> {
    self.layers.iter().map(|layer| layer.source).collect()
  }

  /// Merge all layers; later layers win, nested tables merge key by key
  pub fn merge(&self) -> toml::Table {
    let mut merged = toml::Table::new();
    for layer in &self.layers {
      merge_tables(&mut merged, &layer.values);
    }
    merged
  }
}

fn merge_tables(base: &mut toml::Table, overlay: &toml::Table) {
  for (key, value) in overlay {
    match (base.get_mut(key), value) {
      (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
        merge_tables(existing, incoming);
      }
      _ => {
        base.insert(key.clone(), value.clone());
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn table(src: &str) -> toml::Table {
    toml::from_str(src).expect("valid toml")
  }

  #[test]
  fn test_later_layer_wins() {
    let mut layered = LayeredConfig::new();
    layered.add_layer(ConfigLayerSource::Default, table("a = 1\nb = 2"));
    layered.add_layer(ConfigLayerSource::CliOverride, table("b = 3"));

    let merged = layered.merge();
    assert_eq!(merged.get("a").and_then(toml::Value::as_integer), Some(1));
    assert_eq!(merged.get("b").and_then(toml::Value::as_integer), Some(3));
  }

  #[test]
  fn test_nested_tables_merge() {
    let mut layered = LayeredConfig::new();
    layered.add_layer(ConfigLayerSource::Default, table("[t]\nx = 1\ny = 1"));
    layered.add_layer(ConfigLayerSource::ProjectConfig, table("[t]\ny = 2"));

    let merged = layered.merge();
    let t = merged.get("t").and_then(toml::Value::as_table).expect("table");
    assert_eq!(t.get("x").and_then(toml::Value::as_integer), Some(1));
    assert_eq!(t.get("y").and_then(toml::Value::as_integer), Some(2));
    assert_eq!(
      layered.sources(),
      vec![ConfigLayerSource::Default, ConfigLayerSource::ProjectConfig]
    );
  }
}

// daxchat Configuration
// Saved provider profiles and layered client settings

pub mod error;
pub mod layered;
pub mod loader;
pub mod store;
pub mod types;

pub use error::{ConfigError, Result};
pub use layered::{ConfigLayerSource, LayeredConfig};
pub use loader::{ClientSettings, SettingsLoader, parse_overrides};
pub use store::{ConfigStore, FileConfigStore, MemoryConfigStore};
pub use types::*;

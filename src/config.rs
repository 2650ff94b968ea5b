//! Host configuration, read from `<data-dir>/config.toml`.

use std::path::Path;

use anyhow::{Context, Result};
use conduit_runtime::ExecutorConfig;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "config.toml";

/// Default tracing filter when neither `RUST_LOG` nor `[log] filter` is set.
pub const DEFAULT_LOG_FILTER: &str = "conduit=info,warn";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub log: LogConfig,
  pub executor: ExecutorConfig,
  pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// An `EnvFilter` directive string.
  pub filter: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      filter: DEFAULT_LOG_FILTER.to_string(),
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
  /// Connected wallet handed to blocks that ask for one.
  pub address: Option<String>,
}

impl AppConfig {
  /// Parse a config file.
  pub fn load(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
      .with_context(|| format!("failed to parse config file: {}", path.display()))
  }

  /// Load `config.toml` from the data directory, or use defaults when there
  /// is none.
  pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
    let path = data_dir.join(CONFIG_FILE);
    if !path.exists() {
      return Ok(Self::default());
    }
    Self::load(&path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load_from_dir(dir.path()).unwrap();

    assert_eq!(config.log.filter, DEFAULT_LOG_FILTER);
    assert_eq!(config.executor, ExecutorConfig::default());
    assert!(config.wallet.address.is_none());
  }

  #[test]
  fn test_partial_file_keeps_other_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
      dir.path().join(CONFIG_FILE),
      r#"
[executor]
iteration_factor = 4

[wallet]
address = "0x52908400098527886E0F7030069857D2E4169EE7"
"#,
    )
    .unwrap();

    let config = AppConfig::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.executor.iteration_factor, 4);
    assert_eq!(
      config.wallet.address.as_deref(),
      Some("0x52908400098527886E0F7030069857D2E4169EE7")
    );
    assert_eq!(config.log.filter, DEFAULT_LOG_FILTER);
  }

  #[test]
  fn test_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE), "[executor\n").unwrap();

    let err = AppConfig::load_from_dir(dir.path()).unwrap_err();
    assert!(err.to_string().contains("failed to parse config file"));
  }
}

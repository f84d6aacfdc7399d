//! Persistent configuration for docket.
//!
//! Loads a TOML config from `~/.docket/config.toml`.

use crate::DocketError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level docket configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocketConfig {
    pub tokenizer: TokenizerConfig,
    pub storage: StorageConfig,
}

impl DocketConfig {
    /// Load configuration from the given path.
    pub fn load(path: &Path) -> Result<Self, DocketError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| DocketError::Config(e.to_string()))
    }

    /// Load from the default path, or return defaults if the file doesn't exist.
    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Default config path: `~/.docket/config.toml`.
    pub fn default_path() -> PathBuf {
        docket_home().join("config.toml")
    }
}

fn docket_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".docket")
}

/// Tokenizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Width of a tab stop when computing line indents.
    pub tab_width: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { tab_width: 4 }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the code database file.
    pub db_path: String,
    /// SQLite cache size in MB.
    pub cache_size_mb: u32,
    /// SQLite busy timeout in seconds.
    pub busy_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: docket_home()
                .join("docket.db")
                .to_string_lossy()
                .into_owned(),
            cache_size_mb: 64,
            busy_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrips_through_toml() {
        let config = DocketConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).expect("default config should serialize to TOML");
        let parsed: DocketConfig =
            toml::from_str(&toml_str).expect("serialized TOML should parse back");
        assert_eq!(parsed.tokenizer.tab_width, 4);
        assert_eq!(parsed.storage.cache_size_mb, 64);
        assert_eq!(parsed.storage.busy_timeout_secs, 5);
    }

    #[test]
    fn load_nonexistent_returns_error() {
        let result = DocketConfig::load(Path::new("/tmp/nonexistent_docket_config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn written_config_loads_back() {
        let dir = std::env::temp_dir().join("docket_config_test");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("config.toml");

        let mut config = DocketConfig::default();
        config.tokenizer.tab_width = 8;
        config.storage.cache_size_mb = 128;

        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = DocketConfig::load(&path).expect("load should succeed");

        assert_eq!(loaded.tokenizer.tab_width, 8);
        assert_eq!(loaded.storage.cache_size_mb, 128);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn default_path_ends_with_config_toml() {
        let path = DocketConfig::default_path();
        assert!(path.ends_with("config.toml"));
    }

    #[test]
    fn partial_toml_uses_defaults_for_missing_fields() {
        let partial = r#"
[tokenizer]
tab_width = 2
"#;
        let config: DocketConfig = toml::from_str(partial).expect("partial TOML should parse");
        assert_eq!(config.tokenizer.tab_width, 2);
        assert_eq!(config.storage.busy_timeout_secs, 5);
        assert!(config.storage.db_path.ends_with("docket.db"));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let dir = std::env::temp_dir().join("docket_config_bad_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[tokenizer\ntab_width = ").unwrap();

        let result = DocketConfig::load(&path);
        assert!(matches!(result, Err(DocketError::Config(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }
}

//! Run configuration
//!
//! [`FixConfig::load`] reads the `[entities]` section of
//! `config/fix_entities.toml` when present, then applies environment variables
//! prefixed with `FIX_ENTITIES`, e.g. `FIX_ENTITIES__ENTITIES__DIR=entity/src` or
//! `FIX_ENTITIES__ENTITIES__EXCLUDE=lib.rs,prelude.rs`.

use crate::error::Result;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "config/fix_entities.toml";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FixConfig {
    #[serde(default = "default_entity_dir")]
    pub dir: PathBuf,
    /// File names that are never rewritten
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

fn default_entity_dir() -> PathBuf {
    PathBuf::from("entity/src")
}

fn default_exclude() -> Vec<String> {
    ["lib.rs", "prelude.rs", "sea_orm_active_enums.rs"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            dir: default_entity_dir(),
            exclude: default_exclude(),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix("FIX_ENTITIES")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("entities.exclude")
        .try_parsing(true)
}

impl FixConfig {
    /// Load from `config/fix_entities.toml`, falling back to env vars.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load from the given TOML file (optional), falling back to env vars.
    pub fn load_from(path: &Path) -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(environment());

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // A present but unreadable file should not hide the env settings
                if path.exists() {
                    log::warn!(
                        "failed to load {}, falling back to env: {}",
                        path.display(),
                        err
                    );
                }
                Config::builder()
                    .add_source(environment())
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        match settings.get::<FixConfig>("entities") {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Entity configuration could not be loaded from file or environment: {}",
                e
            ))
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FixError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = FixConfig::default();
        assert_eq!(config.dir, PathBuf::from("entity/src"));
        assert_eq!(
            config.exclude,
            vec!["lib.rs", "prelude.rs", "sea_orm_active_enums.rs"]
        );
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = FixConfig::load_from(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, FixConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fix_entities.toml");
        fs::write(
            &path,
            r#"
[entities]
dir = "crates/entity/src"
exclude = ["mod.rs"]
"#,
        )
        .unwrap();

        let config = FixConfig::load_from(&path).unwrap();
        assert_eq!(config.dir, PathBuf::from("crates/entity/src"));
        assert_eq!(config.exclude, vec!["mod.rs".to_string()]);
    }

    #[test]
    fn test_partial_section_keeps_default_exclusions() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fix_entities.toml");
        fs::write(&path, "[entities]\ndir = \"gen\"\n").unwrap();

        let config = FixConfig::load_from(&path).unwrap();
        assert_eq!(config.dir, PathBuf::from("gen"));
        assert_eq!(config.exclude, default_exclude());
    }

    #[test]
    fn test_malformed_section_is_a_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fix_entities.toml");
        fs::write(&path, "[entities]\nexclude = { lib = 1 }\n").unwrap();

        let err = FixConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, FixError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error: "));
    }
}

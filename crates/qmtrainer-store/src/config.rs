//! Configuration loading and store factory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use qmtrainer_core::parser::{parse_protocol, validate_protocol};
use qmtrainer_core::protocol::Protocol;
use qmtrainer_core::traits::SessionStore;

use crate::json_file::JsonFileStore;
use crate::memory::MemoryStore;

/// Which session store backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Json,
    /// Process-local; meant for tests.
    Memory,
}

/// Top-level qmtrainer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QmConfig {
    /// Directory holding stored sessions.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub store: StoreKind,
    /// Identity recorded on every session this user creates.
    #[serde(default)]
    pub trainer: Option<String>,
    /// Protocol file to evaluate against instead of the built-in one.
    #[serde(default)]
    pub protocol: Option<PathBuf>,
    /// Overrides the protocol's pass threshold.
    #[serde(default)]
    pub pass_threshold: Option<u32>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./qmtrainer-data")
}

impl Default for QmConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            store: StoreKind::default(),
            trainer: None,
            protocol: None,
            pass_threshold: None,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `qmtrainer.toml` in the current directory
/// 2. `~/.config/qmtrainer/config.toml`
///
/// Environment variable overrides: `QMTRAINER_DATA_DIR`, `QMTRAINER_TRAINER`.
pub fn load_config() -> Result<QmConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QmConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("qmtrainer.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QmConfig::default(),
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn parse_config(content: &str) -> Result<QmConfig> {
    let mut config: QmConfig = toml::from_str(content)?;
    config.data_dir = resolve_path(&config.data_dir);
    config.trainer = config.trainer.map(|t| resolve_env_vars(&t));
    config.protocol = config.protocol.map(|p| resolve_path(&p));
    Ok(config)
}

fn apply_env_overrides(config: &mut QmConfig) {
    if let Ok(dir) = std::env::var("QMTRAINER_DATA_DIR") {
        if !dir.is_empty() {
            config.data_dir = PathBuf::from(dir);
        }
    }
    if let Ok(trainer) = std::env::var("QMTRAINER_TRAINER") {
        if !trainer.trim().is_empty() {
            config.trainer = Some(trainer);
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("qmtrainer"))
}

/// Create the configured session store.
pub async fn create_store(config: &QmConfig) -> Result<Box<dyn SessionStore>> {
    match config.store {
        StoreKind::Json => {
            let store = JsonFileStore::open(&config.data_dir).await.with_context(|| {
                format!("failed to open session store at {}", config.data_dir.display())
            })?;
            Ok(Box::new(store))
        }
        StoreKind::Memory => {
            tracing::warn!("memory store selected: sessions are discarded when the process exits");
            Ok(Box::new(MemoryStore::new()))
        }
    }
}

/// The protocol sessions are evaluated against: the configured file, or the
/// built-in reference protocol.
pub fn load_protocol(config: &QmConfig) -> Result<Protocol> {
    let protocol = match &config.protocol {
        Some(path) => {
            let protocol = parse_protocol(path)?;
            for warning in validate_protocol(&protocol) {
                match &warning.step {
                    Some(step) => tracing::warn!("{}: {step}: {}", path.display(), warning.message),
                    None => tracing::warn!("{}: {}", path.display(), warning.message),
                }
            }
            protocol
        }
        None => Protocol::reference(),
    };

    Ok(match config.pass_threshold {
        Some(threshold) => protocol.with_pass_threshold(threshold),
        None => protocol,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_QMTRAINER_TEST_VAR", "leitstelle");
        assert_eq!(resolve_env_vars("${_QMTRAINER_TEST_VAR}"), "leitstelle");
        assert_eq!(
            resolve_env_vars("/srv/${_QMTRAINER_TEST_VAR}/data"),
            "/srv/leitstelle/data"
        );
        assert_eq!(resolve_env_vars("${unterminated"), "${unterminated");
        std::env::remove_var("_QMTRAINER_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = QmConfig::default();
        assert_eq!(config.store, StoreKind::Json);
        assert_eq!(config.data_dir, PathBuf::from("./qmtrainer-data"));
        assert!(config.trainer.is_none());
    }

    #[test]
    fn parse_full_config() {
        let config = parse_config(
            r#"
data_dir = "/var/lib/qmtrainer"
store = "memory"
trainer = "mueller"
protocol = "protocols/cpr.toml"
pass_threshold = 30
"#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/qmtrainer"));
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.trainer.as_deref(), Some("mueller"));
        assert_eq!(config.protocol, Some(PathBuf::from("protocols/cpr.toml")));
        assert_eq!(config.pass_threshold, Some(30));
    }

    #[test]
    fn unknown_store_kind_is_rejected() {
        assert!(parse_config("store = \"postgres\"").is_err());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/qmtrainer.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn reference_protocol_by_default() {
        let protocol = load_protocol(&QmConfig::default()).unwrap();
        assert_eq!(protocol.len(), 10);
        assert_eq!(protocol.max_points(), 46);
        assert_eq!(protocol.pass_threshold(), 35);
    }

    #[test]
    fn pass_threshold_override() {
        let config = QmConfig {
            pass_threshold: Some(40),
            ..QmConfig::default()
        };
        assert_eq!(load_protocol(&config).unwrap().pass_threshold(), 40);
    }

    #[test]
    fn protocol_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.toml");
        std::fs::write(
            &path,
            r#"
[protocol]
name = "Kurz"
pass_threshold = 3

[[steps]]
name = "Anrufannahme"
max_points = 2

[[steps]]
name = "Adresse"
max_points = 2

[[thresholds]]
from = "Start"
to = "Anrufannahme"
seconds = 10

[[thresholds]]
from = "Anrufannahme"
to = "Adresse"
seconds = 30
"#,
        )
        .unwrap();

        let config = QmConfig {
            protocol: Some(path),
            ..QmConfig::default()
        };
        let protocol = load_protocol(&config).unwrap();
        assert_eq!(protocol.name, "Kurz");
        assert_eq!(protocol.len(), 2);
        assert_eq!(protocol.threshold("Adresse"), Some(30));
        assert_eq!(protocol.pass_threshold(), 3);
    }

    #[tokio::test]
    async fn memory_store_from_config() {
        let config = QmConfig {
            store: StoreKind::Memory,
            ..QmConfig::default()
        };
        let store = create_store(&config).await.unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[tokio::test]
    async fn json_store_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = QmConfig {
            data_dir: dir.path().join("nested").join("sessions"),
            ..QmConfig::default()
        };
        let store = create_store(&config).await.unwrap();
        assert_eq!(store.name(), "json");
        assert!(config.data_dir.is_dir());
    }
}

//! Subcommand implementations.

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use qmtrainer_core::model::{Session, SessionId};
use qmtrainer_core::protocol::Protocol;
use qmtrainer_core::traits::SessionStore;
use qmtrainer_store::config::{create_store, load_config_from, load_protocol, QmConfig};

pub mod delete;
pub mod feedback;
pub mod init;
pub mod list;
pub mod protocol;
pub mod reenter;
pub mod report;
pub mod show;
pub mod submit;

/// Settings shared by every command: the loaded config plus global flags.
pub struct Context {
    pub config: QmConfig,
    trainer_override: Option<String>,
}

impl Context {
    pub fn load(config_path: Option<PathBuf>, trainer: Option<String>) -> Result<Self> {
        let config = load_config_from(config_path.as_deref())?;
        Ok(Self {
            config,
            trainer_override: trainer,
        })
    }

    /// The signed-in trainer. Commands that record or change sessions refuse
    /// to run without one.
    pub fn trainer(&self) -> Result<String> {
        self.trainer_override
            .as_deref()
            .or(self.config.trainer.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .context("no trainer identity: pass --trainer, set QMTRAINER_TRAINER, or add `trainer` to qmtrainer.toml")
    }

    pub fn protocol(&self) -> Result<Protocol> {
        load_protocol(&self.config)
    }

    pub async fn store(&self) -> Result<Box<dyn SessionStore>> {
        create_store(&self.config).await
    }
}

/// Fetch a session or fail with a not-found error.
pub async fn require_session(store: &dyn SessionStore, id: SessionId) -> Result<Session> {
    store
        .get_session(id)
        .await?
        .with_context(|| format!("session {id} not found"))
}

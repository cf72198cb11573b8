use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::state::ChatState;

/// Persists the conversation as a single JSON document, written whole after
/// every mutation and read whole at startup.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store at the default location under the platform config directory.
    pub fn open() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(Self {
            path: config_dir.join("chaterm").join("chat-state.json"),
        })
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Restores the saved conversation. A missing or corrupt file falls back
    /// to the initial state. The loading flag is not meaningful across
    /// restarts and always restores as false.
    pub fn load(&self) -> ChatState {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return ChatState::initial(),
        };
        match serde_json::from_str::<ChatState>(&raw) {
            Ok(mut state) => {
                state.is_loading = false;
                state
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "corrupt chat state, starting fresh");
                ChatState::initial()
            }
        }
    }

    pub fn save(&self, state: &ChatState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }

    /// Drops the saved conversation, if any.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

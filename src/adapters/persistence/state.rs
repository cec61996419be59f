//! State Store - Atomic JSON Reconciliation State
//!
//! Persists the reconciliation cursor and applied bet IDs using atomic
//! writes (write to tmp file, then rename), so the file is always either
//! the previous or the new version.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::ports::repository::{ReconciliationState, ReconciliationStore};

/// JSON file store for [`ReconciliationState`].
pub struct JsonStateStore {
    state_path: PathBuf,
    tmp_path: PathBuf,
}

impl JsonStateStore {
    pub fn new(state_path: impl AsRef<Path>) -> Self {
        let state_path = state_path.as_ref().to_path_buf();
        let mut tmp = state_path.clone().into_os_string();
        tmp.push(".tmp");
        Self {
            state_path,
            tmp_path: PathBuf::from(tmp),
        }
    }

    pub fn path(&self) -> &Path {
        &self.state_path
    }
}

#[async_trait]
impl ReconciliationStore for JsonStateStore {
    /// A missing file is a first run; an unreadable or corrupt one is
    /// logged and replaced by a fresh state on the next save.
    #[instrument(skip(self), fields(path = %self.state_path.display()))]
    async fn load(&self) -> Result<ReconciliationState> {
        let json = match fs::read_to_string(&self.state_path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No reconciliation state found, starting fresh");
                return Ok(ReconciliationState::default());
            }
            Err(e) => {
                warn!(error = %e, "Failed to read reconciliation state, starting fresh");
                return Ok(ReconciliationState::default());
            }
        };

        match serde_json::from_str::<ReconciliationState>(&json) {
            Ok(state) => {
                debug!(
                    processed = state.processed_bet_ids.len(),
                    cursor = ?state.last_cleared_timestamp,
                    "Reconciliation state loaded"
                );
                Ok(state)
            }
            Err(e) => {
                warn!(error = %e, "Corrupt reconciliation state, starting fresh");
                Ok(ReconciliationState::default())
            }
        }
    }

    #[instrument(skip(self, state), fields(path = %self.state_path.display()))]
    async fn save(&self, state: &ReconciliationState) -> Result<()> {
        if let Some(dir) = self.state_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .context("Failed to create state directory")?;
        }

        let json = serde_json::to_string_pretty(state)
            .context("Failed to serialize reconciliation state")?;

        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp state file")?;

        fs::rename(&self.tmp_path, &self.state_path)
            .await
            .context("Failed to rename state file")?;

        debug!(processed = state.processed_bet_ids.len(), "Reconciliation state saved");
        Ok(())
    }
}

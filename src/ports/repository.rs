//! Repository Port - Reconciliation Persistence Interface
//!
//! The reconciliation cursor and the set of already-applied bet IDs are
//! persisted as a small JSON document so a restart never double-applies a
//! cleared order. Applied orders are also appended to a CSV audit trail.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::market::ClearedOrder;

/// Persisted reconciliation progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationState {
  /// Latest settlement time seen, as sent by the feed (ISO-8601).
  #[serde(default)]
  pub last_cleared_timestamp: Option<String>,
  /// Applied bet IDs, oldest first, without duplicates.
  #[serde(default)]
  pub processed_bet_ids: Vec<String>,
}

impl ReconciliationState {
  /// IDs as a set for membership checks during a batch.
  pub fn processed_set(&self) -> HashSet<String> {
    self.processed_bet_ids.iter().cloned().collect()
  }

  /// Drop duplicates and keep only the most recent `max_processed` IDs.
  pub fn trim(&mut self, max_processed: usize) {
    let mut seen = HashSet::with_capacity(self.processed_bet_ids.len());
    let mut unique: Vec<String> = Vec::with_capacity(self.processed_bet_ids.len());
    // Walk newest first so a re-added ID keeps its latest position.
    for id in self.processed_bet_ids.iter().rev() {
      if seen.insert(id.as_str()) {
        unique.push(id.clone());
      }
    }
    unique.truncate(max_processed);
    unique.reverse();
    self.processed_bet_ids = unique;
  }
}

/// Trait for reconciliation state storage.
#[async_trait]
pub trait ReconciliationStore: Send + Sync + 'static {
  /// Load persisted state. Missing or unreadable state yields a fresh default.
  async fn load(&self) -> anyhow::Result<ReconciliationState>;

  /// Persist state atomically.
  async fn save(&self, state: &ReconciliationState) -> anyhow::Result<()>;
}

/// Trait for the cleared-order audit trail.
#[async_trait]
pub trait AuditLog: Send + Sync + 'static {
  /// Append one applied cleared order.
  async fn append(&self, order: &ClearedOrder) -> anyhow::Result<()>;
}

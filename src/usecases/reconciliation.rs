//! Reconciliation Use Case - Cleared-Order Catch-up
//!
//! Applies settled bets reported by the exchange's cleared-order feed to
//! the ledger, independently of the settlements pushed with snapshots.
//!
//! Reconciliation flow:
//! 1. Query the window `[cursor or now - lookback, now]`
//! 2. Skip bet IDs already processed (windows overlap on purpose)
//! 3. Apply the rest to the ledger and the audit trail
//! 4. Advance the cursor, trim the processed IDs, persist the state
//!
//! A feed failure aborts the run before any state is written.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tracing::{info, instrument, warn};

use crate::domain::market::parse_settled_timestamp;
use crate::ports::cleared_orders::{ClearedOrderFeed, TimeRange};
use crate::ports::metrics::MetricsSink;
use crate::ports::repository::{AuditLog, ReconciliationState, ReconciliationStore};
use crate::usecases::ledger::ExposureLedger;

/// Window and retention settings.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileSettings {
  /// Window length used when no cursor is stored.
  pub lookback: Duration,
  /// Most recent processed IDs to retain.
  pub max_processed: usize,
}

impl Default for ReconcileSettings {
  fn default() -> Self {
    Self {
      lookback: Duration::seconds(3600),
      max_processed: 10_000,
    }
  }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationReport {
  /// Orders returned by the feed.
  pub fetched: usize,
  /// New orders recorded as processed.
  pub processed: usize,
  /// Of those, orders that matched a live ledger bet.
  pub applied: usize,
  /// Orders skipped because their ID was already processed.
  pub duplicates: usize,
  /// Net profit of the applied orders.
  pub profit: f64,
}

/// Start of the query window for `state` at `now`.
pub fn window_start(state: &ReconciliationState, now: DateTime<Utc>, lookback: Duration) -> DateTime<Utc> {
  state
    .last_cleared_timestamp
    .as_deref()
    .and_then(parse_settled_timestamp)
    .unwrap_or(now - lookback)
}

/// Polls the cleared-order feed and applies new settlements.
pub struct ReconciliationService {
  feed: Arc<dyn ClearedOrderFeed>,
  store: Arc<dyn ReconciliationStore>,
  audit: Option<Arc<dyn AuditLog>>,
  metrics: Arc<dyn MetricsSink>,
  settings: ReconcileSettings,
}

impl ReconciliationService {
  pub fn new(
    feed: Arc<dyn ClearedOrderFeed>,
    store: Arc<dyn ReconciliationStore>,
    metrics: Arc<dyn MetricsSink>,
    settings: ReconcileSettings,
  ) -> Self {
    Self {
      feed,
      store,
      audit: None,
      metrics,
      settings,
    }
  }

  /// Also append each newly processed order to `audit`.
  pub fn with_audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
    self.audit = Some(audit);
    self
  }

  /// Load the stored state, reconcile up to `now`, and persist.
  pub async fn run_once(&self, ledger: &mut ExposureLedger, now: DateTime<Utc>) -> Result<ReconciliationReport> {
    let state = self
      .store
      .load()
      .await
      .context("Failed to load reconciliation state")?;
    let (_, report) = self.reconcile(ledger, state, now).await?;
    Ok(report)
  }

  /// Reconcile `state` against the feed and persist the result.
  ///
  /// # Errors
  /// Feed and store failures propagate; on a feed failure neither the
  /// ledger nor the stored state is touched.
  #[instrument(skip_all, fields(cursor = ?state.last_cleared_timestamp))]
  pub async fn reconcile(
    &self,
    ledger: &mut ExposureLedger,
    mut state: ReconciliationState,
    now: DateTime<Utc>,
  ) -> Result<(ReconciliationState, ReconciliationReport)> {
    let range = TimeRange {
      from: window_start(&state, now, self.settings.lookback),
      to: now,
    };

    let orders = self
      .feed
      .query(range)
      .await
      .context("Cleared-order query failed")?;

    let mut report = ReconciliationReport {
      fetched: orders.len(),
      ..ReconciliationReport::default()
    };
    let mut processed = state.processed_set();
    let mut latest = state
      .last_cleared_timestamp
      .as_deref()
      .and_then(parse_settled_timestamp);

    for order in &orders {
      if !processed.insert(order.bet_id.clone()) {
        report.duplicates += 1;
        continue;
      }

      if let Some(profit) = ledger.process_cleared_order(order) {
        report.applied += 1;
        report.profit += profit;
        self.metrics.settlement(profit > 0.0);
      }
      state.processed_bet_ids.push(order.bet_id.clone());
      report.processed += 1;

      if let Some(audit) = &self.audit {
        if let Err(e) = audit.append(order).await {
          warn!(bet_id = %order.bet_id, error = %e, "Failed to append audit row");
        }
      }

      if let Some(settled) = order.settled_at {
        if latest.is_none_or(|current| settled > current) {
          latest = Some(settled);
        }
      }
    }

    state.trim(self.settings.max_processed);
    if let Some(latest) = latest {
      state.last_cleared_timestamp = Some(latest.to_rfc3339_opts(SecondsFormat::Millis, true));
    }

    self
      .store
      .save(&state)
      .await
      .context("Failed to persist reconciliation state")?;

    self.metrics.ledger(ledger.balance(), ledger.current_exposure(), ledger.pnl());
    info!(
      fetched = report.fetched,
      processed = report.processed,
      applied = report.applied,
      duplicates = report.duplicates,
      "Reconciliation complete"
    );

    Ok((state, report))
  }
}

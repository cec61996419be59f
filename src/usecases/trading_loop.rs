//! Trading Loop - Snapshot Polling and Bet Placement
//!
//! The single writer of the exposure ledger. Each iteration:
//! 1. Fetches a table snapshot (shoe, quoted selections, settlements)
//! 2. Detects shoe resets
//! 3. Applies snapshot settlements to the ledger
//! 4. Runs cleared-order reconciliation when it is due
//! 5. Prices every in-play selection, ranks by edge, sizes and places
//!
//! A failed iteration is logged and the loop carries on. Without a
//! snapshot source the loop only reconciles.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::edge::evaluate;
use crate::domain::market::{rank_opportunities, Action, MarketSnapshot, Opportunity};
use crate::domain::probability::EventProbabilities;
use crate::domain::shoe::is_shoe_reset;
use crate::domain::stake::StakeSizer;
use crate::ports::alerts::{AlertLevel, AlertSink};
use crate::ports::market_data::MarketDataSource;
use crate::ports::metrics::MetricsSink;
use crate::usecases::executor::{BetExecutor, ExecutionOutcome};
use crate::usecases::ledger::ExposureLedger;
use crate::usecases::operator_gate::OperatorGate;
use crate::usecases::reconciliation::{ReconciliationReport, ReconciliationService};

/// Edge detection parameters.
#[derive(Debug, Clone, Copy)]
pub struct StrategySettings {
  /// Minimum edge for an opportunity to qualify.
  pub min_edge: f64,
  /// Also evaluate LAY at the best lay price.
  pub allow_lay: bool,
}

impl Default for StrategySettings {
  fn default() -> Self {
    Self {
      min_edge: crate::domain::edge::DEFAULT_MIN_EDGE,
      allow_lay: false,
    }
  }
}

/// Loop pacing.
#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
  /// Sleep between iterations.
  pub poll_interval: Duration,
  /// Stop after this many iterations; unbounded when `None`.
  pub iterations: Option<u64>,
  /// Minimum time between reconciliation runs.
  pub reconcile_interval: Duration,
}

impl Default for LoopSettings {
  fn default() -> Self {
    Self {
      poll_interval: Duration::from_secs(1),
      iterations: None,
      reconcile_interval: Duration::from_secs(60),
    }
  }
}

/// How qualified opportunities reach the market.
pub enum Placement {
  /// Place every opportunity (simulated table).
  Direct(BetExecutor),
  /// Place only while the operator gate authorizes live orders.
  Gated { executor: BetExecutor, gate: OperatorGate },
}

/// What one iteration did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IterationReport {
  /// A snapshot was fetched and priced.
  pub snapshot: bool,
  pub shoe_reset: bool,
  /// Snapshot settlements that matched a live bet.
  pub settlements_applied: usize,
  /// Qualified opportunities, before capacity checks.
  pub opportunities: usize,
  /// Bets accepted and booked.
  pub bets_recorded: usize,
  pub capacity_rejections: usize,
  /// Opportunities skipped by the operator gate.
  pub gate_blocked: usize,
  pub reconciliation: Option<ReconciliationReport>,
}

/// Totals for a finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopSummary {
  pub iterations: u64,
  pub failed_iterations: u64,
  pub bets_recorded: usize,
  pub balance: f64,
  pub exposure: f64,
  pub pnl: f64,
}

/// Polling loop owning the ledger.
pub struct TradingLoop {
  source: Option<Arc<dyn MarketDataSource>>,
  placement: Option<Placement>,
  reconciliation: Option<ReconciliationService>,
  alerts: Arc<dyn AlertSink>,
  metrics: Arc<dyn MetricsSink>,
  sizer: StakeSizer,
  strategy: StrategySettings,
  settings: LoopSettings,
  ledger: ExposureLedger,
  last_remaining: Option<u32>,
  last_reconcile: Option<Instant>,
  gate_alerted: bool,
}

impl TradingLoop {
  pub fn new(
    ledger: ExposureLedger,
    sizer: StakeSizer,
    strategy: StrategySettings,
    settings: LoopSettings,
    metrics: Arc<dyn MetricsSink>,
    alerts: Arc<dyn AlertSink>,
  ) -> Self {
    Self {
      source: None,
      placement: None,
      reconciliation: None,
      alerts,
      metrics,
      sizer,
      strategy,
      settings,
      ledger,
      last_remaining: None,
      last_reconcile: None,
      gate_alerted: false,
    }
  }

  /// Poll `source` for snapshots.
  pub fn with_source(mut self, source: Arc<dyn MarketDataSource>) -> Self {
    self.source = Some(source);
    self
  }

  /// Place qualified opportunities; without this the loop only observes.
  pub fn with_placement(mut self, placement: Placement) -> Self {
    self.placement = Some(placement);
    self
  }

  /// Reconcile cleared orders every `reconcile_interval`.
  pub fn with_reconciliation(mut self, service: ReconciliationService) -> Self {
    self.reconciliation = Some(service);
    self
  }

  pub fn ledger(&self) -> &ExposureLedger {
    &self.ledger
  }

  /// Run until the iteration budget is spent or `shutdown` fires.
  #[instrument(skip_all, name = "trading_loop")]
  pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> LoopSummary {
    info!(
      iterations = ?self.settings.iterations,
      poll_ms = self.settings.poll_interval.as_millis() as u64,
      strategy = %self.sizer.strategy(),
      "Starting trading loop"
    );

    let mut summary = LoopSummary::default();

    loop {
      match self.run_iteration().await {
        Ok(report) => summary.bets_recorded += report.bets_recorded,
        Err(e) => {
          summary.failed_iterations += 1;
          warn!(error = ?e, "Iteration failed, continuing");
        }
      }
      summary.iterations += 1;

      if self.settings.iterations.is_some_and(|n| summary.iterations >= n) {
        break;
      }

      tokio::select! {
        _ = shutdown.recv() => {
          info!("Shutdown signal received, stopping trading loop");
          break;
        }
        _ = tokio::time::sleep(self.settings.poll_interval) => {}
      }
    }

    summary.balance = self.ledger.balance();
    summary.exposure = self.ledger.current_exposure();
    summary.pnl = self.ledger.pnl();
    info!(
      iterations = summary.iterations,
      failed = summary.failed_iterations,
      bets = summary.bets_recorded,
      balance = summary.balance,
      pnl = summary.pnl,
      "Trading loop stopped"
    );
    summary
  }

  /// One poll: snapshot, settlements, reconciliation, placement.
  ///
  /// # Errors
  /// A failed or malformed snapshot aborts the iteration. Reconciliation
  /// and placement failures are logged, not returned.
  pub async fn run_iteration(&mut self) -> Result<IterationReport> {
    let mut report = IterationReport::default();

    let snapshot = match &self.source {
      Some(source) => {
        let snapshot = source.get_snapshot().await.context("Snapshot fetch failed")?;
        snapshot.validate().context("Unusable snapshot")?;
        Some(snapshot)
      }
      None => None,
    };

    if let Some(snapshot) = &snapshot {
      report.snapshot = true;
      report.shoe_reset = self.track_shoe(snapshot);
      report.settlements_applied = self.apply_settlements(snapshot);
    }

    report.reconciliation = self.reconcile_if_due().await;

    if let Some(snapshot) = &snapshot {
      let opportunities = self.find_opportunities(snapshot);
      report.opportunities = opportunities.len();
      for opportunity in opportunities {
        self.place(opportunity, &mut report).await;
      }
    }

    self
      .metrics
      .ledger(self.ledger.balance(), self.ledger.current_exposure(), self.ledger.pnl());
    Ok(report)
  }

  /// Qualified opportunities in `snapshot`, best edge first, sized
  /// against the current balance.
  pub fn find_opportunities(&self, snapshot: &MarketSnapshot) -> Vec<Opportunity> {
    let probabilities = EventProbabilities::from_shoe(&snapshot.shoe);
    let mut found = Vec::new();

    for selection in snapshot.selections.iter().filter(|s| s.is_in_play()) {
      let Some(true_prob) = probabilities.for_selection(&selection.name) else {
        debug!(selection = %selection.name, "No probability model for selection");
        continue;
      };

      let mut actions = vec![Action::Back];
      if self.strategy.allow_lay {
        actions.push(Action::Lay);
      }

      for action in actions {
        let Some(price) = selection.price_for(action) else {
          continue;
        };
        let (qualifies, edge) = evaluate(true_prob, price, action, self.strategy.min_edge);
        if !qualifies {
          continue;
        }
        let mut opportunity = Opportunity {
          selection: selection.clone(),
          true_prob,
          market_price: price,
          edge,
          action,
          stake: 0.0,
        };
        opportunity.stake = self.stake_for(&opportunity);
        found.push(opportunity);
      }
    }

    rank_opportunities(found)
  }

  /// Kelly applies to backs only; lays are sized proportionally.
  fn stake_for(&self, opportunity: &Opportunity) -> f64 {
    let balance = self.ledger.balance();
    match opportunity.action {
      Action::Back => self.sizer.size(
        balance,
        opportunity.edge,
        Some(opportunity.market_price),
        Some(opportunity.true_prob),
      ),
      Action::Lay => self.sizer.size(balance, opportunity.edge, None, None),
    }
  }

  fn track_shoe(&mut self, snapshot: &MarketSnapshot) -> bool {
    let remaining = snapshot.shoe.cards_remaining();
    let reset = self
      .last_remaining
      .is_some_and(|prev| is_shoe_reset(prev, remaining));
    if reset {
      info!(remaining, "Shoe reset detected");
      self.metrics.shoe_reset();
    }
    self.last_remaining = Some(remaining);
    reset
  }

  fn apply_settlements(&mut self, snapshot: &MarketSnapshot) -> usize {
    let mut applied = 0;
    for settlement in &snapshot.settlements {
      info!(
        bet_id = ?settlement.bet_id,
        selection = ?settlement.selection_id,
        status = %settlement.status,
        payout = settlement.payout,
        "Settlement received"
      );
      let Some(bet_id) = settlement.bet_id.as_deref() else {
        warn!("Settlement without betId; skipped");
        continue;
      };
      if let Some(profit) = self
        .ledger
        .process_settlement(bet_id, &settlement.status, settlement.payout)
      {
        self.metrics.settlement(profit > 0.0);
        applied += 1;
      }
    }
    applied
  }

  async fn reconcile_if_due(&mut self) -> Option<ReconciliationReport> {
    let service = self.reconciliation.as_ref()?;
    let due = self
      .last_reconcile
      .is_none_or(|last| last.elapsed() >= self.settings.reconcile_interval);
    if !due {
      return None;
    }
    self.last_reconcile = Some(Instant::now());

    match service.run_once(&mut self.ledger, Utc::now()).await {
      Ok(report) => Some(report),
      Err(e) => {
        error!(error = ?e, "Reconciliation failed");
        None
      }
    }
  }

  async fn place(&mut self, mut opportunity: Opportunity, report: &mut IterationReport) {
    // Earlier placements this iteration moved the balance.
    opportunity.stake = self.stake_for(&opportunity);
    if opportunity.stake <= 0.0 {
      debug!(selection = %opportunity.selection.name, "Stake sized to zero, skipping");
      return;
    }

    let executor = match &self.placement {
      None => {
        info!(
          selection = %opportunity.selection.name,
          edge = opportunity.edge,
          stake = opportunity.stake,
          "Opportunity (observe only)"
        );
        return;
      }
      Some(Placement::Direct(executor)) => executor,
      Some(Placement::Gated { executor, gate }) => {
        if !gate.live_allowed() {
          report.gate_blocked += 1;
          warn!(status = ?gate.status(), "Live placement blocked by operator gate; skipping");
          if !self.gate_alerted {
            self.gate_alerted = true;
            self
              .alerts
              .send(AlertLevel::Warning, "Live betting attempt blocked by gating")
              .await;
          }
          return;
        }
        executor
      }
    };

    info!(
      selection = %opportunity.selection.name,
      action = %opportunity.action,
      price = opportunity.market_price,
      true_prob = opportunity.true_prob,
      edge = opportunity.edge,
      stake = opportunity.stake,
      "Opportunity"
    );

    match executor.execute(&opportunity, &mut self.ledger).await {
      Ok(ExecutionOutcome::Recorded { .. }) => report.bets_recorded += 1,
      Ok(ExecutionOutcome::CapacityRejected) => {
        report.capacity_rejections += 1;
        let message = format!(
          "Skipping {} opportunity due to exposure/balance limits: stake={:.2} exposure={:.2}/{:.2} balance={:.2}",
          opportunity.selection.name,
          opportunity.stake,
          self.ledger.current_exposure(),
          self.ledger.max_exposure(),
          self.ledger.balance(),
        );
        self.alerts.send(AlertLevel::Warning, &message).await;
      }
      Ok(_) => {}
      Err(e) => error!(error = ?e, "Order submission failed"),
    }
  }
}

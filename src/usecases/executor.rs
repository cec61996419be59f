//! Bet Executor - Order Submission and Ledger Booking
//!
//! Turns a sized opportunity into an exchange order:
//! - Stakes truncated to whole cents, so the ledger books exactly what
//!   the exchange holds
//! - Capacity check against the ledger before anything is sent
//! - Submission rate limiting (orders per minute)
//! - Booking accepted bets into the ledger by bet ID
//!
//! Capacity and throttling refusals are ordinary outcomes, not errors.

use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::Result;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, info, instrument, warn};

use crate::domain::error::LedgerError;
use crate::domain::market::{BetId, Opportunity};
use crate::domain::stake::to_exchange_stake;
use crate::ports::execution::{OrderGateway, OrderRequest};
use crate::ports::metrics::MetricsSink;
use crate::usecases::ledger::ExposureLedger;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// What happened to one opportunity.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
  /// Accepted and booked into the ledger.
  Recorded { bet_id: BetId, stake: f64 },
  /// Accepted without a bet ID; cannot be tracked, nothing booked.
  AcceptedUntracked,
  /// Refused by the exchange.
  Rejected { reason: Option<String> },
  /// Accepted, but the ledger refused to book it.
  LedgerRefused(LedgerError),
  /// Not sent: stake exceeds balance or exposure headroom.
  CapacityRejected,
  /// Not sent: order rate limit reached.
  Throttled,
  /// Not sent: stake truncates to less than one cent.
  StakeTooSmall,
}

/// Submits opportunities through an [`OrderGateway`].
pub struct BetExecutor {
  gateway: Arc<dyn OrderGateway>,
  metrics: Arc<dyn MetricsSink>,
  limiter: Option<DirectLimiter>,
}

impl BetExecutor {
  /// `max_orders_per_minute == 0` disables rate limiting.
  pub fn new(gateway: Arc<dyn OrderGateway>, metrics: Arc<dyn MetricsSink>, max_orders_per_minute: u32) -> Self {
    let limiter = NonZeroU32::new(max_orders_per_minute).map(|n| RateLimiter::direct(Quota::per_minute(n)));
    Self {
      gateway,
      metrics,
      limiter,
    }
  }

  /// Submit `opportunity` and book it on acceptance.
  ///
  /// # Errors
  /// Only transport failures from the gateway propagate.
  #[instrument(skip_all, fields(selection = %opportunity.selection.name, action = %opportunity.action, stake = opportunity.stake))]
  pub async fn execute(&self, opportunity: &Opportunity, ledger: &mut ExposureLedger) -> Result<ExecutionOutcome> {
    let Some(stake) = to_exchange_stake(opportunity.stake).and_then(|d| d.to_f64()) else {
      debug!("Stake below one cent, skipping");
      return Ok(ExecutionOutcome::StakeTooSmall);
    };
    let opportunity = Opportunity {
      stake,
      ..opportunity.clone()
    };

    if !ledger.can_place(stake) {
      self.metrics.capacity_rejection();
      warn!(
        balance = ledger.balance(),
        exposure = ledger.current_exposure(),
        max_exposure = ledger.max_exposure(),
        "Insufficient capacity for stake"
      );
      return Ok(ExecutionOutcome::CapacityRejected);
    }

    if let Some(limiter) = &self.limiter {
      if limiter.check().is_err() {
        debug!("Order rate limit reached, skipping");
        return Ok(ExecutionOutcome::Throttled);
      }
    }

    let request = OrderRequest {
      selection_id: opportunity.selection.selection_id.clone(),
      action: opportunity.action,
      price: opportunity.market_price,
      stake,
    };

    self.metrics.bet_placed(&opportunity.selection.name);
    let receipt = self.gateway.submit(&request).await?;

    if !receipt.is_accepted() {
      info!(reason = ?receipt.message, "Order rejected");
      return Ok(ExecutionOutcome::Rejected {
        reason: receipt.message,
      });
    }
    self.metrics.bet_accepted(&opportunity.selection.name);

    let Some(bet_id) = receipt.bet_id else {
      warn!("Accepted bet without betId; cannot track it");
      return Ok(ExecutionOutcome::AcceptedUntracked);
    };

    match ledger.record_accepted(&bet_id, opportunity) {
      Ok(()) => {
        self.metrics.ledger(ledger.balance(), ledger.current_exposure(), ledger.pnl());
        Ok(ExecutionOutcome::Recorded { bet_id, stake })
      }
      Err(e) => {
        warn!(bet_id = %bet_id, error = %e, "Ledger refused accepted bet");
        Ok(ExecutionOutcome::LedgerRefused(e))
      }
    }
  }
}

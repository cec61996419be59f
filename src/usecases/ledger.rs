//! Exposure Ledger - Capital Reservation and Settlement
//!
//! Tracks free balance, capital reserved by live bets, realized P&L and a
//! per-settlement history:
//! - Acceptance reserves the stake (balance down, exposure up)
//! - Settlement releases it through either the snapshot settlement
//!   path or the cleared-order path, whichever sees the bet first
//! - Removing the live record is what makes settlement idempotent
//!
//! `current_exposure` always equals the sum of live stakes (floored at 0).

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::error::LedgerError;
use crate::domain::market::{BetId, BetOutcome, ClearedOrder, Opportunity};

/// A live bet owned by the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct BetRecord {
  pub stake: f64,
  /// Decimal odds the bet was placed at.
  pub price: f64,
  pub opportunity: Opportunity,
}

/// One settled bet, as appended to the history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
  pub bet_id: BetId,
  pub profit: f64,
  /// Free balance right after settlement.
  pub balance: f64,
}

/// Single-writer capital ledger owned by the trading loop.
#[derive(Debug, Clone)]
pub struct ExposureLedger {
  balance: f64,
  max_exposure: f64,
  current_exposure: f64,
  pnl: f64,
  active: HashMap<BetId, BetRecord>,
  trade_history: Vec<TradeRecord>,
}

impl ExposureLedger {
  pub fn new(balance: f64, max_exposure: f64) -> Self {
    Self {
      balance,
      max_exposure,
      current_exposure: 0.0,
      pnl: 0.0,
      active: HashMap::new(),
      trade_history: Vec::new(),
    }
  }

  /// Ledger whose exposure cap is a fixed fraction of the starting balance.
  pub fn with_exposure_pct(start_balance: f64, max_exposure_pct: f64) -> Self {
    Self::new(start_balance, start_balance * max_exposure_pct)
  }

  /// True when `stake` fits in both the free balance and the exposure cap.
  pub fn can_place(&self, stake: f64) -> bool {
    stake <= self.balance && self.current_exposure + stake <= self.max_exposure
  }

  /// Reserve capital for an accepted bet.
  ///
  /// # Errors
  /// Rejects an ID that is already live, and non-positive stakes.
  /// Nothing is mutated on error.
  pub fn record_accepted(&mut self, bet_id: &str, opportunity: Opportunity) -> Result<(), LedgerError> {
    let stake = opportunity.stake;
    if !(stake.is_finite() && stake > 0.0) {
      return Err(LedgerError::InvalidStake(stake));
    }
    if self.active.contains_key(bet_id) {
      return Err(LedgerError::DuplicateBet(bet_id.to_string()));
    }

    let record = BetRecord {
      stake,
      price: opportunity.market_price,
      opportunity,
    };
    self.active.insert(bet_id.to_string(), record);
    self.balance -= stake;
    self.current_exposure += stake;

    info!(
      bet_id,
      stake,
      balance = self.balance,
      exposure = self.current_exposure,
      "Bet recorded"
    );
    Ok(())
  }

  /// Settle a bet reported with a table snapshot.
  ///
  /// `payout` is the winnings excluding the returned stake. Unknown or
  /// already-settled IDs return `None` and change nothing.
  pub fn process_settlement(&mut self, bet_id: &str, status: &BetOutcome, payout: f64) -> Option<f64> {
    let Some(record) = self.active.remove(bet_id) else {
      debug!(bet_id, "Settlement for unknown or already settled bet");
      return None;
    };

    let profit = if status.is_won() {
      self.balance += record.stake + payout;
      payout
    } else {
      -record.stake
    };

    Some(self.close(bet_id, record.stake, profit))
  }

  /// Settle a bet reported by the cleared-order feed.
  ///
  /// An explicit profit wins over the outcome; otherwise a win pays
  /// `stake * (price - 1)`. Commission comes off both balance and profit.
  pub fn process_cleared_order(&mut self, cleared: &ClearedOrder) -> Option<f64> {
    let Some(record) = self.active.remove(&cleared.bet_id) else {
      debug!(bet_id = %cleared.bet_id, "Cleared order for unknown or already settled bet");
      return None;
    };

    let mut profit = match cleared.profit {
      Some(profit) => {
        self.balance += record.stake + profit;
        profit
      }
      None if cleared.outcome.is_won() => {
        let payout = record.stake * (record.price - 1.0);
        self.balance += record.stake + payout;
        payout
      }
      None => -record.stake,
    };

    if let Some(commission) = cleared.commission.filter(|c| *c != 0.0) {
      self.balance -= commission;
      profit -= commission;
    }

    Some(self.close(&cleared.bet_id, record.stake, profit))
  }

  /// Common tail of both settlement paths.
  fn close(&mut self, bet_id: &str, stake: f64, profit: f64) -> f64 {
    self.current_exposure = (self.current_exposure - stake).max(0.0);
    self.pnl += profit;
    self.trade_history.push(TradeRecord {
      bet_id: bet_id.to_string(),
      profit,
      balance: self.balance,
    });

    if self.active.is_empty() && self.current_exposure > 1e-9 {
      warn!(exposure = self.current_exposure, "Exposure left with no live bets");
    }

    info!(
      bet_id,
      profit,
      balance = self.balance,
      exposure = self.current_exposure,
      pnl = self.pnl,
      "Bet settled"
    );
    profit
  }

  pub fn balance(&self) -> f64 {
    self.balance
  }

  pub fn max_exposure(&self) -> f64 {
    self.max_exposure
  }

  pub fn current_exposure(&self) -> f64 {
    self.current_exposure
  }

  pub fn pnl(&self) -> f64 {
    self.pnl
  }

  pub fn trade_history(&self) -> &[TradeRecord] {
    &self.trade_history
  }

  /// Number of live bets.
  pub fn active_bets(&self) -> usize {
    self.active.len()
  }

  pub fn is_active(&self, bet_id: &str) -> bool {
    self.active.contains_key(bet_id)
  }

  pub fn active_bet(&self, bet_id: &str) -> Option<&BetRecord> {
    self.active.get(bet_id)
  }

  /// Sum of live stakes.
  pub fn live_stake_total(&self) -> f64 {
    self.active.values().map(|r| r.stake).sum()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::market::{Action, MarketSelection, SelectionStatus};

  fn opportunity(stake: f64, price: f64) -> Opportunity {
    Opportunity {
      selection: MarketSelection {
        selection_id: "1".to_string(),
        name: "Pocket Pair In Any Hand".to_string(),
        status: SelectionStatus::InPlay,
        best_back_price: Some(price),
        best_lay_price: None,
      },
      true_prob: 0.25,
      market_price: price,
      edge: 0.1,
      action: Action::Back,
      stake,
    }
  }

  fn cleared(bet_id: &str, outcome: &str, profit: Option<f64>, commission: Option<f64>) -> ClearedOrder {
    ClearedOrder {
      bet_id: bet_id.to_string(),
      outcome: BetOutcome::parse(outcome),
      profit,
      commission,
      settled_at: None,
      settled_raw: None,
      raw: String::new(),
    }
  }

  #[test]
  fn test_accept_then_win() {
    let mut ledger = ExposureLedger::new(1000.0, 100.0);
    ledger.record_accepted("b1", opportunity(31.25, 5.0)).unwrap();
    assert_eq!(ledger.balance(), 968.75);
    assert_eq!(ledger.current_exposure(), 31.25);

    let profit = ledger.process_settlement("b1", &BetOutcome::Won, 125.0);
    assert_eq!(profit, Some(125.0));
    assert_eq!(ledger.balance(), 1125.0);
    assert_eq!(ledger.current_exposure(), 0.0);
    assert_eq!(ledger.pnl(), 125.0);
    assert_eq!(
      ledger.trade_history(),
      &[TradeRecord {
        bet_id: "b1".to_string(),
        profit: 125.0,
        balance: 1125.0
      }]
    );
  }

  #[test]
  fn test_loss_keeps_stake_removed() {
    let mut ledger = ExposureLedger::new(1000.0, 100.0);
    ledger.record_accepted("b1", opportunity(20.0, 5.0)).unwrap();
    assert_eq!(ledger.process_settlement("b1", &BetOutcome::Lost, 0.0), Some(-20.0));
    assert_eq!(ledger.balance(), 980.0);
    assert_eq!(ledger.pnl(), -20.0);
  }

  #[test]
  fn test_settlement_is_idempotent_across_paths() {
    let mut ledger = ExposureLedger::new(1000.0, 100.0);
    ledger.record_accepted("b1", opportunity(10.0, 3.0)).unwrap();
    assert!(ledger.process_settlement("b1", &BetOutcome::Won, 20.0).is_some());
    let balance = ledger.balance();

    assert_eq!(ledger.process_settlement("b1", &BetOutcome::Won, 20.0), None);
    assert_eq!(ledger.process_cleared_order(&cleared("b1", "WON", None, None)), None);
    assert_eq!(ledger.balance(), balance);
    assert_eq!(ledger.trade_history().len(), 1);
  }

  #[test]
  fn test_unknown_bet_is_noop() {
    let mut ledger = ExposureLedger::new(500.0, 50.0);
    assert_eq!(ledger.process_settlement("nope", &BetOutcome::Won, 5.0), None);
    assert_eq!(ledger.balance(), 500.0);
  }

  #[test]
  fn test_cleared_with_explicit_profit_and_commission() {
    let mut ledger = ExposureLedger::new(1000.0, 100.0);
    ledger.record_accepted("b1", opportunity(10.0, 5.0)).unwrap();
    let profit = ledger
      .process_cleared_order(&cleared("b1", "WON", Some(40.0), Some(2.0)))
      .unwrap();
    assert_eq!(profit, 38.0);
    assert_eq!(ledger.balance(), 1038.0);
    assert_eq!(ledger.pnl(), 38.0);
  }

  #[test]
  fn test_cleared_without_profit_uses_price() {
    let mut ledger = ExposureLedger::new(1000.0, 100.0);
    ledger.record_accepted("w", opportunity(10.0, 3.0)).unwrap();
    ledger.record_accepted("l", opportunity(10.0, 3.0)).unwrap();
    assert_eq!(ledger.process_cleared_order(&cleared("w", "WON", None, None)), Some(20.0));
    assert_eq!(ledger.process_cleared_order(&cleared("l", "LOST", None, None)), Some(-10.0));
    assert_eq!(ledger.balance(), 1010.0);
    assert_eq!(ledger.current_exposure(), 0.0);
  }

  #[test]
  fn test_capacity_checks() {
    let mut ledger = ExposureLedger::with_exposure_pct(1000.0, 0.05);
    assert_eq!(ledger.max_exposure(), 50.0);
    assert!(ledger.can_place(50.0));
    assert!(!ledger.can_place(50.01));
    ledger.record_accepted("b1", opportunity(30.0, 5.0)).unwrap();
    assert!(ledger.can_place(20.0));
    assert!(!ledger.can_place(25.0));

    let poor = ExposureLedger::new(10.0, 100.0);
    assert!(!poor.can_place(11.0));
  }

  #[test]
  fn test_rejects_duplicate_and_bad_stake() {
    let mut ledger = ExposureLedger::new(1000.0, 100.0);
    ledger.record_accepted("b1", opportunity(10.0, 5.0)).unwrap();
    assert_eq!(
      ledger.record_accepted("b1", opportunity(10.0, 5.0)),
      Err(LedgerError::DuplicateBet("b1".to_string()))
    );
    assert_eq!(
      ledger.record_accepted("b2", opportunity(0.0, 5.0)),
      Err(LedgerError::InvalidStake(0.0))
    );
    assert_eq!(ledger.balance(), 990.0);
    assert_eq!(ledger.current_exposure(), 10.0);
    assert_eq!(ledger.active_bets(), 1);
  }
}

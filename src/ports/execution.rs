//! Order Execution Port - Side-Bet Order Submission
//!
//! Defines the trait for submitting a single limit bet on a side-bet
//! selection. One adapter per transport is chosen at construction time.

use async_trait::async_trait;

use crate::domain::market::{Action, BetId, OrderStatus, SelectionId};

/// A bet to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
  pub selection_id: SelectionId,
  pub action: Action,
  /// Decimal odds.
  pub price: f64,
  /// Stake in account currency, before exchange truncation.
  pub stake: f64,
}

/// Result of an order submission attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderReceipt {
  pub status: OrderStatus,
  /// Assigned bet ID. Accepted orders normally carry one.
  pub bet_id: Option<BetId>,
  /// Rejection reason or exchange error code.
  pub message: Option<String>,
}

impl OrderReceipt {
  pub fn accepted(bet_id: impl Into<BetId>) -> Self {
    Self {
      status: OrderStatus::Accepted,
      bet_id: Some(bet_id.into()),
      message: None,
    }
  }

  pub fn rejected(reason: impl Into<String>) -> Self {
    Self {
      status: OrderStatus::Rejected,
      bet_id: None,
      message: Some(reason.into()),
    }
  }

  pub fn is_accepted(&self) -> bool {
    self.status == OrderStatus::Accepted
  }
}

/// Trait for order submission providers.
#[async_trait]
pub trait OrderGateway: Send + Sync + 'static {
  /// Submit a single bet.
  ///
  /// # Errors
  /// Returns an error only for transport failures that survived retries.
  /// Exchange-side refusals come back as a rejected receipt.
  async fn submit(&self, request: &OrderRequest) -> anyhow::Result<OrderReceipt>;
}

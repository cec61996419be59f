//! Cleared Orders Port - Asynchronous Settlement Feed
//!
//! The exchange reports settled bets through a query interface that is
//! independent of the market data stream. The same bet may appear in
//! several overlapping windows; callers deduplicate by bet ID.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::market::ClearedOrder;

/// Closed settlement-time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
  pub from: DateTime<Utc>,
  pub to: DateTime<Utc>,
}

/// Trait for cleared-order providers.
#[async_trait]
pub trait ClearedOrderFeed: Send + Sync + 'static {
  /// Settled bets whose settlement time falls inside `range`.
  async fn query(&self, range: TimeRange) -> anyhow::Result<Vec<ClearedOrder>>;
}

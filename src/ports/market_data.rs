//! Market Data Port - Shoe and Price Snapshots
//!
//! One poll returns the current shoe composition, the quoted side-bet
//! selections and any settlements the table pushed since the last poll.

use async_trait::async_trait;

use crate::domain::market::MarketSnapshot;

/// Trait for market data providers.
///
/// Implementors validate the shoe before returning it; a snapshot that
/// lacks shoe or selection data is an error and the loop skips the
/// iteration.
///
/// A source with no shoe data returns an empty shoe with nothing dealt
/// (`ShoeState::new(0, 0, [])`); a shoe played to exhaustion always has
/// `cards_dealt > 0`, so the two never collide.
#[async_trait]
pub trait MarketDataSource: Send + Sync + 'static {
  /// Fetch the current snapshot.
  async fn get_snapshot(&self) -> anyhow::Result<MarketSnapshot>;
}

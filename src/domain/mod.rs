//! Domain layer - Core pricing logic and models.
//!
//! Pure side-bet pricing for the baccarat edge bot: shoe composition,
//! exact event probabilities, edge against exchange odds and stake sizing.
//! Nothing here performs I/O (hexagonal architecture inner ring).

pub mod edge;
pub mod error;
pub mod market;
pub mod probability;
pub mod shoe;
pub mod stake;

// Re-export core types for convenience
pub use edge::{evaluate, evaluate_side, EXCHANGE_COMMISSION};
pub use error::{LedgerError, ShoeError, SnapshotError};
pub use market::{
    parse_settled_timestamp, rank_opportunities, Action, BetId, BetOutcome, ClearedOrder,
    MarketSelection, MarketSnapshot, Opportunity, OrderStatus, SelectionId, SelectionStatus,
    SettlementEvent,
};
pub use probability::{probability, EventProbabilities, SideBetEvent};
pub use shoe::{is_shoe_reset, ShoeState};
pub use stake::{SizingStrategy, StakeSizer};

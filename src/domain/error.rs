//! Domain errors.
//!
//! Typed failures raised by pure domain constructors and the ledger.
//! Everything above the domain layer wraps these in `anyhow`.

use thiserror::Error;

/// Rejected shoe composition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShoeError {
    #[error("rank {0} is outside 1..=13")]
    InvalidRank(u8),

    #[error("rank {rank} appears more than once in card counts")]
    DuplicateRank { rank: u8 },

    #[error("cards_remaining is {declared} but card counts sum to {counted}")]
    InconsistentCount { declared: u32, counted: u32 },
}

/// Malformed or incomplete market snapshot (the loop skips the iteration).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("snapshot is missing shoe data")]
    MissingShoe,

    #[error("snapshot is missing market selections")]
    MissingSelections,

    #[error("invalid shoe: {0}")]
    Shoe(#[from] ShoeError),
}

/// Ledger precondition violations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("bet {0} is already active")]
    DuplicateBet(String),

    #[error("stake must be positive and finite, got {0}")]
    InvalidStake(f64),
}

//! Market and bet domain types.
//!
//! Defines selections quoted on the side-bet market, the opportunities
//! we derive from them, and the settlement records that flow back.
//!
//! Exposes lightweight `String` identifiers at the ports boundary, the
//! same way the rest of the crate passes ids between layers.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::SnapshotError;
use super::shoe::ShoeState;

// ────────────────────────────────────────────
// Identifiers
// ────────────────────────────────────────────

/// Exchange-assigned bet identifier.
pub type BetId = String;

/// Market selection identifier.
pub type SelectionId = String;

// ────────────────────────────────────────────
// Enums
// ────────────────────────────────────────────

/// Which side of an outcome we take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// Bet for the outcome.
    Back,
    /// Bet against the outcome.
    Lay,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Back => write!(f, "BACK"),
            Self::Lay => write!(f, "LAY"),
        }
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BACK" => Ok(Self::Back),
            "LAY" => Ok(Self::Lay),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

/// Trading status of a selection. Only `InPlay` selections are priced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionStatus {
    InPlay,
    Other(String),
}

impl SelectionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "IN_PLAY" => Self::InPlay,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Result of a settled bet. Anything other than `WON` settles as a loss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BetOutcome {
    Won,
    Lost,
    Other(String),
}

impl BetOutcome {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "WON" => Self::Won,
            "LOST" => Self::Lost,
            other => Self::Other(other.to_string()),
        }
    }

    pub const fn is_won(&self) -> bool {
        matches!(self, Self::Won)
    }
}

impl std::fmt::Display for BetOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Won => write!(f, "WON"),
            Self::Lost => write!(f, "LOST"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

// ────────────────────────────────────────────
// Snapshot contents
// ────────────────────────────────────────────

/// One quoted selection of the side-bet market.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSelection {
    pub selection_id: SelectionId,
    /// Catalogue name, e.g. "Pocket Pair In Any Hand".
    pub name: String,
    pub status: SelectionStatus,
    /// Best available decimal odds to back.
    pub best_back_price: Option<f64>,
    /// Best available decimal odds to lay.
    pub best_lay_price: Option<f64>,
}

impl MarketSelection {
    pub fn is_in_play(&self) -> bool {
        self.status == SelectionStatus::InPlay
    }

    /// Quoted price for `action`, if present and usable (> 1.0).
    pub fn price_for(&self, action: Action) -> Option<f64> {
        let price = match action {
            Action::Back => self.best_back_price,
            Action::Lay => self.best_lay_price,
        };
        price.filter(|p| p.is_finite() && *p > 1.0)
    }
}

/// Settlement pushed with a market snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementEvent {
    /// Missing ids cannot be matched to a ledger record.
    pub bet_id: Option<BetId>,
    pub selection_id: Option<SelectionId>,
    pub status: BetOutcome,
    /// Winnings excluding the returned stake.
    pub payout: f64,
}

/// Everything one poll of the market data source yields.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub shoe: ShoeState,
    pub selections: Vec<MarketSelection>,
    pub settlements: Vec<SettlementEvent>,
}

impl MarketSnapshot {
    /// Reject snapshots that cannot be priced.
    ///
    /// An empty shoe with nothing dealt is how a source reports absent
    /// shoe data. An exhausted shoe still has `cards_dealt > 0` and is
    /// priced (every event at 0.0).
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.shoe.cards_dealt() == 0 && self.shoe.cards_remaining() == 0 {
            return Err(SnapshotError::MissingShoe);
        }
        if self.selections.is_empty() {
            return Err(SnapshotError::MissingSelections);
        }
        Ok(())
    }
}

// ────────────────────────────────────────────
// Opportunities and settlements
// ────────────────────────────────────────────

/// A priced, sized candidate bet.
#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    pub selection: MarketSelection,
    pub true_prob: f64,
    pub market_price: f64,
    pub edge: f64,
    pub action: Action,
    pub stake: f64,
}

/// Sort opportunities by edge, best first.
pub fn rank_opportunities(mut opportunities: Vec<Opportunity>) -> Vec<Opportunity> {
    opportunities.sort_by(|a, b| b.edge.total_cmp(&a.edge));
    opportunities
}

/// Settled bet reported by the asynchronous cleared-order feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ClearedOrder {
    pub bet_id: BetId,
    pub outcome: BetOutcome,
    /// Net profit as reported by the exchange, if provided.
    pub profit: Option<f64>,
    /// Commission charged on the bet, if any.
    pub commission: Option<f64>,
    /// Settlement time; `None` when absent or unparseable.
    pub settled_at: Option<DateTime<Utc>>,
    /// Settlement time exactly as the feed sent it.
    pub settled_raw: Option<String>,
    /// Original record, kept for the audit trail.
    pub raw: String,
}

/// Parse a feed timestamp. Offsets are honoured; naive times are UTC.
pub fn parse_settled_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Outcome of an order submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    Accepted,
    Rejected,
}

//! Stake sizing.
//!
//! Converts a qualifying edge into a stake. Two strategies are supported:
//! fractional Kelly on decimal odds, and a proportional scheme that scales
//! the exposure budget by how large the edge is.
//!
//! Every stake is clamped to the smaller of the exposure budget and the
//! per-bet cap, both expressed as fractions of the current balance.
//!
//! Sizing works in `f64`; the exchange boundary converts to `Decimal`
//! with [`to_exchange_stake`].

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// Edge at which the proportional strategy commits the full budget.
const PROPORTIONAL_FULL_EDGE: f64 = 0.1;

/// Sizing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizingStrategy {
    #[default]
    Kelly,
    Proportional,
}

impl std::fmt::Display for SizingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kelly => write!(f, "kelly"),
            Self::Proportional => write!(f, "proportional"),
        }
    }
}

/// Per-bet cap as a fraction of balance. Smaller bankrolls bet smaller.
pub fn max_stake_pct_for_balance(balance: f64) -> f64 {
    if balance < 100.0 {
        0.03
    } else if balance < 200.0 {
        0.04
    } else {
        0.05
    }
}

/// Fraction of bankroll full Kelly would stake at decimal odds `price`.
///
/// `b = price - 1` is the net odds; no positive fraction exists when
/// `b <= 0` or the bet has negative expectation.
pub fn kelly_fraction(true_prob: f64, price: f64) -> f64 {
    let b = (price - 1.0).max(0.0);
    if b <= 0.0 {
        return 0.0;
    }
    let q = 1.0 - true_prob;
    ((b * true_prob - q) / b).max(0.0)
}

/// Stake sizer configured from the strategy section.
#[derive(Debug, Clone)]
pub struct StakeSizer {
    strategy: SizingStrategy,
    /// Kelly multiplier (0.5 = half-Kelly).
    shrink: f64,
    /// Exposure budget as a fraction of balance.
    max_exposure_pct: f64,
    /// Fixed per-bet cap. `None` uses the balance tiers.
    max_stake_pct: Option<f64>,
}

impl StakeSizer {
    pub fn new(
        strategy: SizingStrategy,
        shrink: f64,
        max_exposure_pct: f64,
        max_stake_pct: Option<f64>,
    ) -> Self {
        Self {
            strategy,
            shrink,
            max_exposure_pct,
            max_stake_pct,
        }
    }

    pub const fn strategy(&self) -> SizingStrategy {
        self.strategy
    }

    /// Per-bet cap that applies at `balance`.
    pub fn max_stake_pct(&self, balance: f64) -> f64 {
        self.max_stake_pct
            .unwrap_or_else(|| max_stake_pct_for_balance(balance))
    }

    /// Size a bet for the current `balance`.
    ///
    /// Kelly needs both `price` and `true_prob`; without either it falls
    /// back to proportional sizing.
    pub fn size(&self, balance: f64, edge: f64, price: Option<f64>, true_prob: Option<f64>) -> f64 {
        if balance <= 0.0 || !balance.is_finite() {
            return 0.0;
        }

        let raw = match (self.strategy, price, true_prob) {
            (SizingStrategy::Kelly, Some(price), Some(p)) => {
                balance * kelly_fraction(p, price) * self.shrink
            }
            _ => self.proportional(balance, edge),
        };

        let cap = (balance * self.max_exposure_pct).min(balance * self.max_stake_pct(balance));
        raw.clamp(0.0, cap.max(0.0))
    }

    fn proportional(&self, balance: f64, edge: f64) -> f64 {
        if edge <= 0.0 {
            return 0.0;
        }
        let scale = (edge / PROPORTIONAL_FULL_EDGE).min(1.0);
        balance * self.max_exposure_pct * scale
    }
}

/// Stake as the exchange accepts it: truncated (never rounded up) to cents.
///
/// Returns `None` for values that cannot be represented or are not positive.
pub fn to_exchange_stake(stake: f64) -> Option<Decimal> {
    let value = Decimal::from_f64(stake)?;
    let truncated = value.round_dp_with_strategy(2, RoundingStrategy::ToZero);
    (truncated > Decimal::ZERO).then_some(truncated)
}

//! Edge evaluation against exchange prices.
//!
//! Compares a true probability with the probability implied by decimal
//! odds, net of the exchange's settlement commission.

use super::market::Action;

/// Exchange commission charged on every bet, as a probability haircut.
pub const EXCHANGE_COMMISSION: f64 = 0.025;

/// Default minimum net edge required to act.
pub const DEFAULT_MIN_EDGE: f64 = 0.05;

/// Probability encoded by decimal odds.
///
/// Callers filter out missing and non-positive prices first.
pub fn implied_probability(price: f64) -> f64 {
    1.0 / price
}

/// Net edge of taking `action` at `market_price` with probability `true_prob`.
///
/// Returns `(qualifies, edge)`; an opportunity qualifies when its edge is
/// strictly greater than `min_edge`.
pub fn evaluate(true_prob: f64, market_price: f64, action: Action, min_edge: f64) -> (bool, f64) {
    let implied = implied_probability(market_price);
    let edge = match action {
        Action::Back => true_prob - implied - EXCHANGE_COMMISSION,
        Action::Lay => implied - true_prob - EXCHANGE_COMMISSION,
    };
    (edge > min_edge, edge)
}

/// Like [`evaluate`] but for a side that arrives as a raw string.
///
/// Unrecognised sides never qualify and carry zero edge.
pub fn evaluate_side(true_prob: f64, market_price: f64, side: &str, min_edge: f64) -> (bool, f64) {
    side.parse::<Action>()
        .map_or((false, 0.0), |action| {
            evaluate(true_prob, market_price, action, min_edge)
        })
}

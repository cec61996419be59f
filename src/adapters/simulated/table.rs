//! Simulated baccarat table with a side-bet market.
//!
//! Each poll deals a fixed number of cards round-robin across ranks,
//! quotes two selections whose prices drift with the composition, and
//! settles bets placed `settle_delay` polls earlier. Outcomes are drawn
//! from an injected random source against the true probability at the
//! time the bet was placed: a back wins when the event happens, a lay
//! when it does not.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::market::{
    Action, BetOutcome, MarketSelection, MarketSnapshot, SelectionStatus, SettlementEvent,
};
use crate::domain::probability::{probability, SideBetEvent};
use crate::domain::shoe::{ShoeState, FULL_SHOE_CARDS, RANKS};
use crate::ports::execution::{OrderGateway, OrderReceipt, OrderRequest};
use crate::ports::market_data::MarketDataSource;

const POCKET_PAIR_ID: &str = "1";
const NATURAL_WIN_ID: &str = "2";

/// Simulator knobs.
#[derive(Debug, Clone)]
pub struct TableSettings {
    /// Cards in the shoe at start and after a reset.
    pub start_cards: u32,
    /// Cards dealt per poll.
    pub decrement: u32,
    /// Reset to a full shoe after this many polls.
    pub reset_after: Option<u64>,
    /// Polls between acceptance and settlement.
    pub settle_delay: u64,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            start_cards: FULL_SHOE_CARDS,
            decrement: 4,
            reset_after: None,
            settle_delay: 2,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingBet {
    selection_id: String,
    action: Action,
    price: f64,
    stake: f64,
    true_prob: f64,
    placed_at_poll: u64,
}

struct TableState<R> {
    counts: [u32; RANKS],
    /// Polls since the last reset; drives dealing offsets and price drift.
    iteration: u64,
    /// Polls since start; never reset, so settlement delays survive a new shoe.
    polls: u64,
    next_bet_id: u64,
    pending: BTreeMap<u64, PendingBet>,
    rng: R,
}

impl<R: RngCore> TableState<R> {
    fn remaining(&self) -> u32 {
        self.counts.iter().sum()
    }

    fn shoe(&self) -> Result<ShoeState> {
        let remaining = self.remaining();
        let pairs = (1u8..=13).zip(self.counts.iter().copied());
        ShoeState::new(FULL_SHOE_CARDS.saturating_sub(remaining), remaining, pairs)
            .context("simulated shoe is inconsistent")
    }

    /// Deal `n` cards starting at the rank picked by the iteration count.
    fn deal(&mut self, n: u32) {
        let mut to_remove = n.min(self.remaining());
        let mut idx = (self.iteration % RANKS as u64) as usize;
        while to_remove > 0 {
            if self.counts[idx] > 0 {
                self.counts[idx] -= 1;
                to_remove -= 1;
            }
            idx = (idx + 1) % RANKS;
        }
    }

    fn quotes(&self) -> Vec<MarketSelection> {
        let phase = self.iteration as f64;
        let aces = f64::from(self.counts[0]);
        let pocket_pressure = ((aces - 28.0) / 32.0).max(0.0);
        let pocket = round3(5.0 + (phase % 3.0) * 0.1 - pocket_pressure * 0.2);

        let eights_nines = f64::from(self.counts[7] + self.counts[8]);
        let natural_pressure = ((eights_nines - 60.0) / 64.0).max(0.0);
        let natural = round3(3.0 + (phase % 5.0) * 0.05 - natural_pressure * 0.1);

        vec![
            quote(POCKET_PAIR_ID, SideBetEvent::PocketPair, pocket, pocket + 0.5),
            quote(NATURAL_WIN_ID, SideBetEvent::NaturalWin, natural, natural + 0.4),
        ]
    }

    fn settle_due(&mut self, settle_delay: u64) -> Vec<SettlementEvent> {
        let due: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, bet)| self.polls - bet.placed_at_poll >= settle_delay)
            .map(|(id, _)| *id)
            .collect();

        let mut events = Vec::with_capacity(due.len());
        for id in due {
            let Some(bet) = self.pending.remove(&id) else {
                continue;
            };
            let win_prob = match bet.action {
                Action::Back => bet.true_prob,
                Action::Lay => 1.0 - bet.true_prob,
            };
            let won = self.rng.r#gen::<f64>() < win_prob;
            let (status, payout) = if won {
                (BetOutcome::Won, round2(winnings(&bet)))
            } else {
                (BetOutcome::Lost, 0.0)
            };
            events.push(SettlementEvent {
                bet_id: Some(id.to_string()),
                selection_id: Some(bet.selection_id),
                status,
                payout,
            });
        }
        events
    }
}

/// Winnings excluding the returned stake. A winning lay collects the
/// backer's stake.
fn winnings(bet: &PendingBet) -> f64 {
    match bet.action {
        Action::Back => bet.stake * (bet.price - 1.0),
        Action::Lay => bet.stake,
    }
}

fn quote(id: &str, event: SideBetEvent, back: f64, lay: f64) -> MarketSelection {
    MarketSelection {
        selection_id: id.to_string(),
        name: event.selection_name().to_string(),
        status: SelectionStatus::InPlay,
        best_back_price: Some(back),
        best_lay_price: Some(lay),
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

fn full_counts(start_cards: u32) -> [u32; RANKS] {
    let per_rank = (4.0 * f64::from(start_cards) / 52.0).round() as u32;
    [per_rank; RANKS]
}

/// Simulated table. `R` is the random source used for settlement draws.
pub struct SimulatedTable<R = ChaCha8Rng> {
    settings: TableSettings,
    state: Mutex<TableState<R>>,
}

impl SimulatedTable<ChaCha8Rng> {
    /// Table with a reproducible random source.
    pub fn seeded(settings: TableSettings, seed: u64) -> Self {
        Self::new(settings, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Table seeded from OS entropy.
    pub fn from_entropy(settings: TableSettings) -> Self {
        Self::new(settings, ChaCha8Rng::from_entropy())
    }
}

impl<R: RngCore + Send + 'static> SimulatedTable<R> {
    pub fn new(settings: TableSettings, rng: R) -> Self {
        let state = TableState {
            counts: full_counts(settings.start_cards),
            iteration: 0,
            polls: 0,
            next_bet_id: 1,
            pending: BTreeMap::new(),
            rng,
        };
        Self {
            settings,
            state: Mutex::new(state),
        }
    }

    /// Bets accepted but not yet settled.
    pub async fn pending_bets(&self) -> usize {
        self.state.lock().await.pending.len()
    }
}

#[async_trait]
impl<R: RngCore + Send + 'static> MarketDataSource for SimulatedTable<R> {
    async fn get_snapshot(&self) -> Result<MarketSnapshot> {
        let mut state = self.state.lock().await;

        match self.settings.reset_after {
            Some(limit) if state.iteration >= limit => {
                state.counts = full_counts(self.settings.start_cards);
                state.iteration = 0;
                info!("Simulated shoe replaced");
            }
            _ => state.deal(self.settings.decrement),
        }

        let shoe = state.shoe()?;
        let selections = state.quotes();
        let settlements = state.settle_due(self.settings.settle_delay);

        state.iteration += 1;
        state.polls += 1;

        debug!(
            remaining = shoe.cards_remaining(),
            settlements = settlements.len(),
            "Simulated snapshot"
        );

        Ok(MarketSnapshot {
            shoe,
            selections,
            settlements,
        })
    }
}

#[async_trait]
impl<R: RngCore + Send + 'static> OrderGateway for SimulatedTable<R> {
    async fn submit(&self, request: &OrderRequest) -> Result<OrderReceipt> {
        let mut state = self.state.lock().await;
        let shoe = state.shoe()?;

        let event = match request.selection_id.as_str() {
            POCKET_PAIR_ID => Some(SideBetEvent::PocketPair),
            NATURAL_WIN_ID => Some(SideBetEvent::NaturalWin),
            other => SideBetEvent::from_selection_name(other),
        };
        // Unknown selections settle at the odds' own implied probability.
        let true_prob = event.map_or(1.0 / request.price, |e| probability(e, &shoe));

        let bet_id = state.next_bet_id;
        state.next_bet_id += 1;
        let placed_at_poll = state.polls;
        state.pending.insert(
            bet_id,
            PendingBet {
                selection_id: request.selection_id.clone(),
                action: request.action,
                price: request.price,
                stake: request.stake,
                true_prob,
                placed_at_poll,
            },
        );

        debug!(bet_id, true_prob, "Simulated bet accepted");
        Ok(OrderReceipt::accepted(bet_id.to_string()))
    }
}

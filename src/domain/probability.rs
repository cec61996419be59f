//! Exact side-bet probabilities from shoe composition.
//!
//! Baccarat deals the first four cards in a fixed order: Player 1,
//! Banker 1, Player 2, Banker 2. Every side bet we price is decided by
//! those four cards alone, so the true probability of an event is the
//! sum, over all 13^4 ordered rank quadruples satisfying the event, of
//! the probability of drawing that quadruple without replacement.
//!
//! Draw weight of `(r1, r2, r3, r4)`:
//!
//! ```text
//!   c(r1)/N * c'(r2)/(N-1) * c''(r3)/(N-2) * c'''(r4)/(N-3)
//! ```
//!
//! where each `c` is the rank count after the preceding draws. No
//! sampling is involved; the only error is floating-point summation.

use serde::{Deserialize, Serialize};

use super::shoe::{ShoeState, card_value};

/// Cards needed to deal both opening hands.
pub const MIN_CARDS: u32 = 4;

/// Side-bet events priced from the opening four cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SideBetEvent {
    /// Player or Banker opening hand is a pair of ranks.
    PocketPair,
    /// Player or Banker opening total is 8 or 9.
    NaturalWin,
    /// Both opening totals are naturals and equal.
    NaturalTie,
    /// The higher opening total is exactly 9.
    HighestHandNine,
    /// The higher opening total is odd.
    HighestHandOdd,
}

/// Exchange selection names and the events they settle on.
static CATALOGUE: [(&str, SideBetEvent); 5] = [
    ("Pocket Pair In Any Hand", SideBetEvent::PocketPair),
    ("Natural Win", SideBetEvent::NaturalWin),
    ("Natural Tie", SideBetEvent::NaturalTie),
    ("Highest Hand Is Nine", SideBetEvent::HighestHandNine),
    ("Highest Hand Odd", SideBetEvent::HighestHandOdd),
];

impl SideBetEvent {
    pub const ALL: [Self; 5] = [
        Self::PocketPair,
        Self::NaturalWin,
        Self::NaturalTie,
        Self::HighestHandNine,
        Self::HighestHandOdd,
    ];

    /// Look up the event behind a market selection name.
    ///
    /// Unknown names return `None`; callers must not invent a fallback
    /// probability for selections we cannot price.
    pub fn from_selection_name(name: &str) -> Option<Self> {
        CATALOGUE
            .iter()
            .find(|(n, _)| *n == name.trim())
            .map(|(_, event)| *event)
    }

    /// Market selection name for this event.
    pub fn selection_name(self) -> &'static str {
        CATALOGUE
            .iter()
            .find(|(_, event)| *event == self)
            .map_or("", |(n, _)| *n)
    }

    /// Event predicate over the dealt ranks `[P1, B1, P2, B2]`.
    pub fn holds(self, [r1, r2, r3, r4]: [u8; 4]) -> bool {
        let player = hand_total(r1, r3);
        let banker = hand_total(r2, r4);
        let natural = |total: u8| total >= 8;

        match self {
            Self::PocketPair => r1 == r3 || r2 == r4,
            Self::NaturalWin => natural(player) || natural(banker),
            Self::NaturalTie => natural(player) && player == banker,
            Self::HighestHandNine => player.max(banker) == 9,
            Self::HighestHandOdd => player.max(banker) % 2 == 1,
        }
    }
}

impl std::fmt::Display for SideBetEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.selection_name())
    }
}

/// Two-card baccarat total (mod 10).
pub const fn hand_total(a: u8, b: u8) -> u8 {
    (card_value(a) + card_value(b)) % 10
}

/// True probability of `event` being decided by the next four cards.
///
/// Returns `0.0` when fewer than four cards remain.
pub fn probability(event: SideBetEvent, shoe: &ShoeState) -> f64 {
    let mut total = 0.0;
    enumerate_opening_deals(shoe, |ranks, weight| {
        if event.holds(ranks) {
            total += weight;
        }
    });
    total
}

/// Probabilities for every catalogued event, from a single enumeration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EventProbabilities {
    pub pocket_pair: f64,
    pub natural_win: f64,
    pub natural_tie: f64,
    pub highest_hand_nine: f64,
    pub highest_hand_odd: f64,
}

impl EventProbabilities {
    /// Enumerate the opening deals once and accumulate all events.
    pub fn from_shoe(shoe: &ShoeState) -> Self {
        let mut out = Self::default();
        enumerate_opening_deals(shoe, |ranks, weight| {
            for event in SideBetEvent::ALL {
                if event.holds(ranks) {
                    *out.slot(event) += weight;
                }
            }
        });
        out
    }

    pub const fn get(&self, event: SideBetEvent) -> f64 {
        match event {
            SideBetEvent::PocketPair => self.pocket_pair,
            SideBetEvent::NaturalWin => self.natural_win,
            SideBetEvent::NaturalTie => self.natural_tie,
            SideBetEvent::HighestHandNine => self.highest_hand_nine,
            SideBetEvent::HighestHandOdd => self.highest_hand_odd,
        }
    }

    /// Probability for a market selection name, if the name is catalogued.
    pub fn for_selection(&self, name: &str) -> Option<f64> {
        SideBetEvent::from_selection_name(name).map(|event| self.get(event))
    }

    fn slot(&mut self, event: SideBetEvent) -> &mut f64 {
        match event {
            SideBetEvent::PocketPair => &mut self.pocket_pair,
            SideBetEvent::NaturalWin => &mut self.natural_win,
            SideBetEvent::NaturalTie => &mut self.natural_tie,
            SideBetEvent::HighestHandNine => &mut self.highest_hand_nine,
            SideBetEvent::HighestHandOdd => &mut self.highest_hand_odd,
        }
    }
}

/// Visit every reachable ordered quadruple with its draw weight.
///
/// Ranks whose count is exhausted at a given stage are skipped, so
/// every visited weight is strictly positive.
fn enumerate_opening_deals(shoe: &ShoeState, mut visit: impl FnMut([u8; 4], f64)) {
    if shoe.cards_remaining() < MIN_CARDS {
        return;
    }

    let mut counts = *shoe.counts();
    let n0 = f64::from(shoe.cards_remaining());

    for r1 in 1..=13u8 {
        let i1 = usize::from(r1 - 1);
        if counts[i1] == 0 {
            continue;
        }
        let p1 = f64::from(counts[i1]) / n0;
        counts[i1] -= 1;

        for r2 in 1..=13u8 {
            let i2 = usize::from(r2 - 1);
            if counts[i2] == 0 {
                continue;
            }
            let p12 = p1 * f64::from(counts[i2]) / (n0 - 1.0);
            counts[i2] -= 1;

            for r3 in 1..=13u8 {
                let i3 = usize::from(r3 - 1);
                if counts[i3] == 0 {
                    continue;
                }
                let p123 = p12 * f64::from(counts[i3]) / (n0 - 2.0);
                counts[i3] -= 1;

                for r4 in 1..=13u8 {
                    let i4 = usize::from(r4 - 1);
                    if counts[i4] == 0 {
                        continue;
                    }
                    let weight = p123 * f64::from(counts[i4]) / (n0 - 3.0);
                    visit([r1, r2, r3, r4], weight);
                }

                counts[i3] += 1;
            }
            counts[i2] += 1;
        }
        counts[i1] += 1;
    }
}

//! Shoe composition.
//!
//! A shoe is modelled only by how many cards of each rank are left.
//! Suits are irrelevant to every side bet we price, so they are dropped.
//! Ranks are 1 (Ace) through 13 (King).

use serde::Serialize;

use super::error::ShoeError;

/// Number of distinct ranks.
pub const RANKS: usize = 13;

/// Cards in a standard 8-deck shoe.
pub const FULL_SHOE_CARDS: u32 = 416;

/// Below this many remaining cards a jump back to a full shoe is a reset.
pub const RESET_THRESHOLD: u32 = 400;

/// Baccarat point value of a rank: Ace = 1, 2..9 face, tens and courts = 0.
pub const fn card_value(rank: u8) -> u8 {
    match rank {
        1..=9 => rank,
        _ => 0,
    }
}

/// Immutable per-poll view of the undealt cards.
///
/// Construction validates that every count belongs to a rank in
/// `1..=13` and that `cards_remaining` equals the sum of the counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoeState {
    cards_dealt: u32,
    cards_remaining: u32,
    /// Index 0 holds rank 1 (Ace).
    counts: [u32; RANKS],
}

impl ShoeState {
    /// Build a shoe from `(rank, count)` pairs. Missing ranks count as zero.
    pub fn new(
        cards_dealt: u32,
        cards_remaining: u32,
        card_counts: impl IntoIterator<Item = (u8, u32)>,
    ) -> Result<Self, ShoeError> {
        let mut counts = [0u32; RANKS];
        let mut seen = [false; RANKS];

        for (rank, count) in card_counts {
            if !(1..=13).contains(&rank) {
                return Err(ShoeError::InvalidRank(rank));
            }
            let idx = usize::from(rank - 1);
            if seen[idx] {
                return Err(ShoeError::DuplicateRank { rank });
            }
            seen[idx] = true;
            counts[idx] = count;
        }

        let counted: u32 = counts.iter().sum();
        if counted != cards_remaining {
            return Err(ShoeError::InconsistentCount {
                declared: cards_remaining,
                counted,
            });
        }

        Ok(Self {
            cards_dealt,
            cards_remaining,
            counts,
        })
    }

    /// A fresh shoe of `decks` standard decks (4 of each rank per deck).
    pub fn full(decks: u32) -> Self {
        let per_rank = 4 * decks;
        Self {
            cards_dealt: 0,
            cards_remaining: per_rank * RANKS as u32,
            counts: [per_rank; RANKS],
        }
    }

    pub const fn cards_dealt(&self) -> u32 {
        self.cards_dealt
    }

    pub const fn cards_remaining(&self) -> u32 {
        self.cards_remaining
    }

    /// Remaining count for `rank`; zero for ranks outside `1..=13`.
    pub fn count(&self, rank: u8) -> u32 {
        match rank {
            1..=13 => self.counts[usize::from(rank - 1)],
            _ => 0,
        }
    }

    /// Counts indexed by `rank - 1`.
    pub const fn counts(&self) -> &[u32; RANKS] {
        &self.counts
    }
}

/// True when the remaining count jumps from a depleted shoe back to full.
pub const fn is_shoe_reset(prev_remaining: u32, curr_remaining: u32) -> bool {
    prev_remaining < RESET_THRESHOLD && curr_remaining >= FULL_SHOE_CARDS
}

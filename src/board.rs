//! Board state: tableau columns, per-suit foundations, the Baker's Dozen deal,
//! and the canonical state key used for deduplication.

use std::fmt;
use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::card::{Card, Rank, SUITS};
use crate::constants::{CARDS_PER_COLUMN, STANDARD_COLUMNS, SUIT_COUNT};
use crate::error::Result;

const FNV_OFFSET: u64 = 1469598103934665603;
const FNV_PRIME: u64 = 1099511628211;

/// A tableau pile. `cards` is bottom->top.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Column {
    cards: Vec<Card>,
}

impl Column {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    #[inline]
    pub fn top(&self) -> Option<Card> {
        self.cards.last().copied()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Descending-by-one stacking, suit ignored. Empty columns take anything.
    pub fn accepts(&self, card: Card) -> bool {
        match self.top() {
            Some(top) => card.rank.value() + 1 == top.rank.value(),
            None => true,
        }
    }
}

/// A foundation pile built ace->top rank in one suit. The suit is fixed by
/// whichever ace lands first.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Foundation {
    cards: Vec<Card>,
}

impl Foundation {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    #[inline]
    pub fn top(&self) -> Option<Card> {
        self.cards.last().copied()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn accepts(&self, card: Card) -> bool {
        match self.top() {
            Some(top) => card.suit == top.suit && card.rank.value() == top.rank.value() + 1,
            None => card.is_ace(),
        }
    }

    pub fn is_full(&self, top_rank: Rank) -> bool {
        self.top().is_some_and(|c| c.rank == top_rank)
    }
}

/// Canonical 64-bit digest of a board, identical for boards that differ only
/// by the order of their columns or of their foundations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateKey(pub u64);

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Shape of a deck: four suits of `1..=top_rank`, dealt into `columns` piles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckShape {
    pub top_rank: Rank,
    pub columns: usize,
}

impl DeckShape {
    pub const STANDARD: DeckShape = DeckShape {
        top_rank: Rank::KING,
        columns: STANDARD_COLUMNS,
    };

    pub fn reduced(top_rank: Rank, columns: usize) -> Self {
        Self { top_rank, columns }
    }

    pub fn deck_size(&self) -> usize {
        SUIT_COUNT * self.top_rank.value() as usize
    }

    /// Suit-major ordered deck, aces first.
    pub fn ordered_deck(&self) -> Vec<Card> {
        let mut deck = Vec::with_capacity(self.deck_size());
        for suit in SUITS {
            for v in 1..=self.top_rank.value() {
                if let Some(rank) = Rank::new(v) {
                    deck.push(Card::new(rank, suit));
                }
            }
        }
        deck
    }
}

impl Default for DeckShape {
    fn default() -> Self {
        Self::STANDARD
    }
}

#[derive(Debug, Clone)]
pub struct Board {
    columns: Vec<Column>,
    foundations: Vec<Foundation>,
    top_rank: Rank,
}

impl Board {
    pub fn new(columns: Vec<Column>, foundations: Vec<Foundation>, top_rank: Rank) -> Self {
        Self {
            columns,
            foundations,
            top_rank,
        }
    }

    /// Builds a board from whitespace-separated card notation, one string per
    /// pile, bottom card first.
    pub fn from_notation(columns: &[&str], foundations: &[&str], top_rank: Rank) -> Result<Self> {
        fn parse_pile(s: &str) -> Result<Vec<Card>> {
            s.split_whitespace().map(str::parse).collect()
        }
        let columns = columns
            .iter()
            .map(|s| parse_pile(s).map(Column::new))
            .collect::<Result<Vec<_>>>()?;
        let foundations = foundations
            .iter()
            .map(|s| parse_pile(s).map(Foundation::new))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(columns, foundations, top_rank))
    }

    /// Deals a Baker's Dozen layout: shuffle, deal piles of four, then sink
    /// every top-rank card to the bottom of its pile.
    pub fn deal(seed: u64, shape: DeckShape) -> Self {
        let mut deck = shape.ordered_deck();
        let mut rng = StdRng::seed_from_u64(seed);
        deck.shuffle(&mut rng);

        let per_column = CARDS_PER_COLUMN.max(deck.len().div_ceil(shape.columns.max(1)));
        let mut columns: Vec<Column> = deck
            .chunks(per_column)
            .map(|chunk| {
                let mut cards = chunk.to_vec();
                // Stable: relative order of the other cards is kept.
                cards.sort_by_key(|c| c.rank != shape.top_rank);
                Column::new(cards)
            })
            .collect();
        columns.resize_with(shape.columns.max(columns.len()), Column::default);

        Self {
            columns,
            foundations: vec![Foundation::default(); SUIT_COUNT],
            top_rank: shape.top_rank,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn foundations(&self) -> &[Foundation] {
        &self.foundations
    }

    pub fn column(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    pub fn foundation(&self, index: usize) -> &Foundation {
        &self.foundations[index]
    }

    pub fn top_rank(&self) -> Rank {
        self.top_rank
    }

    pub fn card_count(&self) -> usize {
        self.columns.iter().map(Column::len).sum::<usize>()
            + self.foundations.iter().map(Foundation::len).sum::<usize>()
    }

    pub fn cards_outside_foundations(&self) -> usize {
        self.columns.iter().map(Column::len).sum()
    }

    pub fn min_foundation_len(&self) -> usize {
        self.foundations.iter().map(Foundation::len).min().unwrap_or(0)
    }

    /// True if some foundation would take `card` right now.
    pub fn is_playable(&self, card: Card) -> bool {
        self.foundations.iter().any(|f| f.accepts(card))
    }

    pub fn is_game_won(&self) -> bool {
        self.foundations.iter().all(|f| f.is_full(self.top_rank))
    }

    /// # Panics
    /// If either index is out of range.
    pub fn is_valid_column_to_column(&self, from: usize, to: usize) -> bool {
        if from == to {
            return false;
        }
        let target = &self.columns[to];
        self.columns[from]
            .top()
            .is_some_and(|card| target.accepts(card))
    }

    /// # Panics
    /// If either index is out of range.
    pub fn is_valid_column_to_foundation(&self, column: usize, foundation: usize) -> bool {
        let target = &self.foundations[foundation];
        self.columns[column]
            .top()
            .is_some_and(|card| target.accepts(card))
    }

    /// Returns the board after moving the top of `from` onto `to`, or `None`
    /// if that move is not legal. `self` is never modified.
    pub fn apply_column_to_column(&self, from: usize, to: usize) -> Option<Board> {
        if !self.is_valid_column_to_column(from, to) {
            return None;
        }
        let mut next = self.clone();
        let card = next.columns[from].cards.pop()?;
        next.columns[to].cards.push(card);
        Some(next)
    }

    pub fn apply_column_to_foundation(&self, column: usize, foundation: usize) -> Option<Board> {
        if !self.is_valid_column_to_foundation(column, foundation) {
            return None;
        }
        let mut next = self.clone();
        let card = next.columns[column].cards.pop()?;
        next.foundations[foundation].cards.push(card);
        Some(next)
    }

    pub fn key(&self) -> StateKey {
        let mut h = FNV_OFFSET;
        let mut mix = |x: u64| {
            h ^= x;
            h = h.wrapping_mul(FNV_PRIME);
        };

        let mut cols: Vec<u64> = self.columns.iter().map(|c| pile_digest(&c.cards)).collect();
        cols.sort_unstable();
        let mut founds: Vec<u64> = self
            .foundations
            .iter()
            .map(|f| pile_digest(&f.cards))
            .collect();
        founds.sort_unstable();

        mix(0xC0);
        mix(cols.len() as u64);
        for d in cols {
            mix(d);
        }
        mix(0xF0);
        mix(founds.len() as u64);
        for d in founds {
            mix(d);
        }
        StateKey(h)
    }

    fn canonical_columns(&self) -> Vec<&[Card]> {
        let mut v: Vec<&[Card]> = self.columns.iter().map(Column::cards).collect();
        v.sort_unstable();
        v
    }

    fn canonical_foundations(&self) -> Vec<&[Card]> {
        let mut v: Vec<&[Card]> = self.foundations.iter().map(Foundation::cards).collect();
        v.sort_unstable();
        v
    }
}

fn pile_digest(cards: &[Card]) -> u64 {
    let mut h = FNV_OFFSET;
    h ^= cards.len() as u64;
    h = h.wrapping_mul(FNV_PRIME);
    for c in cards {
        h ^= c.index() as u64 + 0x9e37_79b9;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.top_rank == other.top_rank
            && self.canonical_columns() == other.canonical_columns()
            && self.canonical_foundations() == other.canonical_foundations()
    }
}

impl Eq for Board {}

impl Hash for Board {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.key().0);
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, col) in self.columns.iter().enumerate() {
            write!(f, "C{:02}:", i + 1)?;
            for card in col.cards() {
                write!(f, " {card}")?;
            }
            writeln!(f)?;
        }
        for (i, found) in self.foundations.iter().enumerate() {
            write!(f, "F{}:", i + 1)?;
            match found.top() {
                Some(top) => writeln!(f, " {} ({} cards)", top, found.len())?,
                None => writeln!(f, " --")?,
            }
        }
        Ok(())
    }
}

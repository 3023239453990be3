//! Card value types: rank, suit and the card pair itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::RANKS_PER_SUIT;
use crate::error::SolverError;

pub const SUITS: [Suit; 4] = [Suit::Clubs, Suit::Spades, Suit::Hearts, Suit::Diamonds];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    Clubs,
    Spades,
    Hearts,
    Diamonds,
}

impl Suit {
    pub const fn row(self) -> u8 {
        match self {
            Suit::Clubs => 0,
            Suit::Spades => 1,
            Suit::Hearts => 2,
            Suit::Diamonds => 3,
        }
    }

    pub const fn symbol(self) -> char {
        match self {
            Suit::Clubs => 'C',
            Suit::Spades => 'S',
            Suit::Hearts => 'H',
            Suit::Diamonds => 'D',
        }
    }

    fn from_symbol(c: char) -> Option<Suit> {
        SUITS.into_iter().find(|s| s.symbol() == c)
    }
}

/// Card rank in `1..=13`. Reduced test decks simply stop at a lower rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rank(u8);

impl Rank {
    pub const ACE: Rank = Rank(1);
    pub const JACK: Rank = Rank(11);
    pub const QUEEN: Rank = Rank(12);
    pub const KING: Rank = Rank(13);

    pub const fn new(value: u8) -> Option<Rank> {
        if value >= 1 && value <= RANKS_PER_SUIT {
            Some(Rank(value))
        } else {
            None
        }
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub fn predecessor(self) -> Option<Rank> {
        Rank::new(self.0 - 1)
    }

    pub fn successor(self) -> Option<Rank> {
        Rank::new(self.0 + 1)
    }

    const fn symbol(self) -> char {
        const R: [char; 13] = [
            'A', '2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K',
        ];
        R[(self.0 - 1) as usize]
    }

    fn from_symbol(c: char) -> Option<Rank> {
        let v = match c {
            'A' => 1,
            '2'..='9' => c as u8 - b'0',
            'T' => 10,
            'J' => 11,
            'Q' => 12,
            'K' => 13,
            _ => return None,
        };
        Rank::new(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    /// Dense index in `0..52`, suit-major. Used for hashing.
    pub const fn index(self) -> u8 {
        self.suit.row() * RANKS_PER_SUIT + (self.rank.value() - 1)
    }

    pub fn predecessor(self) -> Option<Card> {
        self.rank.predecessor().map(|r| Card::new(r, self.suit))
    }

    pub fn successor(self) -> Option<Card> {
        self.rank.successor().map(|r| Card::new(r, self.suit))
    }

    pub fn is_ace(self) -> bool {
        self.rank == Rank::ACE
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.symbol(), self.suit.symbol())
    }
}

impl FromStr for Card {
    type Err = SolverError;

    /// Parses two-character notation such as `AS`, `TD` or `kh`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim().to_ascii_uppercase();
        let mut chars = t.chars();
        let (Some(r), Some(su), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(SolverError::CardParse(s.to_string()));
        };
        match (Rank::from_symbol(r), Suit::from_symbol(su)) {
            (Some(rank), Some(suit)) => Ok(Card::new(rank, suit)),
            _ => Err(SolverError::CardParse(s.to_string())),
        }
    }
}

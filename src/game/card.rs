use serde::{Deserialize, Serialize};
use std::fmt;

/// Suit tiebreaker, lowest first. Spades is the weakest suit, hearts the
/// strongest, so the 3 of spades is the lowest card in the whole deck.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    Spades,
    Clubs,
    Diamonds,
    Hearts,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Clubs, Suit::Diamonds, Suit::Hearts];

    pub fn order(&self) -> u8 {
        match self {
            Suit::Spades => 0,
            Suit::Clubs => 1,
            Suit::Diamonds => 2,
            Suit::Hearts => 3,
        }
    }

    fn from_char(ch: char) -> Option<Self> {
        match ch {
            'S' => Some(Suit::Spades),
            'C' => Some(Suit::Clubs),
            'D' => Some(Suit::Diamonds),
            'H' => Some(Suit::Hearts),
            _ => None,
        }
    }

    fn to_char(&self) -> char {
        match self {
            Suit::Spades => 'S',
            Suit::Clubs => 'C',
            Suit::Diamonds => 'D',
            Suit::Hearts => 'H',
        }
    }
}

/// Ranks in climbing order. Twos sit on top of everything and carry the
/// special chop rules; they can never appear in a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
    Ten = 10,
    Jack = 11,
    Queen = 12,
    King = 13,
    Ace = 14,
    Two = 15,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
        Rank::Two,
    ];

    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// The top rank, beatable only through a chop once it leads a pile.
    pub fn is_top(&self) -> bool {
        matches!(self, Rank::Two)
    }

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "3" => Some(Rank::Three),
            "4" => Some(Rank::Four),
            "5" => Some(Rank::Five),
            "6" => Some(Rank::Six),
            "7" => Some(Rank::Seven),
            "8" => Some(Rank::Eight),
            "9" => Some(Rank::Nine),
            "10" => Some(Rank::Ten),
            "J" => Some(Rank::Jack),
            "Q" => Some(Rank::Queen),
            "K" => Some(Rank::King),
            "A" => Some(Rank::Ace),
            "2" => Some(Rank::Two),
            _ => None,
        }
    }

    fn to_str(&self) -> &'static str {
        match self {
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
            Rank::Two => "2",
        }
    }
}

/// One physical card. The derived ordering (rank, then suit) is exactly the
/// score ordering, so two distinct cards never compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    /// Total-order score: rank dominates, suit breaks ties.
    pub fn score(&self) -> u8 {
        self.rank.value() * 10 + self.suit.order()
    }

    /// Canonical deck index, stable for the life of a deal.
    pub fn id(&self) -> u8 {
        (self.rank.value() - 3) * 4 + self.suit.order()
    }

    /// Wire form, e.g. `S3`, `H10`, `C2`.
    pub fn code(&self) -> String {
        format!("{}{}", self.suit.to_char(), self.rank.to_str())
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let mut chars = code.chars();
        let suit = Suit::from_char(chars.next()?)?;
        let rank = Rank::from_str(chars.as_str())?;
        Some(Card { rank, suit })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

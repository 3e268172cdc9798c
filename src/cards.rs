use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// Number of cards in a standard deck
pub const DECK_SIZE: usize = 52;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    #[serde(rename = "♠")]
    Spades,
    #[serde(rename = "♥")]
    Hearts,
    #[serde(rename = "♦")]
    Diamonds,
    #[serde(rename = "♣")]
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub fn symbol(&self) -> &'static str {
        match self {
            Suit::Spades => "♠",
            Suit::Hearts => "♥",
            Suit::Diamonds => "♦",
            Suit::Clubs => "♣",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "A")]
    Ace,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
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
    ];

    /// Pip count, ace low (A=1 .. K=13)
    pub fn pips(&self) -> u8 {
        match self {
            Rank::Ace => 1,
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten => 10,
            Rank::Jack => 11,
            Rank::Queen => 12,
            Rank::King => 13,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rank::Ace => "A",
            Rank::Two => "2",
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
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    #[serde(rename = "value")]
    pub rank: Rank,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Card { suit, rank }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.label(), self.suit.symbol())
    }
}

/// The 52 cards in suit-major order
pub fn ordered_deck() -> Vec<Card> {
    let mut cards = Vec::with_capacity(DECK_SIZE);
    for suit in Suit::ALL {
        for rank in Rank::ALL {
            cards.push(Card::new(rank, suit));
        }
    }
    cards
}

/// A freshly built and uniformly shuffled deck (Fisher-Yates).
///
/// Deal from the back with [`Vec::pop`].
pub fn new_shuffled_deck<R: Rng + ?Sized>(rng: &mut R) -> Vec<Card> {
    let mut cards = ordered_deck();
    cards.shuffle(rng);
    cards
}

/// Blackjack value of a single card: ace 11, faces 10, otherwise the pip count
pub fn card_value(card: &Card) -> u32 {
    match card.rank {
        Rank::Ace => 11,
        Rank::Jack | Rank::Queen | Rank::King => 10,
        rank => rank.pips() as u32,
    }
}

/// Blackjack hand total with soft-ace reduction
pub fn hand_value(hand: &[Card]) -> u32 {
    let mut total: u32 = hand.iter().map(card_value).sum();
    let mut soft_aces = hand.iter().filter(|card| card.rank == Rank::Ace).count();

    while total > 21 && soft_aces > 0 {
        total -= 10;
        soft_aces -= 1;
    }

    total
}

/// Baccarat point of a single card: ace 1, ten and faces 0
pub fn baccarat_card_value(card: &Card) -> u32 {
    match card.rank {
        Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 0,
        rank => rank.pips() as u32,
    }
}

/// Baccarat hand total modulo 10
pub fn baccarat_value(hand: &[Card]) -> u32 {
    hand.iter().map(baccarat_card_value).sum::<u32>() % 10
}

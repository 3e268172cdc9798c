use super::Game;
use super::Label;
use super::Outcome;
use super::RoundDetails;
use crate::amount::Amount;
use crate::amount::Multiplier;
use crate::cards::new_shuffled_deck;
use crate::cards::Card;
use crate::cards::Rank;
use crate::cards::Suit;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

const HOLE_CARDS: usize = 2;
const COMMUNITY_CARDS: usize = 5;

/// Hand classes in ascending strength. Straights are not ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HandRank {
    #[serde(rename = "High Card")]
    HighCard,
    #[serde(rename = "Pair")]
    Pair,
    #[serde(rename = "Two Pair")]
    TwoPair,
    #[serde(rename = "Three of a Kind")]
    ThreeOfAKind,
    #[serde(rename = "Flush")]
    Flush,
    #[serde(rename = "Full House")]
    FullHouse,
    #[serde(rename = "Four of a Kind")]
    FourOfAKind,
}

impl HandRank {
    pub fn multiplier(&self) -> Multiplier {
        match self {
            HandRank::FourOfAKind => Multiplier::X10,
            HandRank::FullHouse => Multiplier::X8,
            HandRank::Flush => Multiplier::X6,
            HandRank::ThreeOfAKind => Multiplier::X4,
            HandRank::TwoPair => Multiplier::X2_5,
            HandRank::Pair => Multiplier::X1_5,
            HandRank::HighCard => Multiplier::LOSS,
        }
    }
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandRank::HighCard => "High Card",
            HandRank::Pair => "Pair",
            HandRank::TwoPair => "Two Pair",
            HandRank::ThreeOfAKind => "Three of a Kind",
            HandRank::Flush => "Flush",
            HandRank::FullHouse => "Full House",
            HandRank::FourOfAKind => "Four of a Kind",
        };
        write!(f, "{name}")
    }
}

/// Classify the best hand in `cards` from rank and suit counts
pub fn classify(cards: &[Card]) -> HandRank {
    let mut ranks: HashMap<Rank, usize> = HashMap::new();
    let mut suits: HashMap<Suit, usize> = HashMap::new();
    for card in cards {
        *ranks.entry(card.rank).or_default() += 1;
        *suits.entry(card.suit).or_default() += 1;
    }

    let mut counts: Vec<usize> = ranks.into_values().collect();
    counts.sort_unstable_by(|a, b| b.cmp(a));
    let first = counts.first().copied().unwrap_or(0);
    let second = counts.get(1).copied().unwrap_or(0);
    let is_flush = suits.values().any(|count| *count >= 5);

    if first >= 4 {
        HandRank::FourOfAKind
    } else if first == 3 && second >= 2 {
        HandRank::FullHouse
    } else if is_flush {
        HandRank::Flush
    } else if first == 3 {
        HandRank::ThreeOfAKind
    } else if first == 2 && second == 2 {
        HandRank::TwoPair
    } else if first == 2 {
        HandRank::Pair
    } else {
        HandRank::HighCard
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PokerDeal {
    pub player_hand: Vec<Card>,
    pub community_cards: Vec<Card>,
    pub hand_rank: HandRank,
}

/// Two hole cards plus five community cards against a fixed paytable
pub struct Poker;

impl Poker {
    /// Deal hole and community cards off the back of `deck`.
    ///
    /// Returns `None` when fewer than seven cards remain.
    pub fn deal(deck: &mut Vec<Card>) -> Option<(Vec<Card>, Vec<Card>)> {
        if deck.len() < HOLE_CARDS + COMMUNITY_CARDS {
            return None;
        }
        let hole = deck.split_off(deck.len() - HOLE_CARDS);
        let community = deck.split_off(deck.len() - COMMUNITY_CARDS);
        Some((hole, community))
    }

    pub fn settle(stake: Amount, player_hand: Vec<Card>, community_cards: Vec<Card>) -> Outcome {
        let all: Vec<Card> = player_hand.iter().chain(&community_cards).copied().collect();
        let hand_rank = classify(&all);
        let multiplier = hand_rank.multiplier();
        let label = if multiplier == Multiplier::LOSS {
            Label::Loss
        } else {
            Label::Win
        };

        Outcome::new(
            stake,
            multiplier,
            label,
            RoundDetails::Poker(PokerDeal {
                player_hand,
                community_cards,
                hand_rank,
            }),
        )
    }
}

impl Game for Poker {
    type Bet = ();

    fn play<R: Rng + ?Sized>(&self, stake: Amount, _bet: &(), rng: &mut R) -> Outcome {
        let mut deck = new_shuffled_deck(rng);
        match Self::deal(&mut deck) {
            Some((hole, community)) => Self::settle(stake, hole, community),
            None => unreachable!("a fresh deck holds 52 cards"),
        }
    }

    fn name(&self) -> &'static str {
        "Poker"
    }

    fn description(&self) -> &'static str {
        "Two hole cards and five community cards. Four of a kind pays 10x, full house 8x, \
         flush 6x, three of a kind 4x, two pair 2.5x and a pair 1.5x."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Rank::*;
    use Suit::*;

    fn c(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    #[test]
    fn test_classification_ladder() {
        let four = [
            c(Nine, Spades),
            c(Nine, Hearts),
            c(Nine, Clubs),
            c(Nine, Diamonds),
            c(Two, Spades),
            c(Five, Hearts),
            c(King, Clubs),
        ];
        assert_eq!(classify(&four), HandRank::FourOfAKind);

        let full = [
            c(Nine, Spades),
            c(Nine, Hearts),
            c(Nine, Clubs),
            c(Two, Diamonds),
            c(Two, Spades),
            c(Five, Hearts),
            c(King, Clubs),
        ];
        assert_eq!(classify(&full), HandRank::FullHouse);

        let two_trips = [
            c(Nine, Spades),
            c(Nine, Hearts),
            c(Nine, Clubs),
            c(Two, Diamonds),
            c(Two, Spades),
            c(Two, Hearts),
            c(King, Clubs),
        ];
        assert_eq!(classify(&two_trips), HandRank::FullHouse);

        let flush = [
            c(Ace, Hearts),
            c(Three, Hearts),
            c(Seven, Hearts),
            c(Nine, Hearts),
            c(Jack, Hearts),
            c(Jack, Spades),
            c(Four, Clubs),
        ];
        assert_eq!(classify(&flush), HandRank::Flush);

        let trips = [
            c(Four, Hearts),
            c(Four, Spades),
            c(Four, Clubs),
            c(Nine, Hearts),
            c(Jack, Hearts),
            c(Queen, Spades),
            c(Two, Clubs),
        ];
        assert_eq!(classify(&trips), HandRank::ThreeOfAKind);

        let two_pair = [
            c(Four, Hearts),
            c(Four, Spades),
            c(Nine, Clubs),
            c(Nine, Hearts),
            c(Jack, Hearts),
            c(Queen, Spades),
            c(Two, Clubs),
        ];
        assert_eq!(classify(&two_pair), HandRank::TwoPair);

        let pair = [
            c(Four, Hearts),
            c(Four, Spades),
            c(Eight, Clubs),
            c(Nine, Hearts),
            c(Jack, Hearts),
            c(Queen, Spades),
            c(Two, Clubs),
        ];
        assert_eq!(classify(&pair), HandRank::Pair);

        let high = [
            c(Four, Hearts),
            c(Six, Spades),
            c(Eight, Clubs),
            c(Nine, Hearts),
            c(Jack, Hearts),
            c(Queen, Spades),
            c(Two, Clubs),
        ];
        assert_eq!(classify(&high), HandRank::HighCard);
    }

    #[test]
    fn test_full_house_outranks_flush() {
        let overlap = [
            c(Ace, Hearts),
            c(Ace, Spades),
            c(Ace, Clubs),
            c(Nine, Hearts),
            c(Nine, Spades),
            c(Two, Hearts),
            c(Four, Hearts),
            c(Six, Hearts),
        ];
        assert_eq!(classify(&overlap), HandRank::FullHouse);
    }

    #[test]
    fn test_settle_pays_table() {
        let stake = Amount::from_whole(10);
        let outcome = Poker::settle(
            stake,
            vec![c(Four, Hearts), c(Four, Spades)],
            vec![c(Nine, Clubs), c(Nine, Hearts), c(Jack, Hearts), c(Queen, Spades), c(Two, Clubs)],
        );
        assert_eq!(outcome.payout, Amount::from_whole(25));
        assert_eq!(outcome.label, Label::Win);

        let outcome = Poker::settle(
            stake,
            vec![c(Four, Hearts), c(Six, Spades)],
            vec![c(Eight, Clubs), c(Nine, Hearts), c(Jack, Hearts), c(Queen, Spades), c(Two, Clubs)],
        );
        assert_eq!(outcome.payout, Amount::ZERO);
        assert_eq!(outcome.label, Label::Loss);
    }

    #[test]
    fn test_deal_uses_distinct_cards() {
        let mut rng = crate::rng::seeded(21);
        let mut deck = new_shuffled_deck(&mut rng);
        let (hole, community) = Poker::deal(&mut deck).unwrap();
        assert_eq!(hole.len(), 2);
        assert_eq!(community.len(), 5);
        assert_eq!(deck.len(), 45);
        for card in hole.iter().chain(&community) {
            assert!(!deck.contains(card));
        }

        let mut short = vec![c(Two, Clubs); 6];
        assert!(Poker::deal(&mut short).is_none());
    }

    #[test]
    fn test_hand_rank_names() {
        assert_eq!(HandRank::ThreeOfAKind.to_string(), "Three of a Kind");
        assert_eq!(
            serde_json::to_value(HandRank::TwoPair).unwrap(),
            serde_json::json!("Two Pair")
        );
    }
}

//! Punto banco with a simplified drawing rule.
//!
//! A side draws a third card when its two-card total is 5 or less. Both decisions use
//! the two-card totals, so the banker never reacts to the player's third card.

use super::Game;
use super::Label;
use super::Outcome;
use super::RoundDetails;
use crate::amount::Amount;
use crate::amount::Multiplier;
use crate::cards::baccarat_value;
use crate::cards::new_shuffled_deck;
use crate::cards::Card;
use crate::errors::RoundError;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use std::str::FromStr;

/// Highest two-card total that still draws
const DRAW_LIMIT: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaccaratSide {
    Player,
    Banker,
    Tie,
}

impl BaccaratSide {
    /// Multiplier for a bet on `self` when `winner` takes the coup
    pub fn multiplier_against(&self, winner: BaccaratSide) -> Multiplier {
        match (self, winner) {
            (BaccaratSide::Player, BaccaratSide::Player) => Multiplier::X2,
            (BaccaratSide::Banker, BaccaratSide::Banker) => Multiplier::X1_95,
            (BaccaratSide::Tie, BaccaratSide::Tie) => Multiplier::X9,
            // player and banker bets are returned on a tie
            (_, BaccaratSide::Tie) => Multiplier::PUSH,
            _ => Multiplier::LOSS,
        }
    }
}

impl FromStr for BaccaratSide {
    type Err = RoundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player" => Ok(BaccaratSide::Player),
            "banker" => Ok(BaccaratSide::Banker),
            "tie" => Ok(BaccaratSide::Tie),
            other => Err(RoundError::validation(format!("unknown baccarat side: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaccaratCoup {
    pub player_hand: Vec<Card>,
    pub banker_hand: Vec<Card>,
    pub player_value: u32,
    pub banker_value: u32,
    pub winner: BaccaratSide,
    pub side: BaccaratSide,
}

pub struct Baccarat;

impl Baccarat {
    /// Deal a coup off the back of `deck`, player first, alternating.
    ///
    /// Returns `None` when the deck runs out.
    pub fn deal(deck: &mut Vec<Card>) -> Option<(Vec<Card>, Vec<Card>)> {
        let mut player = Vec::with_capacity(3);
        let mut banker = Vec::with_capacity(3);
        player.push(deck.pop()?);
        banker.push(deck.pop()?);
        player.push(deck.pop()?);
        banker.push(deck.pop()?);

        let player_draws = baccarat_value(&player) <= DRAW_LIMIT;
        let banker_draws = baccarat_value(&banker) <= DRAW_LIMIT;

        if player_draws {
            player.push(deck.pop()?);
        }
        if banker_draws {
            banker.push(deck.pop()?);
        }

        Some((player, banker))
    }

    pub fn winner(player_value: u32, banker_value: u32) -> BaccaratSide {
        match player_value.cmp(&banker_value) {
            std::cmp::Ordering::Greater => BaccaratSide::Player,
            std::cmp::Ordering::Less => BaccaratSide::Banker,
            std::cmp::Ordering::Equal => BaccaratSide::Tie,
        }
    }

    pub fn settle(
        stake: Amount,
        side: BaccaratSide,
        player_hand: Vec<Card>,
        banker_hand: Vec<Card>,
    ) -> Outcome {
        let player_value = baccarat_value(&player_hand);
        let banker_value = baccarat_value(&banker_hand);
        let winner = Self::winner(player_value, banker_value);
        let multiplier = side.multiplier_against(winner);
        let label = if multiplier == Multiplier::PUSH {
            Label::Push
        } else if multiplier == Multiplier::LOSS {
            Label::Loss
        } else {
            Label::Win
        };

        Outcome::new(
            stake,
            multiplier,
            label,
            RoundDetails::Baccarat(BaccaratCoup {
                player_hand,
                banker_hand,
                player_value,
                banker_value,
                winner,
                side,
            }),
        )
    }
}

impl Game for Baccarat {
    type Bet = BaccaratSide;

    fn play<R: Rng + ?Sized>(&self, stake: Amount, side: &BaccaratSide, rng: &mut R) -> Outcome {
        let mut deck = new_shuffled_deck(rng);
        match Self::deal(&mut deck) {
            Some((player, banker)) => Self::settle(stake, *side, player, banker),
            None => unreachable!("a fresh deck holds 52 cards"),
        }
    }

    fn name(&self) -> &'static str {
        "Baccarat"
    }

    fn description(&self) -> &'static str {
        "Bet on player (2x), banker (1.95x) or tie (9x). Player and banker bets push on a tie."
    }
}

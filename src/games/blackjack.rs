//! Blackjack round state machine.
//!
//! `start` deals and either settles a natural immediately or hands back a
//! [`RoundState`] in the player's turn. `hit` and `stand` advance that state until the
//! round resolves. The state lives with the caller between requests (see
//! [`crate::round_token`]), so every transition re-validates its shape first.

use super::Label;
use super::Outcome;
use super::RoundDetails;
use crate::amount::Amount;
use crate::amount::Multiplier;
use crate::cards::card_value;
use crate::cards::hand_value;
use crate::cards::Card;
use crate::cards::DECK_SIZE;
use crate::errors::RoundError;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashSet;

const BLACKJACK: u32 = 21;
const DEALER_STANDS_ON: u32 = 17;

/// A round in the player's turn
#[derive(Debug, Clone, PartialEq)]
pub struct RoundState {
    pub round_id: String,
    pub stake: Amount,
    /// Undealt cards, dealt from the back
    pub deck: Vec<Card>,
    pub player_hand: Vec<Card>,
    pub dealer_hand: Vec<Card>,
}

impl RoundState {
    pub fn player_value(&self) -> u32 {
        hand_value(&self.player_hand)
    }

    /// Reject states that could not have come out of `start`/`hit`
    pub fn validate(&self) -> Result<(), RoundError> {
        if self.player_hand.len() < 2 {
            return Err(RoundError::integrity("player hand has fewer than two cards"));
        }
        if self.dealer_hand.len() != 2 {
            return Err(RoundError::integrity("dealer hand must hold exactly two cards"));
        }
        if self.deck.is_empty() {
            return Err(RoundError::integrity("deck is exhausted"));
        }
        if !self.stake.is_positive() {
            return Err(RoundError::integrity("stake must be positive"));
        }
        if self.player_value() > BLACKJACK {
            return Err(RoundError::integrity("player hand is already bust"));
        }

        let total = self.deck.len() + self.player_hand.len() + self.dealer_hand.len();
        let unique: HashSet<&Card> = self
            .deck
            .iter()
            .chain(&self.player_hand)
            .chain(&self.dealer_hand)
            .collect();
        if total != DECK_SIZE || unique.len() != DECK_SIZE {
            return Err(RoundError::integrity("cards do not form a single deck"));
        }

        Ok(())
    }

    /// What the player may see: their hand and the dealer's first card only
    pub fn view(&self) -> TableView {
        let up_card: Vec<Card> = self.dealer_hand.first().copied().into_iter().collect();
        TableView {
            player_hand: self.player_hand.clone(),
            player_value: self.player_value(),
            dealer_value: up_card.iter().map(card_value).sum(),
            dealer_hand: up_card,
        }
    }

    fn draw(&mut self) -> Result<Card, RoundError> {
        self.deck
            .pop()
            .ok_or_else(|| RoundError::integrity("deck is exhausted"))
    }

    fn resolve(self, multiplier: Multiplier, label: Label) -> Outcome {
        let table = BlackjackTable {
            player_value: hand_value(&self.player_hand),
            dealer_value: hand_value(&self.dealer_hand),
            player_hand: self.player_hand,
            dealer_hand: self.dealer_hand,
        };
        Outcome::new(self.stake, multiplier, label, RoundDetails::Blackjack(table))
    }
}

/// Visible part of an in-progress round
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub player_hand: Vec<Card>,
    pub player_value: u32,
    pub dealer_hand: Vec<Card>,
    pub dealer_value: u32,
}

/// Final table of a resolved round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlackjackTable {
    pub player_hand: Vec<Card>,
    pub dealer_hand: Vec<Card>,
    pub player_value: u32,
    pub dealer_value: u32,
}

/// Result of a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Waiting for the player to hit or stand
    PlayerTurn(RoundState),
    /// Terminal; the outcome is ready to settle
    Resolved(Outcome),
}

/// Deal two cards each from a fresh `deck` and check for a natural.
pub fn start(round_id: String, stake: Amount, deck: Vec<Card>) -> Result<Step, RoundError> {
    if deck.len() != DECK_SIZE {
        return Err(RoundError::integrity("a round starts from a full deck"));
    }

    let mut state = RoundState {
        round_id,
        stake,
        deck,
        player_hand: Vec::with_capacity(4),
        dealer_hand: Vec::with_capacity(4),
    };
    for _ in 0..2 {
        let card = state.draw()?;
        state.player_hand.push(card);
    }
    for _ in 0..2 {
        let card = state.draw()?;
        state.dealer_hand.push(card);
    }

    if state.player_value() == BLACKJACK {
        let step = if hand_value(&state.dealer_hand) == BLACKJACK {
            Step::Resolved(state.resolve(Multiplier::PUSH, Label::Push))
        } else {
            Step::Resolved(state.resolve(Multiplier::X2_5, Label::Blackjack))
        };
        return Ok(step);
    }

    Ok(Step::PlayerTurn(state))
}

/// Draw one card for the player; busting resolves the round.
pub fn hit(mut state: RoundState) -> Result<Step, RoundError> {
    state.validate()?;

    let card = state.draw()?;
    state.player_hand.push(card);

    if state.player_value() > BLACKJACK {
        return Ok(Step::Resolved(state.resolve(Multiplier::LOSS, Label::Bust)));
    }
    Ok(Step::PlayerTurn(state))
}

/// Play out the dealer to 17 and compare hands.
pub fn stand(mut state: RoundState) -> Result<Outcome, RoundError> {
    state.validate()?;

    while hand_value(&state.dealer_hand) < DEALER_STANDS_ON {
        let card = state.draw()?;
        state.dealer_hand.push(card);
    }

    let player = state.player_value();
    let dealer = hand_value(&state.dealer_hand);
    let (multiplier, label) = if dealer > BLACKJACK {
        (Multiplier::X2, Label::DealerBust)
    } else if player > dealer {
        (Multiplier::X2, Label::Win)
    } else if player == dealer {
        (Multiplier::PUSH, Label::Push)
    } else {
        (Multiplier::LOSS, Label::Loss)
    };

    Ok(state.resolve(multiplier, label))
}

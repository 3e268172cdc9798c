//! Tamper-evident carrier for an in-progress blackjack round.
//!
//! A token is `hex(claims_json) "." hex(hmac_sha256(key, claims_json))`. The claims
//! name the round, the account and the dealt hands but never the undealt cards: the
//! deck is rebuilt on every request from a seed only the server can derive, and the
//! hands are checked against it.

use crate::amount::Amount;
use crate::cards::new_shuffled_deck;
use crate::cards::Card;
use crate::errors::RoundError;
use crate::games::blackjack::RoundState;
use crate::rng;
use anyhow::Context;
use hmac::Hmac;
use hmac::Mac;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const KEY_LEN: usize = 32;
const ROUND_ID_LEN: usize = 16;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    round_id: String,
    account_id: i64,
    stake_units: i64,
    player_hand: Vec<Card>,
    dealer_hand: Vec<Card>,
}

/// Random 128-bit round identifier, hex encoded
pub fn new_round_id() -> String {
    let id: [u8; ROUND_ID_LEN] = rng::secure().r#gen();
    hex::encode(id)
}

/// Issues and verifies round tokens with a server-held key
#[derive(Clone)]
pub struct RoundSigner {
    mac: HmacSha256,
}

impl RoundSigner {
    pub fn new(key: &[u8]) -> Self {
        Self {
            mac: HmacSha256::new_from_slice(key).expect("HMAC takes keys of any length"),
        }
    }

    /// Key from configuration, 32 bytes hex encoded
    pub fn from_hex(key_hex: &str) -> anyhow::Result<Self> {
        let key = hex::decode(key_hex.trim()).context("round secret is not valid hex")?;
        anyhow::ensure!(key.len() >= KEY_LEN, "round secret must be at least 32 bytes");
        Ok(Self::new(&key))
    }

    /// Fresh key, tokens issued with it do not survive a restart
    pub fn random() -> Self {
        let key: [u8; KEY_LEN] = rng::secure().r#gen();
        Self::new(&key)
    }

    fn mac(&self) -> HmacSha256 {
        self.mac.clone()
    }

    /// Start a new round: a random id and the deck derived from it
    pub fn new_round(&self) -> (String, Vec<Card>) {
        let round_id = new_round_id();
        let deck = self.deck_for(&round_id);
        (round_id, deck)
    }

    /// The shuffled deck belonging to `round_id`
    pub fn deck_for(&self, round_id: &str) -> Vec<Card> {
        let mut mac = self.mac();
        mac.update(b"deck:");
        mac.update(round_id.as_bytes());
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&mac.finalize().into_bytes());
        new_shuffled_deck(&mut rng::from_seed(seed))
    }

    pub fn seal(&self, account_id: i64, state: &RoundState) -> Result<String, RoundError> {
        let claims = Claims {
            round_id: state.round_id.clone(),
            account_id,
            stake_units: state.stake.units(),
            player_hand: state.player_hand.clone(),
            dealer_hand: state.dealer_hand.clone(),
        };
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| RoundError::integrity(format!("failed to encode round: {e}")))?;

        let mut mac = self.mac();
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();

        Ok(format!("{}.{}", hex::encode(&payload), hex::encode(signature)))
    }

    /// Verify a token for `account_id` and rebuild the round it describes
    pub fn open(&self, account_id: i64, token: &str) -> Result<RoundState, RoundError> {
        let (payload_hex, signature_hex) = token
            .trim()
            .split_once('.')
            .ok_or_else(|| RoundError::integrity("malformed round token"))?;
        let payload =
            hex::decode(payload_hex).map_err(|_| RoundError::integrity("malformed round token"))?;
        let signature = hex::decode(signature_hex)
            .map_err(|_| RoundError::integrity("malformed round token"))?;

        let mut mac = self.mac();
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| RoundError::integrity("round token signature mismatch"))?;

        let claims: Claims = serde_json::from_slice(&payload)
            .map_err(|e| RoundError::integrity(format!("malformed round claims: {e}")))?;
        if claims.account_id != account_id {
            return Err(RoundError::integrity("round belongs to another account"));
        }

        let state = self.replay(claims)?;
        state.validate()?;
        Ok(state)
    }

    /// Re-deal the round's deck and check the claimed hands came off it in order
    fn replay(&self, claims: Claims) -> Result<RoundState, RoundError> {
        if claims.player_hand.len() < 2 || claims.dealer_hand.len() != 2 {
            return Err(RoundError::integrity("round hands have the wrong shape"));
        }

        let mut deck = self.deck_for(&claims.round_id);
        let mut expected = Vec::with_capacity(claims.player_hand.len() + 2);
        expected.extend(claims.player_hand.iter().take(2));
        expected.extend(&claims.dealer_hand);
        expected.extend(claims.player_hand.iter().skip(2));

        for card in expected {
            if deck.pop() != Some(card) {
                return Err(RoundError::integrity("round hands do not match its deck"));
            }
        }

        Ok(RoundState {
            round_id: claims.round_id,
            stake: Amount::from_units(claims.stake_units),
            deck,
            player_hand: claims.player_hand,
            dealer_hand: claims.dealer_hand,
        })
    }
}

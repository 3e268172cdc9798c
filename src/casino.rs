use crate::amount::Amount;
use crate::db;
use crate::db::Account;
use crate::db::HistoryEntry;
use crate::errors::RoundError;
use crate::games::blackjack;
use crate::games::blackjack::RoundState;
use crate::games::blackjack::Step;
use crate::games::blackjack::TableView;
use crate::games::GameType;
use crate::games::Outcome;
use crate::games::Wager;
use crate::ledger::Ledger;
use crate::rng;
use crate::round_token;
use crate::round_token::RoundSigner;
use sqlx::Pool;
use sqlx::Sqlite;

/// A committed round and the balance it left behind
#[derive(Debug, Clone)]
pub struct Settlement {
    pub round_id: String,
    pub outcome: Outcome,
    pub balance: Amount,
}

#[derive(Debug, Clone)]
pub enum BlackjackStep {
    /// The player still has to hit or stand. `token` carries the round to the next call.
    InProgress { token: String, view: TableView },
    Finished(Settlement),
}

/// Runs rounds for identified accounts: stake checks, resolution and settlement.
#[derive(Clone)]
pub struct Casino {
    ledger: Ledger,
    signer: RoundSigner,
    max_stake: Amount,
    history_limit: i64,
}

impl Casino {
    pub fn new(pool: Pool<Sqlite>, signer: RoundSigner, max_stake: Amount, history_limit: i64) -> Self {
        Self {
            ledger: Ledger::new(pool),
            signer,
            max_stake,
            history_limit,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Accept a stake given as a decimal number
    pub fn validate_stake(&self, stake: f64) -> Result<Amount, RoundError> {
        let amount = Amount::from_decimal(stake)
            .ok_or_else(|| RoundError::validation("stake must be a finite number"))?;
        if !amount.is_positive() {
            return Err(RoundError::validation("stake must be positive"));
        }
        if !amount.is_cent_precise() {
            return Err(RoundError::validation("stake must not have more than two decimals"));
        }
        if amount > self.max_stake {
            return Err(RoundError::validation(format!(
                "stake {amount} exceeds the maximum of {}",
                self.max_stake
            )));
        }
        Ok(amount)
    }

    /// Play one round of a single-call game
    pub async fn play(&self, account_id: i64, stake: f64, wager: Wager) -> Result<Settlement, RoundError> {
        let game = wager.game_type();
        let result = async {
            let stake = self.validate_stake(stake)?;
            self.ledger.ensure_can_stake(account_id, stake).await?;

            let outcome = {
                let mut rng = rng::secure();
                wager.play(stake, &mut rng)
            };
            self.settle(account_id, round_token::new_round_id(), outcome).await
        }
        .await;
        if let Err(e) = &result {
            log_rejection(account_id, game, e);
        }
        result
    }

    /// Deal a new blackjack round. A natural settles immediately.
    pub async fn blackjack_start(&self, account_id: i64, stake: f64) -> Result<BlackjackStep, RoundError> {
        let result = async {
            let stake = self.validate_stake(stake)?;
            self.ledger.ensure_can_stake(account_id, stake).await?;

            let (round_id, deck) = self.signer.new_round();
            match blackjack::start(round_id.clone(), stake, deck)? {
                Step::PlayerTurn(state) => {
                    db::open_round(self.ledger.pool(), &round_id, account_id, state.player_hand.len())
                        .await?;
                    self.wait_for_player(account_id, state)
                }
                Step::Resolved(outcome) => {
                    let settlement = self.settle(account_id, round_id, outcome).await?;
                    Ok(BlackjackStep::Finished(settlement))
                }
            }
        }
        .await;
        if let Err(e) = &result {
            log_rejection(account_id, GameType::Blackjack, e);
        }
        result
    }

    /// Draw a card. The token is spent: only the returned one continues the round.
    pub async fn blackjack_hit(&self, account_id: i64, token: &str) -> Result<BlackjackStep, RoundError> {
        let result = async {
            let state = self.resume(account_id, token).await?;
            let round_id = state.round_id.clone();
            let cards = state.player_hand.len();

            let moved =
                db::advance_open_round(self.ledger.pool(), &round_id, account_id, cards, cards + 1).await?;
            if !moved {
                return Err(stale_token(&round_id));
            }
            match blackjack::hit(state)? {
                Step::PlayerTurn(state) => self.wait_for_player(account_id, state),
                Step::Resolved(outcome) => {
                    let settlement = self.settle_open(account_id, round_id, cards + 1, outcome).await?;
                    Ok(BlackjackStep::Finished(settlement))
                }
            }
        }
        .await;
        if let Err(e) = &result {
            log_rejection(account_id, GameType::Blackjack, e);
        }
        result
    }

    pub async fn blackjack_stand(&self, account_id: i64, token: &str) -> Result<Settlement, RoundError> {
        let result = async {
            let state = self.resume(account_id, token).await?;
            let round_id = state.round_id.clone();
            let cards = state.player_hand.len();
            let outcome = blackjack::stand(state)?;
            self.settle_open(account_id, round_id, cards, outcome).await
        }
        .await;
        if let Err(e) = &result {
            log_rejection(account_id, GameType::Blackjack, e);
        }
        result
    }

    pub async fn profile(&self, account_id: i64) -> Result<Account, RoundError> {
        db::get_account(self.ledger.pool(), account_id)
            .await?
            .ok_or(RoundError::AccountNotFound(account_id))
    }

    /// Most recent rounds first. `limit` defaults to the configured page size.
    pub async fn history(&self, account_id: i64, limit: Option<i64>) -> Result<Vec<HistoryEntry>, RoundError> {
        let limit = history_limit(limit, self.history_limit)?;
        let records = db::list_history(self.ledger.pool(), account_id, limit).await?;
        Ok(records.into_iter().map(HistoryEntry::from).collect())
    }

    /// Open a carried round, check that it is the latest token of a round still open,
    /// and make sure the account can still cover its stake
    async fn resume(&self, account_id: i64, token: &str) -> Result<RoundState, RoundError> {
        let state = self.signer.open(account_id, token)?;

        let tracked = db::open_round_cards(self.ledger.pool(), &state.round_id, account_id).await?;
        if tracked != Some(state.player_hand.len()) {
            return Err(stale_token(&state.round_id));
        }

        self.ledger.ensure_can_stake(account_id, state.stake).await?;
        Ok(state)
    }

    fn wait_for_player(&self, account_id: i64, state: RoundState) -> Result<BlackjackStep, RoundError> {
        let token = self.signer.seal(account_id, &state)?;
        tracing::debug!(
            account_id,
            round_id = %state.round_id,
            player_value = state.player_value(),
            "Blackjack round waiting for player"
        );
        Ok(BlackjackStep::InProgress {
            token,
            view: state.view(),
        })
    }

    async fn settle(&self, account_id: i64, round_id: String, outcome: Outcome) -> Result<Settlement, RoundError> {
        let balance = self.ledger.apply_round(account_id, &round_id, &outcome).await?;
        Ok(Settlement {
            round_id,
            outcome,
            balance,
        })
    }

    async fn settle_open(
        &self,
        account_id: i64,
        round_id: String,
        player_cards: usize,
        outcome: Outcome,
    ) -> Result<Settlement, RoundError> {
        let balance = self
            .ledger
            .apply_open_round(account_id, &round_id, player_cards, &outcome)
            .await?;
        Ok(Settlement {
            round_id,
            outcome,
            balance,
        })
    }
}

/// Page size for a history query: `limit` if given, else `default`. Must be positive.
pub fn history_limit(limit: Option<i64>, default: i64) -> Result<i64, RoundError> {
    let limit = limit.unwrap_or(default);
    if limit <= 0 {
        return Err(RoundError::validation("limit must be positive"));
    }
    Ok(limit)
}

fn stale_token(round_id: &str) -> RoundError {
    RoundError::integrity(format!("token for round {round_id} is out of date or the round is closed"))
}

fn log_rejection(account_id: i64, game: GameType, error: &RoundError) {
    if error.is_retryable() {
        tracing::error!(account_id, %game, "Round failed: {error}");
    } else {
        tracing::warn!(account_id, %game, kind = error.kind(), "Round rejected: {error}");
    }
}

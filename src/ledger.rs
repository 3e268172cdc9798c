//! Settles resolved rounds against the account store.
//!
//! The balance change and the history row are written in one sqlx transaction. Any
//! early return drops the transaction, which rolls both back.

use crate::amount::Amount;
use crate::db;
use crate::db::NewGameRecord;
use crate::errors::RoundError;
use crate::games::Outcome;
use sqlx::Pool;
use sqlx::Sqlite;
use sqlx::SqliteConnection;

#[derive(Clone)]
pub struct Ledger {
    pool: Pool<Sqlite>,
}

impl Ledger {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Current balance of `account_id`, provided it covers `stake`.
    ///
    /// Runs before an outcome is drawn so a short balance never gets a round.
    pub async fn ensure_can_stake(&self, account_id: i64, stake: Amount) -> Result<Amount, RoundError> {
        let balance = db::read_balance(&self.pool, account_id)
            .await?
            .ok_or(RoundError::AccountNotFound(account_id))?;

        if stake > balance {
            return Err(RoundError::InsufficientFunds { balance, stake });
        }
        Ok(balance)
    }

    /// Apply `payout - stake` to the balance and append the history row, atomically.
    ///
    /// Returns the balance read back inside the same transaction.
    pub async fn apply_round(
        &self,
        account_id: i64,
        round_id: &str,
        outcome: &Outcome,
    ) -> Result<Amount, RoundError> {
        let mut tx = self.pool.begin().await?;
        let balance = record_round(&mut *tx, account_id, round_id, outcome).await?;
        tx.commit().await?;

        log_settled(account_id, round_id, outcome, balance);
        Ok(balance)
    }

    /// Settle a tracked blackjack round, closing it in the same transaction.
    ///
    /// `player_cards` must match the tracked position, otherwise the caller holds a
    /// superseded token and nothing is written.
    pub async fn apply_open_round(
        &self,
        account_id: i64,
        round_id: &str,
        player_cards: usize,
        outcome: &Outcome,
    ) -> Result<Amount, RoundError> {
        let mut tx = self.pool.begin().await?;
        if !db::close_open_round(&mut *tx, round_id, account_id, player_cards).await? {
            return Err(RoundError::integrity(format!(
                "round {round_id} is not open at this point"
            )));
        }
        let balance = record_round(&mut *tx, account_id, round_id, outcome).await?;
        tx.commit().await?;

        log_settled(account_id, round_id, outcome, balance);
        Ok(balance)
    }
}

async fn record_round(
    conn: &mut SqliteConnection,
    account_id: i64,
    round_id: &str,
    outcome: &Outcome,
) -> Result<Amount, RoundError> {
    let payload = serde_json::to_string(outcome)
        .map_err(|e| RoundError::integrity(format!("failed to encode outcome: {e}")))?;

    // the balance guard is re-checked here; the earlier pre-check may be stale
    let applied =
        db::apply_balance_delta(&mut *conn, account_id, outcome.stake, outcome.delta()).await?;
    if !applied {
        let balance = db::read_balance(&mut *conn, account_id).await?;
        return Err(match balance {
            Some(balance) => RoundError::InsufficientFunds {
                balance,
                stake: outcome.stake,
            },
            None => RoundError::AccountNotFound(account_id),
        });
    }

    let record = NewGameRecord {
        account_id,
        round_id,
        game_type: outcome.game_type().as_str(),
        bet_amount: outcome.stake,
        win_amount: outcome.payout,
        outcome: &payload,
    };
    db::insert_game_record(&mut *conn, &record)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                RoundError::integrity(format!("round {round_id} is already settled"))
            }
            other => RoundError::Persistence(other),
        })?;

    db::read_balance(&mut *conn, account_id)
        .await?
        .ok_or(RoundError::AccountNotFound(account_id))
}

fn log_settled(account_id: i64, round_id: &str, outcome: &Outcome, balance: Amount) {
    tracing::info!(
        account_id,
        round_id,
        game = %outcome.game_type(),
        stake = %outcome.stake,
        payout = %outcome.payout,
        balance = %balance,
        "Round settled"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::dice::Dice;
    use crate::games::dice::DiceBet;
    use crate::games::slots::Slots;
    use crate::games::slots::Symbol;

    async fn ledger_with_account(balance: Amount) -> (Ledger, i64) {
        let pool = db::test_pool().await;
        let id = db::create_account(&pool, "player", balance).await.unwrap();
        (Ledger::new(pool), id)
    }

    #[tokio::test]
    async fn test_balance_identity_holds() {
        let (ledger, id) = ledger_with_account(Amount::from_whole(100)).await;

        let stake = Amount::from_cents(1234);
        let win = Dice::settle(stake, DiceBet::Seven, 3, 4);
        let balance = ledger.apply_round(id, "r1", &win).await.unwrap();
        assert_eq!(balance, Amount::from_whole(100) - stake + win.payout);

        let loss = Dice::settle(stake, DiceBet::Eleven, 3, 4);
        let after = ledger.apply_round(id, "r2", &loss).await.unwrap();
        assert_eq!(after, balance - stake);

        let history = db::list_history(ledger.pool(), id, 50).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].round_id, "r2");
        assert_eq!(history[1].win_amount, win.payout.units());
    }

    #[tokio::test]
    async fn test_stake_above_balance_is_rejected_upfront() {
        let (ledger, id) = ledger_with_account(Amount::from_whole(10)).await;

        let stake = Amount::from_cents(1001);
        let err = ledger.ensure_can_stake(id, stake).await.unwrap_err();
        assert!(matches!(
            err,
            RoundError::InsufficientFunds { balance, stake: s }
                if balance == Amount::from_whole(10) && s == stake
        ));

        let all_in = ledger.ensure_can_stake(id, Amount::from_whole(10)).await.unwrap();
        assert_eq!(all_in, Amount::from_whole(10));

        assert!(matches!(
            ledger.ensure_can_stake(id + 1, stake).await,
            Err(RoundError::AccountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_short_balance_at_commit_leaves_no_trace() {
        let (ledger, id) = ledger_with_account(Amount::from_whole(10)).await;

        let outcome = Slots::settle(Amount::from_cents(1001), [Symbol::Diamond; 3]);
        let err = ledger.apply_round(id, "r1", &outcome).await.unwrap_err();
        assert!(matches!(err, RoundError::InsufficientFunds { .. }));

        assert_eq!(db::read_balance(ledger.pool(), id).await.unwrap(), Some(Amount::from_whole(10)));
        assert_eq!(db::count_history(ledger.pool(), id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_history_insert_rolls_back_balance() {
        let (ledger, id) = ledger_with_account(Amount::from_whole(50)).await;
        sqlx::query("DROP TABLE game_history")
            .execute(ledger.pool())
            .await
            .unwrap();

        let outcome = Dice::settle(Amount::from_whole(5), DiceBet::Low, 6, 6);
        let err = ledger.apply_round(id, "r1", &outcome).await.unwrap_err();
        assert!(err.is_retryable());

        assert_eq!(db::read_balance(ledger.pool(), id).await.unwrap(), Some(Amount::from_whole(50)));
    }

    #[tokio::test]
    async fn test_round_settles_once() {
        let (ledger, id) = ledger_with_account(Amount::from_whole(50)).await;

        let outcome = Dice::settle(Amount::from_whole(5), DiceBet::High, 6, 6);
        let balance = ledger.apply_round(id, "same", &outcome).await.unwrap();
        assert_eq!(balance, Amount::from_whole(55));

        let err = ledger.apply_round(id, "same", &outcome).await.unwrap_err();
        assert!(matches!(err, RoundError::StateIntegrity(_)));
        assert_eq!(db::read_balance(ledger.pool(), id).await.unwrap(), Some(Amount::from_whole(55)));
    }

    #[tokio::test]
    async fn test_open_round_settles_only_at_its_position() {
        let (ledger, id) = ledger_with_account(Amount::from_whole(50)).await;
        db::open_round(ledger.pool(), "bj", id, 2).await.unwrap();
        assert!(db::advance_open_round(ledger.pool(), "bj", id, 2, 3).await.unwrap());

        let outcome = Dice::settle(Amount::from_whole(5), DiceBet::High, 6, 6);
        let err = ledger.apply_open_round(id, "bj", 2, &outcome).await.unwrap_err();
        assert!(matches!(err, RoundError::StateIntegrity(_)));
        assert_eq!(db::read_balance(ledger.pool(), id).await.unwrap(), Some(Amount::from_whole(50)));
        assert_eq!(db::count_history(ledger.pool(), id).await.unwrap(), 0);

        let balance = ledger.apply_open_round(id, "bj", 3, &outcome).await.unwrap();
        assert_eq!(balance, Amount::from_whole(55));
        assert_eq!(db::open_round_cards(ledger.pool(), "bj", id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_short_balance_keeps_round_open() {
        let (ledger, id) = ledger_with_account(Amount::from_whole(1)).await;
        db::open_round(ledger.pool(), "bj", id, 2).await.unwrap();

        let outcome = Dice::settle(Amount::from_whole(5), DiceBet::High, 6, 6);
        let err = ledger.apply_open_round(id, "bj", 2, &outcome).await.unwrap_err();
        assert!(matches!(err, RoundError::InsufficientFunds { .. }));
        assert_eq!(db::open_round_cards(ledger.pool(), "bj", id).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_missing_account() {
        let (ledger, id) = ledger_with_account(Amount::from_whole(50)).await;
        let outcome = Dice::settle(Amount::from_whole(5), DiceBet::High, 6, 6);
        assert!(matches!(
            ledger.apply_round(id + 7, "r1", &outcome).await,
            Err(RoundError::AccountNotFound(_))
        ));
    }
}

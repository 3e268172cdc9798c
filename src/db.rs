use crate::amount::Amount;
use serde::Serialize;
use sqlx::migrate::Migrator;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Executor;
use sqlx::Pool;
use sqlx::Sqlite;
use std::str::FromStr;
use time::OffsetDateTime;

pub static MIGRATOR: Migrator = sqlx::migrate!(); // defaults to "./migrations"

#[derive(Debug, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub balance: i64,
    pub created_at: OffsetDateTime,
}

impl Account {
    pub fn balance(&self) -> Amount {
        Amount::from_units(self.balance)
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct GameRecord {
    pub id: i64,
    pub account_id: i64,
    pub round_id: String,
    pub game_type: String,
    pub bet_amount: i64,
    pub win_amount: i64,
    pub outcome: String,
    pub played_at: OffsetDateTime,
}

/// History row as handed to callers. The outcome blob is passed through unvalidated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub account_id: i64,
    pub round_id: String,
    pub game_type: String,
    pub bet_amount: Amount,
    pub win_amount: Amount,
    pub outcome: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub played_at: OffsetDateTime,
}

impl From<GameRecord> for HistoryEntry {
    fn from(record: GameRecord) -> Self {
        let outcome = serde_json::from_str(&record.outcome)
            .unwrap_or(serde_json::Value::String(record.outcome));
        HistoryEntry {
            id: record.id,
            account_id: record.account_id,
            round_id: record.round_id,
            game_type: record.game_type,
            bet_amount: Amount::from_units(record.bet_amount),
            win_amount: Amount::from_units(record.win_amount),
            outcome,
            played_at: record.played_at,
        }
    }
}

/// One history row to append
#[derive(Debug)]
pub struct NewGameRecord<'a> {
    pub account_id: i64,
    pub round_id: &'a str,
    pub game_type: &'a str,
    pub bet_amount: Amount,
    pub win_amount: Amount,
    pub outcome: &'a str,
}

#[derive(Debug, Default, sqlx::FromRow)]
pub struct DatabaseStats {
    pub total_accounts: i64,
    pub total_games: i64,
    pub total_winners: i64,
    pub total_pushes: i64,
    pub total_losers: i64,
    pub total_bet_amount: i64,
    pub total_payout_amount: i64,
}

impl DatabaseStats {
    pub fn total_house_profit(&self) -> Amount {
        Amount::from_units(self.total_bet_amount - self.total_payout_amount)
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct GameStats {
    pub game_type: String,
    pub total_games: i64,
    pub total_winners: i64,
    pub total_bet_amount: i64,
    pub total_payout_amount: i64,
}

/// Open (and create if missing) the database at `url`
pub async fn connect(url: &str) -> Result<Pool<Sqlite>, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);
    SqlitePoolOptions::new().connect_with(options).await
}

pub async fn create_account(
    pool: &Pool<Sqlite>,
    username: &str,
    balance: Amount,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO accounts (username, balance, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(username)
    .bind(balance.units())
    .bind(OffsetDateTime::now_utc())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn get_account(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        r#"
        SELECT id, username, balance, created_at
        FROM accounts
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn get_account_by_username(
    pool: &Pool<Sqlite>,
    username: &str,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as::<_, Account>(
        r#"
        SELECT id, username, balance, created_at
        FROM accounts
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn read_balance<'e, E>(executor: E, account_id: i64) -> Result<Option<Amount>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT balance
        FROM accounts
        WHERE id = ?
        "#,
    )
    .bind(account_id)
    .fetch_optional(executor)
    .await?;

    Ok(balance.map(Amount::from_units))
}

/// Add `delta` to the balance if it still covers `stake`.
///
/// Returns false when the account is missing or the balance is short; nothing is written then.
pub async fn apply_balance_delta<'e, E>(
    executor: E,
    account_id: i64,
    stake: Amount,
    delta: Amount,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE accounts
        SET balance = balance + ?
        WHERE id = ? AND balance >= ?
        "#,
    )
    .bind(delta.units())
    .bind(account_id)
    .bind(stake.units())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn insert_game_record<'e, E>(
    executor: E,
    record: &NewGameRecord<'_>,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO game_history (
            account_id, round_id, game_type,
            bet_amount, win_amount, outcome, played_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.account_id)
    .bind(record.round_id)
    .bind(record.game_type)
    .bind(record.bet_amount.units())
    .bind(record.win_amount.units())
    .bind(record.outcome)
    .bind(OffsetDateTime::now_utc())
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Track a blackjack round that is waiting for the player
pub async fn open_round<'e, E>(
    executor: E,
    round_id: &str,
    account_id: i64,
    player_cards: usize,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO open_rounds (round_id, account_id, player_cards, updated_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(round_id)
    .bind(account_id)
    .bind(player_cards as i64)
    .bind(OffsetDateTime::now_utc())
    .execute(executor)
    .await?;

    Ok(())
}

/// Number of player cards recorded for an open round of `account_id`
pub async fn open_round_cards<'e, E>(
    executor: E,
    round_id: &str,
    account_id: i64,
) -> Result<Option<usize>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let cards: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT player_cards
        FROM open_rounds
        WHERE round_id = ? AND account_id = ?
        "#,
    )
    .bind(round_id)
    .bind(account_id)
    .fetch_optional(executor)
    .await?;

    Ok(cards.map(|c| c as usize))
}

/// Move an open round from `from` to `to` player cards.
///
/// Returns false when the round is closed or already past `from`; nothing is written then.
pub async fn advance_open_round<'e, E>(
    executor: E,
    round_id: &str,
    account_id: i64,
    from: usize,
    to: usize,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE open_rounds
        SET player_cards = ?, updated_at = ?
        WHERE round_id = ? AND account_id = ? AND player_cards = ?
        "#,
    )
    .bind(to as i64)
    .bind(OffsetDateTime::now_utc())
    .bind(round_id)
    .bind(account_id)
    .bind(from as i64)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Remove an open round, provided it is still at `player_cards`
pub async fn close_open_round<'e, E>(
    executor: E,
    round_id: &str,
    account_id: i64,
    player_cards: usize,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        DELETE FROM open_rounds
        WHERE round_id = ? AND account_id = ? AND player_cards = ?
        "#,
    )
    .bind(round_id)
    .bind(account_id)
    .bind(player_cards as i64)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Most recent first
pub async fn list_history(
    pool: &Pool<Sqlite>,
    account_id: i64,
    limit: i64,
) -> Result<Vec<GameRecord>, sqlx::Error> {
    sqlx::query_as::<_, GameRecord>(
        r#"
        SELECT id, account_id, round_id, game_type, bet_amount,
               win_amount, outcome, played_at
        FROM game_history
        WHERE account_id = ?
        ORDER BY played_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(account_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn count_history(pool: &Pool<Sqlite>, account_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM game_history
        WHERE account_id = ?
        "#,
    )
    .bind(account_id)
    .fetch_one(pool)
    .await
}

pub async fn get_database_stats(pool: &Pool<Sqlite>) -> Result<DatabaseStats, sqlx::Error> {
    sqlx::query_as::<_, DatabaseStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM accounts) AS total_accounts,
            COUNT(*) AS total_games,
            COALESCE(SUM(CASE WHEN win_amount > bet_amount THEN 1 ELSE 0 END), 0) AS total_winners,
            COALESCE(SUM(CASE WHEN win_amount = bet_amount THEN 1 ELSE 0 END), 0) AS total_pushes,
            COALESCE(SUM(CASE WHEN win_amount < bet_amount THEN 1 ELSE 0 END), 0) AS total_losers,
            COALESCE(SUM(bet_amount), 0) AS total_bet_amount,
            COALESCE(SUM(win_amount), 0) AS total_payout_amount
        FROM game_history
        "#,
    )
    .fetch_one(pool)
    .await
}

pub async fn get_stats_by_game(pool: &Pool<Sqlite>) -> Result<Vec<GameStats>, sqlx::Error> {
    sqlx::query_as::<_, GameStats>(
        r#"
        SELECT
            game_type,
            COUNT(*) AS total_games,
            SUM(CASE WHEN win_amount > bet_amount THEN 1 ELSE 0 END) AS total_winners,
            SUM(bet_amount) AS total_bet_amount,
            SUM(win_amount) AS total_payout_amount
        FROM game_history
        GROUP BY game_type
        ORDER BY game_type
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Fresh in-memory database with the schema applied
#[cfg(test)]
pub(crate) async fn test_pool() -> Pool<Sqlite> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    // a second connection would see a different in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    MIGRATOR.run(&pool).await.unwrap();
    pool
}

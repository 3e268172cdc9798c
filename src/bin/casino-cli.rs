use anyhow::Context;
use anyhow::Result;
use casino_rounds::Amount;
use casino_rounds::Casino;
use casino_rounds::Config;
use casino_rounds::RoundSigner;
use casino_rounds::casino;
use casino_rounds::db;
use casino_rounds::games;
use casino_rounds::games::GameType;
use casino_rounds::games::Wager;
use casino_rounds::logger;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(name = "casino")]
#[command(about = "Wager game rounds over a SQLite ledger")]
struct Cli {
    #[arg(short, long, default_value = "local.config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    Start {
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Seed an account, registration lives elsewhere
    CreateAccount {
        username: String,
        #[arg(short, long, help = "Starting balance, defaults to the configured one")]
        balance: Option<f64>,
    },
    Balance {
        account_id: i64,
    },
    History {
        account_id: i64,
        #[arg(short, long)]
        limit: Option<i64>,
    },
    Stats,
    /// Estimate the return to player offline, nothing is written
    Simulate {
        game: String,
        #[arg(short, long, help = "Bet, e.g. seven, banker or color=red")]
        bet: Option<String>,
        #[arg(short, long, default_value = "100000")]
        rounds: usize,
        #[arg(short, long, default_value = "1")]
        stake: f64,
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config)?;
    logger::init_tracing(LevelFilter::DEBUG, config.log_json)?;

    match cli.command {
        Commands::Start { port } => {
            let pool = open_pool(&config).await?;
            let signer = match &config.round_secret {
                Some(secret) => RoundSigner::from_hex(secret)?,
                None => {
                    tracing::warn!("⚠️  No round_secret configured, open blackjack rounds will not survive a restart");
                    RoundSigner::random()
                }
            };
            let max_stake = config.max_stake()?;
            tracing::info!("🎰 Starting casino server...");
            tracing::info!("💰 Max stake: {max_stake}");
            tracing::info!("📜 History page size: {}", config.history_limit);

            let casino = Casino::new(pool, signer, max_stake, config.history_limit);
            casino_rounds::server::start_server(casino, port).await?;
        }
        Commands::CreateAccount { username, balance } => {
            let pool = open_pool(&config).await?;
            let balance = match balance {
                Some(balance) => Amount::from_decimal(balance)
                    .filter(|b| *b >= Amount::ZERO && b.is_cent_precise())
                    .context("balance must be a non-negative amount with at most two decimals")?,
                None => config.starting_balance()?,
            };
            if db::get_account_by_username(&pool, &username).await?.is_some() {
                anyhow::bail!("username {username} is already taken");
            }
            let id = db::create_account(&pool, &username, balance)
                .await
                .with_context(|| format!("failed to create account {username}"))?;
            tracing::info!(id, username, balance = %balance, "👤 Account created");
        }
        Commands::Balance { account_id } => {
            let pool = open_pool(&config).await?;
            match db::get_account(&pool, account_id).await? {
                Some(account) => tracing::info!(
                    id = account.id,
                    username = account.username,
                    balance = %account.balance(),
                    "💰 Balance"
                ),
                None => tracing::warn!(account_id, "Account not found"),
            }
        }
        Commands::History { account_id, limit } => {
            let limit = casino::history_limit(limit, config.history_limit)?;
            let pool = open_pool(&config).await?;
            let records = db::list_history(&pool, account_id, limit).await?;
            tracing::info!(account_id, number = records.len(), "📜 Game history");
            for record in records.into_iter().map(db::HistoryEntry::from) {
                tracing::info!(
                    round_id = record.round_id,
                    game = record.game_type,
                    bet = %record.bet_amount,
                    win = %record.win_amount,
                    played_at = %record.played_at,
                    "  🎲 {}",
                    record.outcome
                );
            }
        }
        Commands::Stats => {
            let pool = open_pool(&config).await?;
            tracing::info!("📊 Fetching statistics...");
            let db_stats = db::get_database_stats(&pool).await?;

            tracing::info!(
                accounts = db_stats.total_accounts,
                total_games = db_stats.total_games,
                winners = db_stats.total_winners,
                pushes = db_stats.total_pushes,
                losers = db_stats.total_losers,
                "🎲 Games played"
            );

            let win_rate = if db_stats.total_games > 0 {
                (db_stats.total_winners as f64 / db_stats.total_games as f64) * 100.0
            } else {
                0.0
            };
            tracing::info!(win_rate = format!("{:.2}%", win_rate), "📈 Win rate");

            tracing::info!(
                total_bet = %Amount::from_units(db_stats.total_bet_amount),
                total_payout = %Amount::from_units(db_stats.total_payout_amount),
                house_profit = %db_stats.total_house_profit(),
                "💵 Financial summary"
            );

            tracing::info!("📊 Results by game:");
            for stat in db::get_stats_by_game(&pool).await? {
                let win_rate = if stat.total_games > 0 {
                    (stat.total_winners as f64 / stat.total_games as f64) * 100.0
                } else {
                    0.0
                };
                tracing::info!(
                    game = stat.game_type,
                    games = stat.total_games,
                    winners = stat.total_winners,
                    win_rate = format!("{:.2}%", win_rate),
                    total_bet = %Amount::from_units(stat.total_bet_amount),
                    total_payout = %Amount::from_units(stat.total_payout_amount),
                    house_profit = %Amount::from_units(stat.total_bet_amount - stat.total_payout_amount),
                    "  🎯 Game stats"
                );
            }
        }
        Commands::Simulate {
            game,
            bet,
            rounds,
            stake,
            seed,
        } => simulate(&game, bet.as_deref(), rounds, stake, seed)?,
    }

    Ok(())
}

async fn open_pool(config: &Config) -> Result<sqlx::Pool<sqlx::Sqlite>> {
    let pool = db::connect(&config.database)
        .await
        .with_context(|| format!("failed to open database {}", config.database))?;
    db::MIGRATOR.run(&pool).await?;
    Ok(pool)
}

fn simulate(game: &str, bet: Option<&str>, rounds: usize, stake: f64, seed: u64) -> Result<()> {
    let game: GameType = game.parse()?;
    let wager = Wager::parse(game, bet)?;
    let stake = Amount::from_decimal(stake)
        .filter(|s| s.is_positive() && s.is_cent_precise())
        .context("stake must be positive with at most two decimals")?;

    tracing::info!(%game, rounds, stake = %stake, "🧪 Simulating {}...", wager.name());
    tracing::info!("📖 {}", wager.description());
    let report = games::simulate(&wager, stake, rounds, seed);

    tracing::info!(
        wins = report.wins,
        pushes = report.pushes,
        losses = report.losses,
        total_staked = %report.total_staked,
        total_paid = %report.total_paid,
        rtp = format!("{:.4}", report.return_to_player()),
        "📈 Simulation finished"
    );
    Ok(())
}

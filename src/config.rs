use crate::amount::Amount;
use anyhow::Context;
use serde::Deserialize;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub database: String,
    #[serde(default = "default_max_stake")]
    pub max_stake: f64,
    #[serde(default = "default_starting_balance")]
    pub starting_balance: f64,
    #[serde(default = "default_history_limit")]
    pub history_limit: i64,
    /// Hex encoded key for blackjack round tokens. A random key is used when unset.
    pub round_secret: Option<String>,
    #[serde(default)]
    pub log_json: bool,
}

fn default_max_stake() -> f64 {
    10_000.0
}

fn default_starting_balance() -> f64 {
    1_000.0
}

fn default_history_limit() -> i64 {
    50
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("failed to read config {path}"))?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let max_stake = self.max_stake()?;
        anyhow::ensure!(max_stake.is_positive(), "max_stake must be positive");
        anyhow::ensure!(
            max_stake <= Amount::MAX_STAKE,
            "max_stake must not exceed {}",
            Amount::MAX_STAKE
        );
        anyhow::ensure!(max_stake.is_cent_precise(), "max_stake must be whole cents");
        anyhow::ensure!(self.starting_balance()? >= Amount::ZERO, "starting_balance must not be negative");
        anyhow::ensure!(self.history_limit > 0, "history_limit must be positive");
        Ok(())
    }

    pub fn max_stake(&self) -> anyhow::Result<Amount> {
        Amount::from_decimal(self.max_stake).context("max_stake is not a valid amount")
    }

    pub fn starting_balance(&self) -> anyhow::Result<Amount> {
        Amount::from_decimal(self.starting_balance).context("starting_balance is not a valid amount")
    }
}

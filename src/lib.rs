pub mod amount;
pub mod cards;
pub mod casino;
pub mod config;
pub mod db;
pub mod errors;
pub mod games;
pub mod ledger;
pub mod logger;
pub mod rng;
pub mod round_token;
pub mod server;

pub use amount::Amount;
pub use casino::Casino;
pub use config::Config;
pub use errors::RoundError;
pub use round_token::RoundSigner;

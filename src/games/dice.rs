use super::Game;
use super::Label;
use super::Outcome;
use super::RoundDetails;
use crate::amount::Amount;
use crate::amount::Multiplier;
use crate::errors::RoundError;
use crate::rng::RandomSource;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiceBet {
    /// Total of 7, pays 5x
    Seven,
    /// Total of 11, pays 8x
    Eleven,
    /// 8 to 12, pays 2x
    High,
    /// 2 to 6, pays 2x
    Low,
    Even,
    Odd,
}

impl DiceBet {
    pub fn wins(&self, total: u8) -> bool {
        match self {
            DiceBet::Seven => total == 7,
            DiceBet::Eleven => total == 11,
            DiceBet::High => (8..=12).contains(&total),
            DiceBet::Low => (2..=6).contains(&total),
            DiceBet::Even => total % 2 == 0,
            DiceBet::Odd => total % 2 == 1,
        }
    }

    pub fn multiplier(&self) -> Multiplier {
        match self {
            DiceBet::Seven => Multiplier::X5,
            DiceBet::Eleven => Multiplier::X8,
            _ => Multiplier::X2,
        }
    }
}

impl FromStr for DiceBet {
    type Err = RoundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seven" => Ok(DiceBet::Seven),
            "eleven" => Ok(DiceBet::Eleven),
            "high" => Ok(DiceBet::High),
            "low" => Ok(DiceBet::Low),
            "even" => Ok(DiceBet::Even),
            "odd" => Ok(DiceBet::Odd),
            other => Err(RoundError::validation(format!("unknown dice bet type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceRoll {
    pub dice1: u8,
    pub dice2: u8,
    pub total: u8,
}

/// Two six-sided dice
pub struct Dice;

impl Dice {
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> (u8, u8) {
        let first = rng.uniform_int(6) as u8 + 1;
        let second = rng.uniform_int(6) as u8 + 1;
        (first, second)
    }

    pub fn settle(stake: Amount, bet: DiceBet, dice1: u8, dice2: u8) -> Outcome {
        let total = dice1 + dice2;
        let (multiplier, label) = if bet.wins(total) {
            (bet.multiplier(), Label::Win)
        } else {
            (Multiplier::LOSS, Label::Loss)
        };

        Outcome::new(
            stake,
            multiplier,
            label,
            RoundDetails::Dice(DiceRoll {
                dice1,
                dice2,
                total,
            }),
        )
    }
}

impl Game for Dice {
    type Bet = DiceBet;

    fn play<R: Rng + ?Sized>(&self, stake: Amount, bet: &DiceBet, rng: &mut R) -> Outcome {
        let (dice1, dice2) = Self::roll(rng);
        Self::settle(stake, *bet, dice1, dice2)
    }

    fn name(&self) -> &'static str {
        "Dice"
    }

    fn description(&self) -> &'static str {
        "Roll two dice. Seven pays 5x, eleven 8x; high (8-12), low (2-6), even and odd pay 2x."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_roll_satisfies_several_bets() {
        let stake = Amount::from_whole(10);
        let seven = Dice::settle(stake, DiceBet::Seven, 3, 4);
        assert_eq!(seven.payout, Amount::from_whole(50));
        let odd = Dice::settle(stake, DiceBet::Odd, 3, 4);
        assert_eq!(odd.payout, Amount::from_whole(20));
        assert_eq!(Dice::settle(stake, DiceBet::High, 3, 4).payout, Amount::ZERO);
        assert_eq!(Dice::settle(stake, DiceBet::Low, 3, 4).payout, Amount::ZERO);
    }

    #[test]
    fn test_eleven() {
        let outcome = Dice::settle(Amount::from_whole(2), DiceBet::Eleven, 5, 6);
        assert_eq!(outcome.payout, Amount::from_whole(16));
        assert_eq!(outcome.label, Label::Win);
    }

    #[test]
    fn test_ranges() {
        assert!(DiceBet::Low.wins(2) && DiceBet::Low.wins(6) && !DiceBet::Low.wins(7));
        assert!(DiceBet::High.wins(8) && DiceBet::High.wins(12) && !DiceBet::High.wins(7));
        assert!(DiceBet::Even.wins(12) && !DiceBet::Odd.wins(12));
    }

    #[test]
    fn test_parse() {
        assert_eq!("eleven".parse::<DiceBet>().unwrap(), DiceBet::Eleven);
        assert!("snake_eyes".parse::<DiceBet>().is_err());
    }

    #[test]
    fn test_roll_faces() {
        let mut rng = crate::rng::seeded(4);
        for _ in 0..2_000 {
            let (a, b) = Dice::roll(&mut rng);
            assert!((1..=6).contains(&a) && (1..=6).contains(&b));
        }
    }
}

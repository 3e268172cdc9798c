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
use serde_json::Value;

/// Single-zero wheel, pockets 0..=36
pub const POCKETS: u8 = 37;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Green,
    Red,
    Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouletteBet {
    /// Straight up on one pocket, pays 36x
    Number(u8),
    /// Pocket color, pays 2x; green covers zero alone
    Color(Color),
    /// Pays 2x, zero is neither
    EvenOdd(Parity),
    /// 1-18 or 19-36, pays 2x, zero is neither
    LowHigh(Half),
}

impl RouletteBet {
    /// Build a bet from the wire form `{ betType, betValue }`
    pub fn parse(bet_type: &str, bet_value: &Value) -> Result<Self, RoundError> {
        let text = bet_value.as_str().map(str::to_ascii_lowercase);
        let invalid = || RoundError::validation(format!("invalid value for {bet_type} bet: {bet_value}"));

        match bet_type {
            "number" => {
                let number = match bet_value {
                    Value::Number(n) => n.as_u64(),
                    Value::String(s) => s.trim().parse::<u64>().ok(),
                    _ => None,
                };
                match number {
                    Some(n) if n < POCKETS as u64 => Ok(RouletteBet::Number(n as u8)),
                    _ => Err(invalid()),
                }
            }
            "color" => match text.as_deref() {
                Some("red") => Ok(RouletteBet::Color(Color::Red)),
                Some("black") => Ok(RouletteBet::Color(Color::Black)),
                // only zero is green, at the even-money rate
                Some("green") => Ok(RouletteBet::Color(Color::Green)),
                _ => Err(invalid()),
            },
            "even_odd" => match text.as_deref() {
                Some("even") => Ok(RouletteBet::EvenOdd(Parity::Even)),
                Some("odd") => Ok(RouletteBet::EvenOdd(Parity::Odd)),
                _ => Err(invalid()),
            },
            "low_high" => match text.as_deref() {
                Some("low") => Ok(RouletteBet::LowHigh(Half::Low)),
                Some("high") => Ok(RouletteBet::LowHigh(Half::High)),
                _ => Err(invalid()),
            },
            other => Err(RoundError::validation(format!("unknown roulette bet type: {other}"))),
        }
    }

    pub fn wins(&self, number: u8) -> bool {
        match self {
            RouletteBet::Number(n) => *n == number,
            RouletteBet::Color(color) => *color == color_of(number),
            RouletteBet::EvenOdd(parity) => parity_of(number) == Some(*parity),
            RouletteBet::LowHigh(half) => half_of(number) == Some(*half),
        }
    }

    pub fn multiplier(&self) -> Multiplier {
        match self {
            RouletteBet::Number(_) => Multiplier::X36,
            _ => Multiplier::X2,
        }
    }
}

/// Zero is green, then even pockets black and odd pockets red
pub fn color_of(number: u8) -> Color {
    if number == 0 {
        Color::Green
    } else if number % 2 == 0 {
        Color::Black
    } else {
        Color::Red
    }
}

fn parity_of(number: u8) -> Option<Parity> {
    match number {
        0 => None,
        n if n % 2 == 0 => Some(Parity::Even),
        _ => Some(Parity::Odd),
    }
}

fn half_of(number: u8) -> Option<Half> {
    match number {
        1..=18 => Some(Half::Low),
        19..=36 => Some(Half::High),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouletteSpin {
    pub number: u8,
    pub color: Color,
    pub is_win: bool,
}

pub struct Roulette;

impl Roulette {
    pub fn spin<R: Rng + ?Sized>(rng: &mut R) -> u8 {
        rng.uniform_int(POCKETS as usize) as u8
    }

    /// Pay out a bet against a known pocket
    pub fn settle(stake: Amount, bet: &RouletteBet, number: u8) -> Outcome {
        let is_win = bet.wins(number);
        let (multiplier, label) = if is_win {
            (bet.multiplier(), Label::Win)
        } else {
            (Multiplier::LOSS, Label::Loss)
        };

        Outcome::new(
            stake,
            multiplier,
            label,
            RoundDetails::Roulette(RouletteSpin {
                number,
                color: color_of(number),
                is_win,
            }),
        )
    }
}

impl Game for Roulette {
    type Bet = RouletteBet;

    fn play<R: Rng + ?Sized>(&self, stake: Amount, bet: &RouletteBet, rng: &mut R) -> Outcome {
        Self::settle(stake, bet, Self::spin(rng))
    }

    fn name(&self) -> &'static str {
        "Roulette"
    }

    fn description(&self) -> &'static str {
        "Single-zero wheel. A straight number pays 36x; color, even/odd and low/high \
         pay 2x. Zero is neither even nor odd, low nor high."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_red_on_five_wins_double() {
        let bet = RouletteBet::parse("color", &json!("red")).unwrap();
        let stake = Amount::from_whole(10);
        let outcome = Roulette::settle(stake, &bet, 5);
        assert_eq!(outcome.payout, Amount::from_whole(20));
        match outcome.details {
            RoundDetails::Roulette(spin) => {
                assert_eq!(spin.color, Color::Red);
                assert!(spin.is_win);
            }
            other => panic!("unexpected details {other:?}"),
        }
    }

    #[test]
    fn test_straight_number() {
        let stake = Amount::from_whole(1);
        let bet = RouletteBet::parse("number", &json!(17)).unwrap();
        assert_eq!(Roulette::settle(stake, &bet, 17).payout, Amount::from_whole(36));
        assert_eq!(Roulette::settle(stake, &bet, 18).payout, Amount::ZERO);

        let zero = RouletteBet::parse("number", &json!("0")).unwrap();
        assert_eq!(Roulette::settle(stake, &zero, 0).payout, Amount::from_whole(36));
    }

    #[test]
    fn test_zero_is_neither_even_odd_nor_low_high() {
        let stake = Amount::from_whole(1);
        for (bet_type, value) in [
            ("even_odd", "even"),
            ("even_odd", "odd"),
            ("low_high", "low"),
            ("low_high", "high"),
            ("color", "red"),
            ("color", "black"),
        ] {
            let bet = RouletteBet::parse(bet_type, &json!(value)).unwrap();
            let outcome = Roulette::settle(stake, &bet, 0);
            assert_eq!(outcome.payout, Amount::ZERO, "{bet_type}={value}");
            assert_eq!(outcome.label, Label::Loss);
        }
    }

    #[test]
    fn test_halves_and_parity() {
        let stake = Amount::from_whole(1);
        let low = RouletteBet::LowHigh(Half::Low);
        let high = RouletteBet::LowHigh(Half::High);
        assert!(low.wins(18) && !low.wins(19));
        assert!(high.wins(19) && high.wins(36) && !high.wins(18));
        let even = RouletteBet::EvenOdd(Parity::Even);
        assert_eq!(Roulette::settle(stake, &even, 36).payout, Amount::from_whole(2));
        assert_eq!(color_of(36), Color::Black);
    }

    #[test]
    fn test_green_wins_only_on_zero() {
        let bet = RouletteBet::parse("color", &json!("green")).unwrap();
        assert_eq!(bet, RouletteBet::Color(Color::Green));

        let stake = Amount::from_whole(10);
        let zero = Roulette::settle(stake, &bet, 0);
        assert_eq!(zero.payout, Amount::from_whole(20));
        assert_eq!(zero.label, Label::Win);

        for number in [1, 2, 17, 36] {
            assert_eq!(Roulette::settle(stake, &bet, number).payout, Amount::ZERO);
        }
    }

    #[test]
    fn test_rejects_unknown_bets() {
        assert!(RouletteBet::parse("column", &json!(1)).is_err());
        assert!(RouletteBet::parse("number", &json!(37)).is_err());
        assert!(RouletteBet::parse("number", &json!(-1)).is_err());
        assert!(RouletteBet::parse("color", &json!("blue")).is_err());
        assert!(RouletteBet::parse("even_odd", &json!(2)).is_err());
    }

    #[test]
    fn test_spin_range() {
        let mut rng = crate::rng::seeded(8);
        let mut seen = [false; POCKETS as usize];
        for _ in 0..5_000 {
            seen[Roulette::spin(&mut rng) as usize] = true;
        }
        assert!(seen.iter().all(|hit| *hit));
    }
}

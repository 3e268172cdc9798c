use super::Game;
use super::Label;
use super::Outcome;
use super::RoundDetails;
use crate::amount::Amount;
use crate::amount::Multiplier;
use crate::rng::RandomSource;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

/// Reel symbols, all equally likely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    #[serde(rename = "🍒")]
    Cherry,
    #[serde(rename = "🍋")]
    Lemon,
    #[serde(rename = "🍊")]
    Orange,
    #[serde(rename = "🍉")]
    Watermelon,
    #[serde(rename = "⭐")]
    Star,
    #[serde(rename = "💎")]
    Diamond,
    #[serde(rename = "7️⃣")]
    Seven,
}

impl Symbol {
    pub const ALL: [Symbol; 7] = [
        Symbol::Cherry,
        Symbol::Lemon,
        Symbol::Orange,
        Symbol::Watermelon,
        Symbol::Star,
        Symbol::Diamond,
        Symbol::Seven,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotsSpin {
    pub reels: [Symbol; 3],
}

/// Three reels, seven symbols
pub struct Slots;

impl Slots {
    pub fn spin_reels<R: Rng + ?Sized>(rng: &mut R) -> [Symbol; 3] {
        [(); 3].map(|_| Symbol::ALL[rng.uniform_int(Symbol::ALL.len())])
    }

    /// Pay out a fixed set of reels
    pub fn settle(stake: Amount, reels: [Symbol; 3]) -> Outcome {
        let [a, b, c] = reels;
        let (multiplier, label) = if a == b && b == c {
            match a {
                Symbol::Diamond => (Multiplier::X10, Label::Jackpot),
                Symbol::Seven => (Multiplier::X7, Label::BigWin),
                Symbol::Star => (Multiplier::X5, Label::BigWin),
                _ => (Multiplier::X3, Label::Win),
            }
        } else if a == b || b == c || a == c {
            (Multiplier::X1_5, Label::SmallWin)
        } else {
            (Multiplier::LOSS, Label::Loss)
        };

        Outcome::new(
            stake,
            multiplier,
            label,
            RoundDetails::Slots(SlotsSpin { reels }),
        )
    }
}

impl Game for Slots {
    type Bet = ();

    fn play<R: Rng + ?Sized>(&self, stake: Amount, _bet: &(), rng: &mut R) -> Outcome {
        Self::settle(stake, Self::spin_reels(rng))
    }

    fn name(&self) -> &'static str {
        "Slots"
    }

    fn description(&self) -> &'static str {
        "Three reels of seven symbols. Three diamonds pay 10x, three sevens 7x, \
         three stars 5x, any other triple 3x and any pair 1.5x."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng;
    use Symbol::*;

    #[test]
    fn test_diamond_jackpot() {
        let outcome = Slots::settle(Amount::from_whole(10), [Diamond, Diamond, Diamond]);
        assert_eq!(outcome.payout, Amount::from_whole(100));
        assert_eq!(outcome.label, Label::Jackpot);
    }

    #[test]
    fn test_triples() {
        let stake = Amount::from_whole(10);
        assert_eq!(Slots::settle(stake, [Seven, Seven, Seven]).payout, Amount::from_whole(70));
        assert_eq!(Slots::settle(stake, [Star, Star, Star]).payout, Amount::from_whole(50));
        let cherries = Slots::settle(stake, [Cherry, Cherry, Cherry]);
        assert_eq!(cherries.payout, Amount::from_whole(30));
        assert_eq!(cherries.label, Label::Win);
    }

    #[test]
    fn test_any_pair_pays_one_and_a_half() {
        let stake = Amount::from_whole(10);
        for reels in [[Lemon, Lemon, Star], [Star, Lemon, Lemon], [Lemon, Star, Lemon]] {
            let outcome = Slots::settle(stake, reels);
            assert_eq!(outcome.payout, Amount::from_whole(15));
            assert_eq!(outcome.label, Label::SmallWin);
        }
    }

    #[test]
    fn test_no_match_loses() {
        let outcome = Slots::settle(Amount::from_whole(10), [Cherry, Lemon, Orange]);
        assert_eq!(outcome.payout, Amount::ZERO);
        assert_eq!(outcome.label, Label::Loss);
    }

    #[test]
    fn test_reels_cover_all_symbols() {
        let mut rng = rng::seeded(5);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1_000 {
            seen.extend(Slots::spin_reels(&mut rng));
        }
        assert_eq!(seen.len(), Symbol::ALL.len());
    }
}

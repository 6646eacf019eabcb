use roulette_types::{Bet, SpinResult};
use std::fmt;

/// Verdict for a bet settled against a spin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub won: bool,
    pub message: String,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Settle a bet against a spin.
///
/// Only colors are compared, ignoring ASCII case. The reported color is echoed back
/// verbatim in the message.
pub fn settle(bet: &Bet, result: &SpinResult) -> Outcome {
    let won = bet.color().as_str().eq_ignore_ascii_case(&result.color);
    let message = if won {
        format!("Winner Winner Chicken Dinner! Winning Color: {}", result.color)
    } else {
        format!("U lose. Winning Color: {}", result.color)
    };
    Outcome { won, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use roulette_types::POCKETS;

    fn bet(raw: &str) -> Bet {
        raw.parse().unwrap()
    }

    #[test]
    fn test_matching_color_wins() {
        let outcome = settle(&bet("17"), &SpinResult::new(17, "black"));
        assert!(outcome.won);
        assert_eq!(
            outcome.message,
            "Winner Winner Chicken Dinner! Winning Color: black"
        );
    }

    #[test]
    fn test_color_match_ignores_case() {
        let outcome = settle(&bet("red"), &SpinResult::new(3, "RED"));
        assert!(outcome.won);
        assert_eq!(outcome.to_string(), "Winner Winner Chicken Dinner! Winning Color: RED");
    }

    #[test]
    fn test_different_color_loses() {
        let outcome = settle(&bet("black"), &SpinResult::new(3, "red"));
        assert!(!outcome.won);
        assert_eq!(outcome.message, "U lose. Winning Color: red");
    }

    #[test]
    fn test_green_pocket_matches_green_result() {
        assert!(settle(&bet("00"), &SpinResult::new(0, "green")).won);
        assert!(!settle(&bet("red"), &SpinResult::new(0, "green")).won);
    }

    #[test]
    fn test_number_is_not_compared() {
        // A straight bet on 17 still wins on any black pocket.
        assert!(settle(&bet("17"), &SpinResult::new(2, "black")).won);
    }

    proptest! {
        #[test]
        fn prop_settle_is_deterministic(
            index in 0..POCKETS.len(),
            number in any::<i64>(),
            color in "[rR][eE][dD]|[bB][lL][aA][cC][kK]|[gG][rR][eE][eE][nN]|blue",
        ) {
            let bet = bet(POCKETS[index]);
            let result = SpinResult::new(number, color.clone());
            let first = settle(&bet, &result);
            prop_assert_eq!(&first, &settle(&bet, &result));
            prop_assert_eq!(first.won, bet.color().as_str() == color.to_ascii_lowercase());
            prop_assert!(first.message.ends_with(&color));
        }
    }
}

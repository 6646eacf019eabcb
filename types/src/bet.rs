use crate::{Error, BLACK_POCKETS, GREEN_POCKETS, POCKETS, RED_POCKETS};
use std::{fmt, str::FromStr};

/// Pocket color on the wheel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    Red,
    Black,
    Green,
    Unknown,
}

impl Color {
    /// Color of a pocket label. Labels that are not on the wheel map to `Unknown`.
    pub fn of_pocket(pocket: &str) -> Self {
        if GREEN_POCKETS.contains(&pocket) {
            Color::Green
        } else if RED_POCKETS.contains(&pocket) {
            Color::Red
        } else if BLACK_POCKETS.contains(&pocket) {
            Color::Black
        } else {
            Color::Unknown
        }
    }

    /// Wire form of the color.
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Black => "black",
            Color::Green => "green",
            Color::Unknown => "unknown",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Color::Red => "Red",
            Color::Black => "Black",
            Color::Green => "Green",
            Color::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the player put chips on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Selection {
    /// A single pocket, e.g. `"17"` or `"00"`.
    Number(&'static str),
    /// An even-money color bet with no number attached.
    Color(Color),
}

impl Selection {
    /// Short label used for tallies and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Selection::Number(pocket) => pocket,
            Selection::Color(color) => color.as_str(),
        }
    }
}

impl FromStr for Selection {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if let Some(pocket) = POCKETS.iter().find(|pocket| **pocket == trimmed) {
            return Ok(Selection::Number(*pocket));
        }
        if trimmed.eq_ignore_ascii_case("red") {
            Ok(Selection::Color(Color::Red))
        } else if trimmed.eq_ignore_ascii_case("black") {
            Ok(Selection::Color(Color::Black))
        } else {
            Err(Error::InvalidSelection(raw.to_string()))
        }
    }
}

/// A bet placed at the table. The color is derived once at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bet {
    selection: Selection,
    color: Color,
}

impl Bet {
    pub fn new(selection: Selection) -> Self {
        let color = match selection {
            Selection::Number(pocket) => Color::of_pocket(pocket),
            Selection::Color(color) => color,
        };
        Self { selection, color }
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Pocket label, or the empty string for color-only bets.
    pub fn number(&self) -> &'static str {
        match self.selection {
            Selection::Number(pocket) => pocket,
            Selection::Color(_) => "",
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }
}

impl FromStr for Bet {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.parse::<Selection>().map(Bet::new)
    }
}

impl fmt::Display for Bet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.selection {
            Selection::Number(pocket) => write!(f, "Number: {pocket}, Color: {}", self.color),
            Selection::Color(color) => write!(f, "Color: {}", color.title()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pocket_colors() {
        assert_eq!(Color::of_pocket("0"), Color::Green);
        assert_eq!(Color::of_pocket("00"), Color::Green);
        assert_eq!(Color::of_pocket("17"), Color::Black);
        assert_eq!(Color::of_pocket("36"), Color::Red);
        assert_eq!(Color::of_pocket("37"), Color::Unknown);
        assert_eq!(Color::of_pocket(""), Color::Unknown);
    }

    #[test]
    fn test_parse_number_selection() {
        let bet: Bet = "17".parse().unwrap();
        assert_eq!(bet.selection(), Selection::Number("17"));
        assert_eq!(bet.number(), "17");
        assert_eq!(bet.color(), Color::Black);

        let bet: Bet = " 00 ".parse().unwrap();
        assert_eq!(bet.number(), "00");
        assert_eq!(bet.color(), Color::Green);
    }

    #[test]
    fn test_parse_color_selection() {
        let bet: Bet = "RED".parse().unwrap();
        assert_eq!(bet.selection(), Selection::Color(Color::Red));
        assert_eq!(bet.number(), "");
        assert_eq!(bet.color(), Color::Red);

        let bet: Bet = "black".parse().unwrap();
        assert_eq!(bet.color(), Color::Black);
    }

    #[test]
    fn test_parse_rejects_off_table_selections() {
        for raw in ["37", "-1", "000", "green", "", "7.0", "zero"] {
            let err = raw.parse::<Bet>().expect_err("selection should be rejected");
            assert!(matches!(err, Error::InvalidSelection(ref got) if got == raw));
        }
    }

    #[test]
    fn test_display_matches_history_format() {
        assert_eq!(
            "17".parse::<Bet>().unwrap().to_string(),
            "Number: 17, Color: black"
        );
        assert_eq!("red".parse::<Bet>().unwrap().to_string(), "Color: Red");
        assert_eq!("black".parse::<Bet>().unwrap().to_string(), "Color: Black");
    }
}

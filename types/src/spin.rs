use serde::{Deserialize, Serialize};
use std::fmt;

/// Winning pocket as broadcast by the wheel.
///
/// The color is taken as reported and is not cross-checked against the number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinResult {
    pub number: i64,
    pub color: String,
}

impl SpinResult {
    pub fn new(number: i64, color: impl Into<String>) -> Self {
        Self {
            number,
            color: color.into(),
        }
    }
}

impl fmt::Display for SpinResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.number, self.color)
    }
}

//! Roulette table types.
//!
//! Defines the table layout, bets, spin results, and the JSON codec used on the broker topics.

mod bet;
mod codec;
mod constants;
mod spin;

pub use bet::{Bet, Color, Selection};
pub use codec::{decode_result, encode_bet};
pub use constants::*;
pub use spin::SpinResult;

use thiserror::Error;

/// Error type for table and codec operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid selection: {0:?} (expected 0, 00, 1-36, red or black)")]
    InvalidSelection(String),
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("malformed payload: expected a JSON object")]
    NotAnObject,
}

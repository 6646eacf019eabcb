//! JSON payloads exchanged with the broker.
//!
//! Bets go out as `{"number": "<pocket or empty>", "color": "<color>"}`. Results come in as
//! `{"number": <integer>, "color": "<string>"}`; unknown extra fields are ignored.

use crate::{Bet, Error, SpinResult};
use serde_json::{json, Value};

/// Encode a bet for the bet topic.
pub fn encode_bet(bet: &Bet) -> Vec<u8> {
    json!({
        "number": bet.number(),
        "color": bet.color().as_str(),
    })
    .to_string()
    .into_bytes()
}

/// Decode a payload received on the result topic. Only a JSON object is accepted.
pub fn decode_result(payload: &[u8]) -> Result<SpinResult, Error> {
    let value: Value = serde_json::from_slice(payload)?;
    if !value.is_object() {
        return Err(Error::NotAnObject);
    }
    Ok(serde_json::from_value(value)?)
}

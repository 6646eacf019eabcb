//! Roulette execution layer.
//!
//! Settlement and session bookkeeping for the table client. Nothing in this crate performs
//! I/O, reads the clock or draws randomness: the same sequence of bets and spins always
//! yields the same state and the same outcomes.

mod matcher;
mod session;

pub use matcher::{settle, Outcome};
pub use session::{History, SessionState};

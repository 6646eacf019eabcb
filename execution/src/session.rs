use roulette_types::{Bet, Selection, SpinResult, HISTORY_CAPACITY};
use std::collections::{BTreeMap, VecDeque};
use tracing::trace;

/// Fixed-capacity log that evicts its oldest entry once full.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct History<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> History<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, returning the one evicted to make room (if any).
    pub fn push(&mut self, entry: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(entry);
        }
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

/// Everything the table remembers for one session.
///
/// The pending bet is never cleared by a spin; placing a new bet replaces it.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    pending_bet: Option<Bet>,
    last_result: Option<SpinResult>,
    bets: History<Bet>,
    results: History<SpinResult>,
    tally: BTreeMap<Selection, u32>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `bet` the pending bet and log it.
    pub fn place(&mut self, bet: Bet) {
        if let selection @ Selection::Number(_) = bet.selection() {
            let count = self.tally.entry(selection).or_insert(0);
            *count = count.saturating_add(1);
        }
        if let Some(evicted) = self.bets.push(bet.clone()) {
            trace!(%evicted, "bet history full, evicted oldest entry");
        }
        self.pending_bet = Some(bet);
    }

    /// Make `result` the latest spin and log it.
    pub fn record(&mut self, result: SpinResult) {
        if let Some(evicted) = self.results.push(result.clone()) {
            trace!(%evicted, "result history full, evicted oldest entry");
        }
        self.last_result = Some(result);
    }

    pub fn pending_bet(&self) -> Option<&Bet> {
        self.pending_bet.as_ref()
    }

    pub fn last_result(&self) -> Option<&SpinResult> {
        self.last_result.as_ref()
    }

    pub fn bet_history(&self) -> &History<Bet> {
        &self.bets
    }

    pub fn result_history(&self) -> &History<SpinResult> {
        &self.results
    }

    /// How many times `selection` was bet this session.
    pub fn tally(&self, selection: Selection) -> u32 {
        self.tally.get(&selection).copied().unwrap_or(0)
    }

    /// Bet counts per table number, ordered by selection. Color bets are not counted.
    pub fn tallies(&self) -> impl Iterator<Item = (Selection, u32)> + '_ {
        self.tally.iter().map(|(selection, count)| (*selection, *count))
    }
}

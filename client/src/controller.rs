use crate::{
    connection::{BrokerConnection, ConnectionState},
    events::Event,
    Result,
};
use roulette_execution::{settle, History, Outcome, SessionState};
use roulette_types::{decode_result, encode_bet, Bet, SpinResult, BET_TOPIC, RESULT_TOPIC};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Buffered change notifications per subscriber before it starts lagging.
const CHANGE_CAPACITY: usize = 64;

/// Outbound side of the broker as seen by the controller.
pub trait Publisher {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;
    fn state(&self) -> ConnectionState;
}

impl Publisher for BrokerConnection {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        BrokerConnection::publish(self, topic, payload)
    }

    fn state(&self) -> ConnectionState {
        BrokerConnection::state(self)
    }
}

/// State change worth re-rendering for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    BetPlaced(Bet),
    /// A spin was recorded. `outcome` is `None` when no bet was pending.
    ResultReceived {
        result: SpinResult,
        outcome: Option<Outcome>,
    },
    /// A result payload could not be decoded and was discarded.
    MessageDropped { topic: String, reason: String },
    ConnectionChanged(bool),
}

/// Drives one table session: places bets and settles broadcast spins.
///
/// Bets are committed locally before they are published. A failed publish is returned to the
/// caller but the bet stays pending and in the history.
pub struct GameController<P> {
    publisher: P,
    session: SessionState,
    outcome: Option<Outcome>,
    changes: broadcast::Sender<Change>,
}

impl<P: Publisher> GameController<P> {
    pub fn new(publisher: P) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            publisher,
            session: SessionState::new(),
            outcome: None,
            changes,
        }
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }

    /// Bet on `selection` (`"0"`, `"00"`, `"1"`..`"36"`, `"red"` or `"black"`) and publish it.
    pub fn place_bet(&mut self, selection: &str) -> Result<Bet> {
        let bet: Bet = selection.parse()?;
        self.session.place(bet.clone());
        info!(
            selection = bet.selection().label(),
            color = %bet.color(),
            "bet placed"
        );
        self.emit(Change::BetPlaced(bet.clone()));

        if let Err(err) = self.publisher.publish(BET_TOPIC, encode_bet(&bet)) {
            warn!(error = %err, "failed to publish bet");
            return Err(err);
        }
        Ok(bet)
    }

    /// Record a payload received on the result topic and settle the pending bet against it.
    ///
    /// Returns the outcome, or `None` when no bet is pending. A payload that does not decode
    /// leaves the session untouched.
    pub fn on_result_payload(&mut self, topic: &str, payload: &[u8]) -> Result<Option<Outcome>> {
        let result = match decode_result(payload) {
            Ok(result) => result,
            Err(err) => {
                warn!(topic, len = payload.len(), error = %err, "dropping result payload");
                self.emit(Change::MessageDropped {
                    topic: topic.to_string(),
                    reason: err.to_string(),
                });
                return Err(err.into());
            }
        };

        self.session.record(result.clone());
        let outcome = self
            .session
            .pending_bet()
            .map(|bet| settle(bet, &result));
        match &outcome {
            Some(outcome) => info!(%result, won = outcome.won, "bet settled"),
            None => info!(%result, "result recorded with no pending bet"),
        }
        if outcome.is_some() {
            self.outcome = outcome.clone();
        }
        self.emit(Change::ResultReceived {
            result,
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    /// Apply one transport event.
    pub fn handle(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Message { topic, payload } if topic == RESULT_TOPIC => {
                self.on_result_payload(&topic, &payload)?;
            }
            Event::Message { topic, payload } => {
                debug!(topic = %topic, len = payload.len(), "ignoring message on unexpected topic");
            }
            Event::Connection(connected) => {
                if connected {
                    info!("table online");
                } else {
                    warn!("table offline");
                }
                self.emit(Change::ConnectionChanged(connected));
            }
        }
        Ok(())
    }

    pub fn pending_bet(&self) -> Option<&Bet> {
        self.session.pending_bet()
    }

    pub fn last_result(&self) -> Option<&SpinResult> {
        self.session.last_result()
    }

    pub fn bet_history(&self) -> &History<Bet> {
        self.session.bet_history()
    }

    pub fn result_history(&self) -> &History<SpinResult> {
        self.session.result_history()
    }

    /// Outcome of the most recent settlement, if any bet has been settled.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.publisher.state()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    fn emit(&self, change: Change) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }
}

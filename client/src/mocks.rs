//! In-memory stand-ins for the broker, for tests and local tooling.

use crate::{connection::ConnectionState, controller::Publisher, Error, Result};
use std::sync::{Arc, Mutex, PoisonError};

struct Inner {
    state: ConnectionState,
    published: Vec<(String, Vec<u8>)>,
}

/// Publisher that records every accepted message. Clones share the same record.
#[derive(Clone)]
pub struct MockPublisher {
    inner: Arc<Mutex<Inner>>,
}

impl MockPublisher {
    fn with_state(state: ConnectionState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state,
                published: Vec::new(),
            })),
        }
    }

    pub fn connected() -> Self {
        Self::with_state(ConnectionState::Connected)
    }

    pub fn disconnected() -> Self {
        Self::with_state(ConnectionState::Disconnected)
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).state = state;
    }

    /// Messages accepted so far, oldest first.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .published
            .clone()
    }
}

impl Publisher for MockPublisher {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.state != ConnectionState::Connected {
            return Err(Error::NotConnected);
        }
        inner.published.push((topic.to_string(), payload));
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).state
    }
}

//! Client for a roulette betting table reached over an MQTT broker.
//!
//! [BrokerConnection] owns the transport, [Stream] marshals its callbacks onto the owning task,
//! and [GameController] places bets and settles broadcast spins against them.
//!
//! ```rust,ignore
//! use roulette_client::{BrokerConfig, BrokerConnection, GameController, Stream};
//! use roulette_types::RESULT_TOPIC;
//!
//! # async fn example() -> roulette_client::Result<()> {
//! let config = BrokerConfig::from_env()?;
//! let connection = BrokerConnection::new();
//! let mut events = Stream::attach(&connection);
//! connection.connect(&config).await?;
//! connection.subscribe(RESULT_TOPIC)?;
//!
//! let mut controller = GameController::new(connection.clone());
//! controller.place_bet("17")?;
//! while let Some(event) = events.next().await {
//!     let _ = controller.handle(event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod controller;
pub mod events;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use config::BrokerConfig;
pub use connection::{BrokerConnection, ConnectionState};
pub use controller::{Change, GameController, Publisher};
pub use events::{Event, Stream};
pub use roulette_execution::Outcome;

use std::time::Duration;
use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("connection failed: {0}")]
    Connection(#[from] rumqttc::ConnectionError),
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("not connected")]
    NotConnected,
    #[error("broker request failed: {0}")]
    Request(#[from] rumqttc::ClientError),
    #[error("{0}")]
    Table(#[from] roulette_types::Error),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected ssl, mqtts, tcp or mqtt)")]
    InvalidScheme(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

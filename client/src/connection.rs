//! MQTT connection to the table broker.
//!
//! A [BrokerConnection] owns at most one transport session. Incoming messages and connection
//! changes are reported through one listener per event kind, called from the task that drives
//! the transport. Registering a listener replaces the previous one.

use crate::{config::BrokerConfig, Error, Result};
use bytes::Bytes;
use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, Packet, QoS};
use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::{task::JoinHandle, time};
use tracing::{debug, info, trace, warn};

/// Requests (publish, subscribe, disconnect) buffered ahead of the transport.
const REQUEST_CAPACITY: usize = 64;

/// Lifecycle of the broker connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

pub type MessageListener = Arc<dyn Fn(&str, Bytes) + Send + Sync>;
pub type ConnectionListener = Arc<dyn Fn(bool) + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Status {
    state: ConnectionState,
    // Bumped on every connect and disconnect so a stale transport task cannot report.
    generation: u64,
}

#[derive(Default)]
struct Listeners {
    message: Option<MessageListener>,
    connection: Option<ConnectionListener>,
}

struct Shared {
    status: Mutex<Status>,
    listeners: Mutex<Listeners>,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        lock(&self.status).state
    }

    /// Move `from -> to` if `generation` is still current.
    fn advance(&self, generation: u64, from: ConnectionState, to: ConnectionState) -> bool {
        let mut status = lock(&self.status);
        if status.generation != generation || status.state != from {
            return false;
        }
        status.state = to;
        true
    }

    fn notify(&self, connected: bool) {
        let listener = lock(&self.listeners).connection.clone();
        if let Some(listener) = listener {
            listener(connected);
        }
    }

    fn deliver(&self, generation: u64, topic: &str, payload: Bytes) {
        {
            let status = lock(&self.status);
            if status.generation != generation || status.state != ConnectionState::Connected {
                trace!(topic, "dropping message received while not connected");
                return;
            }
        }
        let listener = lock(&self.listeners).message.clone();
        match listener {
            Some(listener) => listener(topic, payload),
            None => trace!(topic, "no message listener registered"),
        }
    }

    fn lost(&self, generation: u64, reason: &dyn fmt::Display) {
        if !self.advance(
            generation,
            ConnectionState::Connected,
            ConnectionState::Disconnected,
        ) {
            debug!(%reason, "transport stopped after disconnect");
            return;
        }
        warn!(%reason, "connection lost");
        self.notify(false);
    }
}

struct Session {
    client: AsyncClient,
    driver: JoinHandle<()>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// Handle to the broker. Clones share the same connection.
#[derive(Clone)]
pub struct BrokerConnection {
    shared: Arc<Shared>,
    session: Arc<Mutex<Option<Session>>>,
}

impl Default for BrokerConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerConnection {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                status: Mutex::new(Status {
                    state: ConnectionState::Disconnected,
                    generation: 0,
                }),
                listeners: Mutex::new(Listeners::default()),
            }),
            session: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Register the message listener, replacing any previous one.
    pub fn set_on_message<F>(&self, listener: F)
    where
        F: Fn(&str, Bytes) + Send + Sync + 'static,
    {
        lock(&self.shared.listeners).message = Some(Arc::new(listener));
    }

    /// Register the connection listener, replacing any previous one.
    pub fn set_on_connection_changed<F>(&self, listener: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        lock(&self.shared.listeners).connection = Some(Arc::new(listener));
    }

    /// Connect to the broker and wait for its acknowledgement.
    ///
    /// Any existing session is torn down first. On failure the connection is left
    /// `Disconnected`, the connection listener hears `false`, and the error is returned.
    pub async fn connect(&self, config: &BrokerConfig) -> Result<()> {
        let generation = {
            let mut status = lock(&self.shared.status);
            status.generation = status.generation.wrapping_add(1);
            status.state = ConnectionState::Connecting;
            status.generation
        };
        lock(&self.session).take();

        if let Err(err) = config.validate() {
            warn!(error = %err, "refusing to connect");
            self.fail_connect(generation);
            return Err(err);
        }

        info!(
            url = %config.url(),
            client_id = %config.client_id,
            tls = config.is_tls(),
            "connecting to broker"
        );
        let (client, mut eventloop) = AsyncClient::new(config.mqtt_options(), REQUEST_CAPACITY);
        let handshake = match time::timeout(config.connect_timeout, await_connack(&mut eventloop)).await {
            Ok(result) => result,
            Err(_) => Err(Error::ConnectTimeout(config.connect_timeout)),
        };
        if let Err(err) = handshake {
            warn!(error = %err, "failed to connect to broker");
            self.fail_connect(generation);
            return Err(err);
        }

        if !self.shared.advance(
            generation,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ) {
            debug!("connect superseded before acknowledgement was handled");
            let _ = client.try_disconnect();
            return Err(Error::ConnectionClosed);
        }
        let driver = tokio::spawn(drive(self.shared.clone(), eventloop, generation));
        *lock(&self.session) = Some(Session { client, driver });
        info!("connected to broker");
        self.shared.notify(true);
        Ok(())
    }

    /// Ask the broker for messages on `topic`. They reach the message listener until
    /// [BrokerConnection::disconnect] or connection loss.
    pub fn subscribe(&self, topic: &str) -> Result<()> {
        let session = lock(&self.session);
        let client = self.connected_client(&session)?;
        client.try_subscribe(topic, QoS::AtMostOnce)?;
        info!(topic, "subscribed");
        Ok(())
    }

    /// Queue `payload` for `topic` without waiting for it to be written.
    pub fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let session = lock(&self.session);
        let client = self.connected_client(&session)?;
        let len = payload.len();
        client.try_publish(topic, QoS::AtMostOnce, false, payload)?;
        debug!(topic, len, "message queued");
        Ok(())
    }

    /// Close the connection. Does nothing when already disconnected.
    pub fn disconnect(&self) {
        let previous = {
            let mut status = lock(&self.shared.status);
            if status.state == ConnectionState::Disconnected {
                return;
            }
            let previous = status.state;
            status.state = ConnectionState::Disconnected;
            status.generation = status.generation.wrapping_add(1);
            previous
        };
        {
            let mut session = lock(&self.session);
            let unsent = session
                .as_ref()
                .and_then(|session| session.client.try_disconnect().err());
            if let Some(err) = unsent {
                // The driver would never see the request; tear it down here.
                debug!(error = %err, "disconnect request not queued, dropping transport");
                session.take();
            }
        }
        info!(?previous, "disconnected from broker");
        self.shared.notify(false);
    }

    fn fail_connect(&self, generation: u64) {
        if self.shared.advance(
            generation,
            ConnectionState::Connecting,
            ConnectionState::Disconnected,
        ) {
            self.shared.notify(false);
        }
    }

    fn connected_client<'a>(&self, session: &'a Option<Session>) -> Result<&'a AsyncClient> {
        if self.shared.state() != ConnectionState::Connected {
            return Err(Error::NotConnected);
        }
        session
            .as_ref()
            .map(|session| &session.client)
            .ok_or(Error::NotConnected)
    }
}

async fn await_connack(eventloop: &mut EventLoop) -> Result<()> {
    loop {
        match eventloop.poll().await? {
            Event::Incoming(Packet::ConnAck(ack)) => {
                debug!(
                    code = ?ack.code,
                    session_present = ack.session_present,
                    "broker acknowledged connection"
                );
                return Ok(());
            }
            event => trace!(?event, "broker event before acknowledgement"),
        }
    }
}

async fn drive(shared: Arc<Shared>, mut eventloop: EventLoop, generation: u64) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                trace!(
                    topic = %publish.topic,
                    len = publish.payload.len(),
                    "received broker message"
                );
                shared.deliver(generation, &publish.topic, publish.payload);
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                debug!(pkid = ack.pkid, codes = ?ack.return_codes, "subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                shared.lost(generation, &"broker closed the session");
                break;
            }
            Ok(Event::Outgoing(Outgoing::Publish(pkid))) => trace!(pkid, "message delivered"),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("disconnect sent");
                break;
            }
            Ok(event) => trace!(?event, "broker event"),
            Err(err) => {
                shared.lost(generation, &err);
                break;
            }
        }
    }
}

#[cfg(test)]
impl BrokerConnection {
    /// Mark the connection live without a transport.
    pub(crate) fn force_connected(&self) {
        lock(&self.shared.status).state = ConnectionState::Connected;
        self.shared.notify(true);
    }

    /// Feed a message as if the transport had received it.
    pub(crate) fn inject_message(&self, topic: &str, payload: &'static [u8]) {
        let generation = lock(&self.shared.status).generation;
        self.shared
            .deliver(generation, topic, Bytes::from_static(payload));
    }

    /// Report a transport failure as if the broker had dropped us.
    pub(crate) fn inject_loss(&self) {
        let generation = lock(&self.shared.status).generation;
        self.shared.lost(generation, &"injected failure");
    }
}

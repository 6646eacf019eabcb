use crate::connection::BrokerConnection;
use bytes::Bytes;
use futures_util::Stream as FutStream;
use tokio::sync::mpsc;
use tracing::trace;

/// Something the transport reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Message { topic: String, payload: Bytes },
    Connection(bool),
}

/// Queue of transport events for the task that owns the session.
///
/// Listeners run on the transport task and only enqueue; the owner drains the queue and is the
/// sole writer of session state.
pub struct Stream {
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl Stream {
    /// Route `connection`'s listeners into a new queue, replacing any listeners registered
    /// before.
    pub fn attach(connection: &BrokerConnection) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let messages = tx.clone();
        connection.set_on_message(move |topic, payload| {
            let event = Event::Message {
                topic: topic.to_string(),
                payload,
            };
            if messages.send(event).is_err() {
                trace!(topic, "event stream dropped, discarding message");
            }
        });
        connection.set_on_connection_changed(move |connected| {
            if tx.send(Event::Connection(connected)).is_err() {
                trace!(connected, "event stream dropped, discarding connection change");
            }
        });

        Self { receiver: rx }
    }

    /// Receive the next event.
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Receive the next event if one is already queued.
    pub fn try_next(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }
}

impl FutStream for Stream {
    type Item = Event;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listeners_feed_stream_in_order() {
        let connection = BrokerConnection::new();
        let mut stream = Stream::attach(&connection);

        connection.force_connected();
        connection.inject_message("result/data", br#"{"number":7,"color":"red"}"#);
        connection.inject_loss();

        assert_eq!(stream.next().await, Some(Event::Connection(true)));
        assert_eq!(
            stream.next().await,
            Some(Event::Message {
                topic: "result/data".to_string(),
                payload: Bytes::from_static(br#"{"number":7,"color":"red"}"#),
            })
        );
        assert_eq!(stream.next().await, Some(Event::Connection(false)));
        assert_eq!(stream.try_next(), None);
    }

    #[tokio::test]
    async fn test_listener_delivery_from_another_thread() {
        let connection = BrokerConnection::new();
        let mut stream = Stream::attach(&connection);
        connection.force_connected();
        assert_eq!(stream.next().await, Some(Event::Connection(true)));

        let remote = connection.clone();
        std::thread::spawn(move || remote.inject_message("result/data", b"{}"))
            .join()
            .unwrap();

        let event = stream.next().await.unwrap();
        assert!(matches!(event, Event::Message { ref topic, .. } if topic == "result/data"));
    }

    #[test]
    fn test_dropped_stream_does_not_panic_listeners() {
        let connection = BrokerConnection::new();
        drop(Stream::attach(&connection));
        connection.force_connected();
        connection.inject_message("result/data", b"{}");
        connection.disconnect();
    }
}

//! Delivery targets for host-to-UI messages

use crate::protocol::ServerMessage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Where a session's output and exit notice go
///
/// A sink turns invalid once its consumer is gone (closed channel, torn-down
/// view). The host then abandons the session.
#[cfg_attr(test, mockall::automock)]
pub trait ConsumerSink: Send {
    /// Whether the consumer can still receive messages
    fn is_valid(&self) -> bool;

    /// Hand a message to the consumer; `false` if it could not be delivered
    fn deliver(&self, message: ServerMessage) -> bool;
}

/// Sink backed by an unbounded channel
///
/// `T` is the consumer's own event type, so a UI can receive server messages
/// on the same inbox as its other events.
pub struct ChannelSink<T> {
    tx: mpsc::UnboundedSender<T>,
    surface: Option<CancellationToken>,
}

impl<T> ChannelSink<T>
where
    T: From<ServerMessage> + Send + 'static,
{
    /// Sink that stays valid while the receiver lives
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<T>) -> Self {
        Self { tx, surface: None }
    }

    /// Also invalidate the sink once `surface` is cancelled
    #[must_use]
    pub fn with_surface(mut self, surface: CancellationToken) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Box for handing to the host
    #[must_use]
    pub fn boxed(self) -> Box<dyn ConsumerSink> {
        Box::new(self)
    }
}

impl<T> ConsumerSink for ChannelSink<T>
where
    T: From<ServerMessage> + Send + 'static,
{
    fn is_valid(&self) -> bool {
        !self.tx.is_closed() && !self.surface.as_ref().is_some_and(|s| s.is_cancelled())
    }

    fn deliver(&self, message: ServerMessage) -> bool {
        self.is_valid() && self.tx.send(T::from(message)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SessionId;

    fn data(text: &str) -> ServerMessage {
        ServerMessage::Data {
            id: SessionId::from("t1"),
            data: text.to_string(),
        }
    }

    #[test]
    fn test_delivers_while_receiver_alive() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
        let sink = ChannelSink::new(tx);

        assert!(sink.is_valid());
        assert!(sink.deliver(data("hi")));
        assert_eq!(rx.try_recv().unwrap(), data("hi"));

        drop(rx);
        assert!(!sink.is_valid());
        assert!(!sink.deliver(data("lost")));
    }

    #[test]
    fn test_cancelled_surface_invalidates() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
        let surface = CancellationToken::new();
        let sink = ChannelSink::new(tx).with_surface(surface.clone());

        surface.cancel();
        assert!(!sink.is_valid());
        assert!(!sink.deliver(data("late")));
        assert!(rx.try_recv().is_err());
    }
}

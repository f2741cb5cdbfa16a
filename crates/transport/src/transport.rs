use crate::message::{ErrorReply, InboundMessage, OutboundMessage};
use crate::publish::{Acknowledgment, PublishOptions};
use crate::stream::StreamConfig;
use crate::subject::Subject;

use std::error::Error;
use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;

/// Marker trait for transport errors
pub trait TransportError: Error + Send + Sync + 'static {}

/// Marker trait for transport options
pub trait TransportOptions: Clone + Debug + Send + Sync + 'static {}

/// A connected message bus.
///
/// Clones share the same underlying connection.
#[async_trait]
pub trait Transport
where
    Self: Clone + Debug + Send + Sync + 'static,
{
    /// The error type for the transport.
    type Error: TransportError;

    /// The options used when connecting.
    type Options: TransportOptions;

    /// Stream of messages delivered to a subscription. Dropping it unsubscribes.
    type Subscription: Stream<Item = InboundMessage> + Send + Unpin + 'static;

    /// Opens a connection to the server at `address`.
    async fn connect(address: &str, options: Self::Options) -> Result<Self, Self::Error>;

    /// Publishes a message into whichever stream captures `subject`.
    ///
    /// Resolves once the stream acknowledges the message. Options are passed
    /// to the server untouched.
    async fn publish(
        &self,
        subject: &Subject,
        message: OutboundMessage,
        options: &PublishOptions,
    ) -> Result<Acknowledgment, Self::Error>;

    /// Subscribes to a subject, wildcards allowed.
    async fn subscribe(&self, subject: &Subject) -> Result<Self::Subscription, Self::Error>;

    /// Sends a response to a reply destination.
    async fn respond(&self, reply: &str, message: OutboundMessage) -> Result<(), Self::Error>;

    /// Whether [`Transport::respond_error`] delivers anything.
    fn supports_error_replies(&self) -> bool {
        false
    }

    /// Sends an explicit failure response to a reply destination.
    async fn respond_error(&self, reply: &str, error: ErrorReply) -> Result<(), Self::Error> {
        let _ = (reply, error);
        Ok(())
    }

    /// Sends a request and waits up to `timeout` for the first response.
    async fn request(
        &self,
        subject: &Subject,
        message: OutboundMessage,
        timeout: Duration,
    ) -> Result<InboundMessage, Self::Error>;

    /// Creates a stream, or returns quietly if one with the name exists.
    async fn create_stream(&self, config: StreamConfig) -> Result<(), Self::Error>;

    /// Largest payload the server will accept, when known.
    fn max_payload(&self) -> Option<usize> {
        None
    }

    /// Flushes pending messages and closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;
}

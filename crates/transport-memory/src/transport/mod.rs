mod error;

use crate::broker::MemoryBroker;
use crate::subscription::MemorySubscription;
pub use error::Error;

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use uninats_transport::{
    Acknowledgment, ErrorReply, InboundMessage, OutboundMessage, PublishOptions, StreamConfig,
    Subject, Transport, TransportOptions,
};

/// Options for the in-memory transport.
#[derive(Clone, Debug, Default)]
pub struct MemoryTransportOptions {
    /// Broker to connect through.
    pub broker: MemoryBroker,
}

impl TransportOptions for MemoryTransportOptions {}

/// A connection to a [`MemoryBroker`].
#[derive(Clone, Debug)]
pub struct MemoryTransport {
    broker: MemoryBroker,
    connection: u64,
}

impl MemoryTransport {
    /// The broker this transport is connected through.
    #[must_use]
    pub const fn broker(&self) -> &MemoryBroker {
        &self.broker
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    type Error = Error;
    type Options = MemoryTransportOptions;
    type Subscription = MemorySubscription;

    async fn connect(address: &str, options: Self::Options) -> Result<Self, Self::Error> {
        let connection = options.broker.connect(address)?;

        Ok(Self {
            broker: options.broker,
            connection,
        })
    }

    async fn publish(
        &self,
        subject: &Subject,
        message: OutboundMessage,
        options: &PublishOptions,
    ) -> Result<Acknowledgment, Self::Error> {
        if let Some(delay) = self.broker.publish_delay() {
            tokio::time::sleep(delay).await;
        }

        self.broker
            .publish(self.connection, subject, message, options)
    }

    async fn subscribe(&self, subject: &Subject) -> Result<Self::Subscription, Self::Error> {
        let (id, receiver) = self.broker.subscribe(self.connection, subject)?;

        Ok(MemorySubscription::new(id, self.broker.clone(), receiver))
    }

    async fn respond(&self, reply: &str, message: OutboundMessage) -> Result<(), Self::Error> {
        self.broker.respond(self.connection, reply, message)
    }

    fn supports_error_replies(&self) -> bool {
        self.broker.supports_error_replies()
    }

    async fn respond_error(&self, reply: &str, error: ErrorReply) -> Result<(), Self::Error> {
        if !self.supports_error_replies() {
            debug!(reply, "error replies disabled, dropping");
            return Ok(());
        }

        self.broker.respond_error(self.connection, reply, error)
    }

    async fn request(
        &self,
        subject: &Subject,
        message: OutboundMessage,
        timeout: Duration,
    ) -> Result<InboundMessage, Self::Error> {
        let (inbox, receiver) = self
            .broker
            .start_request(self.connection, subject, message)?;

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(Error::Closed),
            Err(_) => {
                self.broker.abandon_request(&inbox);
                Err(Error::TimedOut)
            }
        }
    }

    async fn create_stream(&self, config: StreamConfig) -> Result<(), Self::Error> {
        self.broker.create_stream(self.connection, config)
    }

    fn max_payload(&self) -> Option<usize> {
        self.broker.max_payload()
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.broker.close(self.connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;
    use futures::StreamExt;

    async fn connect(broker: &MemoryBroker) -> MemoryTransport {
        MemoryTransport::connect(
            "memory://test",
            MemoryTransportOptions {
                broker: broker.clone(),
            },
        )
        .await
        .unwrap()
    }

    fn subject(s: &str) -> Subject {
        Subject::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_publish_requires_stream() {
        let broker = MemoryBroker::new();
        let transport = connect(&broker).await;

        let result = transport
            .publish(
                &subject("sample.created"),
                OutboundMessage::new(Bytes::from_static(b"a")),
                &PublishOptions::default(),
            )
            .await;

        assert_eq!(
            result,
            Err(Error::NoStreamMatch("sample.created".to_string()))
        );
        assert_eq!(broker.publish_calls(), 1);
        assert!(broker.published().is_empty());
    }

    #[tokio::test]
    async fn test_publish_sequences_and_duplicates() {
        let broker = MemoryBroker::new();
        let transport = connect(&broker).await;
        transport
            .create_stream(StreamConfig::new("product_stream").subjects(["sample.>"]))
            .await
            .unwrap();

        let options = PublishOptions::new().message_id("one");
        let first = transport
            .publish(
                &subject("sample.created"),
                OutboundMessage::new(Bytes::from_static(b"a")),
                &options,
            )
            .await
            .unwrap();
        let again = transport
            .publish(
                &subject("sample.created"),
                OutboundMessage::new(Bytes::from_static(b"a")),
                &options,
            )
            .await
            .unwrap();
        let second = transport
            .publish(
                &subject("sample.updated"),
                OutboundMessage::new(Bytes::from_static(b"b")),
                &PublishOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(first.stream, "product_stream");
        assert_eq!(first.sequence, 1);
        assert!(!first.duplicate);
        assert_eq!(again.sequence, 1);
        assert!(again.duplicate);
        assert_eq!(second.sequence, 2);
    }

    #[tokio::test]
    async fn test_expected_last_sequence() {
        let broker = MemoryBroker::new();
        let transport = connect(&broker).await;
        transport
            .create_stream(StreamConfig::new("s").subjects(["a.*"]))
            .await
            .unwrap();

        let result = transport
            .publish(
                &subject("a.b"),
                OutboundMessage::default(),
                &PublishOptions::new().expected_last_sequence(7),
            )
            .await;

        assert_eq!(result, Err(Error::ExpectationFailed("sequence")));
    }

    #[tokio::test]
    async fn test_create_stream_is_idempotent() {
        let broker = MemoryBroker::new();
        let transport = connect(&broker).await;

        transport
            .create_stream(StreamConfig::new("s").subjects(["a.>"]))
            .await
            .unwrap();
        transport
            .create_stream(StreamConfig::new("s").subjects(["b.>"]))
            .await
            .unwrap();

        assert_eq!(broker.streams().len(), 1);
        assert_eq!(broker.streams()[0].subjects, vec!["a.>".to_string()]);
        assert_eq!(
            transport.create_stream(StreamConfig::new("a.b")).await,
            Err(Error::InvalidStreamName("a.b".to_string()))
        );
    }

    #[tokio::test]
    async fn test_request_round_trip() {
        let broker = MemoryBroker::new();
        let server = connect(&broker).await;
        let client = connect(&broker).await;

        let mut subscription = server.subscribe(&subject("example.*")).await.unwrap();
        let responder = tokio::spawn(async move {
            let request = subscription.next().await.unwrap();
            let reply = request.reply.unwrap();
            server
                .respond(&reply, OutboundMessage::new(Bytes::from_static(b"pong")))
                .await
                .unwrap();
        });

        let response = client
            .request(
                &subject("example.ping"),
                OutboundMessage::new(Bytes::from_static(b"ping")),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        responder.await.unwrap();
        assert_eq!(response.payload, Bytes::from_static(b"pong"));
        assert_eq!(broker.responses().len(), 1);
    }

    #[tokio::test]
    async fn test_request_without_responders() {
        let broker = MemoryBroker::new();
        let client = connect(&broker).await;

        let result = client
            .request(
                &subject("nobody.home"),
                OutboundMessage::default(),
                Duration::from_millis(50),
            )
            .await;

        assert_eq!(result, Err(Error::NoResponders));
    }

    #[tokio::test]
    async fn test_request_times_out() {
        let broker = MemoryBroker::new();
        let server = connect(&broker).await;
        let client = connect(&broker).await;
        let _subscription = server.subscribe(&subject("slow")).await.unwrap();

        let result = client
            .request(
                &subject("slow"),
                OutboundMessage::default(),
                Duration::from_millis(20),
            )
            .await;

        assert_eq!(result, Err(Error::TimedOut));
    }

    #[tokio::test]
    async fn test_error_replies_are_opt_in() {
        let broker = MemoryBroker::new();
        let transport = connect(&broker).await;
        assert!(!transport.supports_error_replies());
        transport
            .respond_error("reply.1", ErrorReply::new(500, "boom"))
            .await
            .unwrap();
        assert!(broker.error_responses().is_empty());

        let broker = MemoryBroker::new().with_error_replies();
        let transport = connect(&broker).await;
        transport
            .respond_error("reply.1", ErrorReply::new(500, "boom"))
            .await
            .unwrap();
        assert_eq!(broker.error_responses()[0].error.description, "boom");
    }

    #[tokio::test]
    async fn test_dropping_subscription_unsubscribes() {
        let broker = MemoryBroker::new();
        let transport = connect(&broker).await;

        let subscription = transport.subscribe(&subject("a.b")).await.unwrap();
        assert_eq!(broker.subscription_count("a.b"), 1);

        drop(subscription);
        assert_eq!(broker.subscription_count("a.b"), 0);
    }

    #[tokio::test]
    async fn test_close_ends_subscriptions() {
        let broker = MemoryBroker::new();
        let transport = connect(&broker).await;
        let mut subscription = transport.subscribe(&subject("a.b")).await.unwrap();

        transport.close().await.unwrap();

        assert!(subscription.next().await.is_none());
        assert_eq!(transport.close().await, Err(Error::Closed));
        assert_eq!(
            transport.subscribe(&subject("a.b")).await.err(),
            Some(Error::Closed)
        );
    }

    #[tokio::test]
    async fn test_message_ids_outlive_duplicate_window() {
        let broker = MemoryBroker::new();
        let transport = connect(&broker).await;
        let mut config = StreamConfig::new("product_stream").subjects(["sample.>"]);
        config.duplicate_window = Duration::from_millis(1);
        transport.create_stream(config).await.unwrap();

        let options = PublishOptions::new().message_id("one");
        let first = transport
            .publish(
                &subject("sample.created"),
                OutboundMessage::new(Bytes::from_static(b"a")),
                &options,
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        let again = transport
            .publish(
                &subject("sample.created"),
                OutboundMessage::new(Bytes::from_static(b"a")),
                &options,
            )
            .await
            .unwrap();

        assert_eq!(again.sequence, first.sequence);
        assert!(again.duplicate);
    }

    #[tokio::test]
    async fn test_ended_subscriptions_finish() {
        let broker = MemoryBroker::new();
        let transport = connect(&broker).await;
        let mut subscription = transport.subscribe(&subject("a.b")).await.unwrap();

        assert_eq!(broker.end_subscriptions("a.b"), 1);

        assert!(subscription.next().await.is_none());
        assert_eq!(broker.subscription_count("a.b"), 0);
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let broker = MemoryBroker::new();
        broker.refuse_connections();

        let result = MemoryTransport::connect(
            "nats://nowhere:4222",
            MemoryTransportOptions { broker },
        )
        .await;

        assert_eq!(
            result.err(),
            Some(Error::ConnectionRefused("nats://nowhere:4222".to_string()))
        );
    }
}

mod error;

use crate::subscription::{NatsSubscription, inbound, to_header_map};
pub use error::Error;

use std::path::PathBuf;
use std::time::Duration;

use async_nats::jetstream::context::Publish;
use async_nats::jetstream::stream::{Config as NatsStreamConfig, StorageType as NatsStorageType};
use async_nats::jetstream::{self, Context};
use async_nats::{Client as AsyncNatsClient, ConnectOptions, HeaderMap, Request};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};
use uninats_transport::{
    Acknowledgment, ERROR_CODE_HEADER, ERROR_HEADER, ErrorReply, InboundMessage,
    OutboundMessage, PublishOptions, StorageType, StreamConfig, Subject, Transport,
    TransportOptions,
};

/// Options for the NATS transport.
#[derive(Clone, Debug, Default)]
pub struct NatsTransportOptions {
    /// Connection name reported to the server.
    pub name: Option<String>,

    /// How long to wait for the initial connection.
    pub connection_timeout: Option<Duration>,

    /// Token authentication.
    pub token: Option<String>,

    /// User and password authentication.
    pub user_and_password: Option<(String, String)>,

    /// Path to a `.creds` file.
    pub credentials_file: Option<PathBuf>,

    /// JetStream domain to publish into.
    pub jetstream_domain: Option<String>,

    /// How long to wait for a publish acknowledgment.
    pub jetstream_timeout: Option<Duration>,

    /// Send failed requests back as `Nats-Service-Error` headers.
    pub error_replies: bool,
}

impl TransportOptions for NatsTransportOptions {}

/// A transport backed by a NATS connection.
#[derive(Clone, Debug)]
pub struct NatsTransport {
    client: AsyncNatsClient,
    jetstream: Context,
    error_replies: bool,
}

impl NatsTransport {
    /// The underlying NATS client.
    #[must_use]
    pub const fn client(&self) -> &AsyncNatsClient {
        &self.client
    }

    async fn connect_options(options: &NatsTransportOptions) -> Result<ConnectOptions, Error> {
        let mut connect_options = ConnectOptions::new();

        if let Some(name) = &options.name {
            connect_options = connect_options.name(name);
        }

        if let Some(timeout) = options.connection_timeout {
            connect_options = connect_options.connection_timeout(timeout);
        }

        if let Some(token) = &options.token {
            connect_options = connect_options.token(token.clone());
        }

        if let Some((user, password)) = &options.user_and_password {
            connect_options = connect_options.user_and_password(user.clone(), password.clone());
        }

        if let Some(path) = &options.credentials_file {
            connect_options = connect_options.credentials_file(path).await?;
        }

        Ok(connect_options)
    }
}

fn stream_config(config: StreamConfig) -> NatsStreamConfig {
    NatsStreamConfig {
        name: config.name,
        description: config.description,
        subjects: config.subjects,
        max_bytes: config.max_bytes,
        max_messages: config.max_messages,
        max_age: config.max_age,
        storage: match config.storage {
            StorageType::File => NatsStorageType::File,
            StorageType::Memory => NatsStorageType::Memory,
        },
        num_replicas: config.num_replicas,
        duplicate_window: config.duplicate_window,
        ..Default::default()
    }
}

fn build_publish(message: OutboundMessage, options: &PublishOptions) -> Publish {
    let mut headers = options.headers.clone();
    headers.extend(message.headers);

    let mut publish = Publish::build()
        .payload(message.payload)
        .headers(to_header_map(&headers));

    if let Some(id) = &options.message_id {
        publish = publish.message_id(id);
    }

    if let Some(stream) = &options.expected_stream {
        publish = publish.expected_stream(stream);
    }

    if let Some(sequence) = options.expected_last_sequence {
        publish = publish.expected_last_sequence(sequence);
    }

    if let Some(sequence) = options.expected_last_subject_sequence {
        publish = publish.expected_last_subject_sequence(sequence);
    }

    if let Some(id) = &options.expected_last_message_id {
        publish = publish.expected_last_message_id(id);
    }

    publish
}

#[async_trait]
impl Transport for NatsTransport {
    type Error = Error;
    type Options = NatsTransportOptions;
    type Subscription = NatsSubscription;

    async fn connect(address: &str, options: Self::Options) -> Result<Self, Self::Error> {
        let client = Self::connect_options(&options)
            .await?
            .connect(address)
            .await
            .map_err(|e| Error::Connect(e.kind()))?;

        let mut jetstream = match &options.jetstream_domain {
            Some(domain) => jetstream::with_domain(client.clone(), domain),
            None => jetstream::new(client.clone()),
        };

        if let Some(timeout) = options.jetstream_timeout {
            jetstream.set_timeout(timeout);
        }

        info!(address, "connected to nats");

        Ok(Self {
            client,
            jetstream,
            error_replies: options.error_replies,
        })
    }

    async fn publish(
        &self,
        subject: &Subject,
        message: OutboundMessage,
        options: &PublishOptions,
    ) -> Result<Acknowledgment, Self::Error> {
        let ack = self
            .jetstream
            .send_publish(subject.to_string(), build_publish(message, options))
            .await
            .map_err(|e| Error::Publish(e.kind()))?
            .await
            .map_err(|e| Error::Publish(e.kind()))?;

        Ok(Acknowledgment {
            stream: ack.stream,
            sequence: ack.sequence,
            domain: ack.domain,
            duplicate: ack.duplicate,
        })
    }

    async fn subscribe(&self, subject: &Subject) -> Result<Self::Subscription, Self::Error> {
        let subscriber = self.client.subscribe(subject.to_string()).await?;

        Ok(NatsSubscription::new(subscriber))
    }

    async fn respond(&self, reply: &str, message: OutboundMessage) -> Result<(), Self::Error> {
        let result = if message.headers.is_empty() {
            self.client
                .publish(reply.to_string(), message.payload)
                .await
        } else {
            self.client
                .publish_with_headers(
                    reply.to_string(),
                    to_header_map(&message.headers),
                    message.payload,
                )
                .await
        };

        result.map_err(|e| Error::Respond(e.kind()))
    }

    fn supports_error_replies(&self) -> bool {
        self.error_replies
    }

    async fn respond_error(&self, reply: &str, error: ErrorReply) -> Result<(), Self::Error> {
        if !self.error_replies {
            debug!(reply, "error replies disabled, dropping");
            return Ok(());
        }

        let mut headers = HeaderMap::new();
        headers.insert(ERROR_HEADER, error.description.as_str());
        headers.insert(ERROR_CODE_HEADER, error.code.to_string());

        self.client
            .publish_with_headers(reply.to_string(), headers, Bytes::new())
            .await
            .map_err(|e| Error::Respond(e.kind()))
    }

    async fn request(
        &self,
        subject: &Subject,
        message: OutboundMessage,
        timeout: Duration,
    ) -> Result<InboundMessage, Self::Error> {
        let mut request = Request::new()
            .payload(message.payload)
            .timeout(Some(timeout));

        if !message.headers.is_empty() {
            request = request.headers(to_header_map(&message.headers));
        }

        let response = self
            .client
            .send_request(subject.to_string(), request)
            .await
            .map_err(|e| Error::Request(e.kind()))?;

        Ok(inbound(response))
    }

    async fn create_stream(&self, config: StreamConfig) -> Result<(), Self::Error> {
        let name = config.name.clone();

        self.jetstream
            .get_or_create_stream(stream_config(config))
            .await
            .map_err(|e| Error::CreateStream(e.kind()))?;

        debug!(stream = %name, "stream ready");

        Ok(())
    }

    fn max_payload(&self) -> Option<usize> {
        Some(self.client.server_info().max_payload)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.client.drain().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use futures::StreamExt;
    use serial_test::serial;

    #[test]
    fn test_stream_config_conversion() {
        let config = StreamConfig::new("product_stream")
            .description("Sample events")
            .subjects(["sample.>"])
            .max_bytes(1024 * 1024 * 1024)
            .storage(StorageType::Memory);

        let converted = stream_config(config);

        assert_eq!(converted.name, "product_stream");
        assert_eq!(converted.description.as_deref(), Some("Sample events"));
        assert_eq!(converted.subjects, vec!["sample.>".to_string()]);
        assert_eq!(converted.max_bytes, 1024 * 1024 * 1024);
        assert_eq!(converted.max_messages, -1);
        assert_eq!(converted.storage, NatsStorageType::Memory);
    }

    async fn connect() -> NatsTransport {
        NatsTransport::connect(
            "localhost:4222",
            NatsTransportOptions {
                connection_timeout: Some(Duration::from_secs(5)),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to connect to NATS")
    }

    #[tokio::test]
    #[serial]
    #[ignore = "requires a NATS server with JetStream on localhost:4222"]
    async fn test_publish_is_acknowledged() {
        let transport = connect().await;

        transport
            .create_stream(
                StreamConfig::new("test_publish_is_acknowledged")
                    .subjects(["test_publish_is_acknowledged.>"])
                    .storage(StorageType::Memory),
            )
            .await
            .unwrap();

        let subject = Subject::new("test_publish_is_acknowledged.created").unwrap();
        let ack = transport
            .publish(
                &subject,
                OutboundMessage::new(Bytes::from_static(b"hello")),
                &PublishOptions::new().message_id("only-once"),
            )
            .await
            .unwrap();
        let again = transport
            .publish(
                &subject,
                OutboundMessage::new(Bytes::from_static(b"hello")),
                &PublishOptions::new().message_id("only-once"),
            )
            .await
            .unwrap();

        assert_eq!(ack.stream, "test_publish_is_acknowledged");
        assert!(again.duplicate);

        transport.close().await.unwrap();
    }

    #[tokio::test]
    #[serial]
    #[ignore = "requires a NATS server on localhost:4222"]
    async fn test_request_reply() {
        let transport = connect().await;
        let subject = Subject::new("test_request_reply.echo").unwrap();

        let mut subscription = transport.subscribe(&subject).await.unwrap();
        let responder = transport.clone();
        tokio::spawn(async move {
            if let Some(request) = subscription.next().await {
                let reply = request.reply.unwrap();
                responder
                    .respond(&reply, OutboundMessage::new(request.payload))
                    .await
                    .unwrap();
            }
        });

        let response = transport
            .request(
                &subject,
                OutboundMessage::new(Bytes::from_static(b"ping")),
                Duration::from_secs(2),
            )
            .await
            .unwrap();

        assert_eq!(response.payload, Bytes::from_static(b"ping"));
    }

    #[tokio::test]
    #[serial]
    #[ignore = "requires a NATS server on localhost:4222"]
    async fn test_request_without_responders() {
        let transport = connect().await;
        let subject = Subject::new("test_request_without_responders").unwrap();

        let result = transport
            .request(&subject, OutboundMessage::default(), Duration::from_secs(1))
            .await;

        assert!(matches!(
            result,
            Err(Error::Request(async_nats::RequestErrorKind::NoResponders))
        ));
    }
}

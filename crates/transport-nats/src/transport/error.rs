use thiserror::Error;
use uninats_transport::TransportError;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection could not be established.
    #[error("failed to connect: {0}")]
    Connect(async_nats::ConnectErrorKind),

    /// Credentials file could not be read.
    #[error("failed to read credentials: {0}")]
    Credentials(#[from] std::io::Error),

    /// Stream could not be created.
    #[error("failed to create stream: {0}")]
    CreateStream(async_nats::jetstream::context::CreateStreamErrorKind),

    /// Connection could not be drained.
    #[error(transparent)]
    Drain(#[from] async_nats::client::DrainError),

    /// JetStream publish failed or was not acknowledged.
    #[error("failed to publish: {0}")]
    Publish(async_nats::jetstream::context::PublishErrorKind),

    /// Request failed.
    #[error("request failed: {0}")]
    Request(async_nats::RequestErrorKind),

    /// Core publish of a response failed.
    #[error("failed to respond: {0}")]
    Respond(async_nats::client::PublishErrorKind),

    /// Subscription failed.
    #[error(transparent)]
    Subscribe(#[from] async_nats::SubscribeError),
}

impl TransportError for Error {}

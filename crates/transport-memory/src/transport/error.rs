use thiserror::Error;
use uninats_transport::TransportError;

/// Errors that can occur in this crate.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The connection was closed.
    #[error("connection closed")]
    Closed,

    /// The broker refused the connection.
    #[error("connection to {0} refused")]
    ConnectionRefused(String),

    /// A publish expectation did not hold.
    #[error("wrong last {0}")]
    ExpectationFailed(&'static str),

    /// Failure queued with [`crate::MemoryBroker::fail_next_publish`].
    #[error("injected failure: {0}")]
    Injected(String),

    /// Stream names may not contain whitespace, `.`, `*` or `>`.
    #[error("invalid stream name `{0}`")]
    InvalidStreamName(String),

    /// Payload larger than the broker accepts.
    #[error("payload of {size} bytes exceeds maximum of {max}")]
    MaxPayloadExceeded {
        /// Size of the rejected payload.
        size: usize,

        /// Configured maximum.
        max: usize,
    },

    /// Nobody was subscribed to the request subject.
    #[error("no responders")]
    NoResponders,

    /// No stream captures the subject.
    #[error("no stream matches subject `{0}`")]
    NoStreamMatch(String),

    /// No response arrived in time.
    #[error("request timed out")]
    TimedOut,
}

impl TransportError for Error {}

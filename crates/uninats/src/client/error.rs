use crate::codec::{DecodeError, EncodeError};

use std::time::Duration;

use thiserror::Error;
use uninats_transport::{SubjectError, TransportError};

/// Errors returned by [`crate::Client`] operations.
#[derive(Debug, Error)]
pub enum Error<TE>
where
    TE: TransportError,
{
    /// `connect` was called on a connected client.
    #[error("client is already connected")]
    AlreadyConnected,

    /// The caller's cancellation token fired first.
    #[error("operation cancelled")]
    Cancelled,

    /// The client has been closed.
    #[error("client is closed")]
    Closed,

    /// The transport could not connect.
    #[error("failed to connect to {address}: {source}")]
    Connection {
        /// Address that was dialled.
        address: String,

        /// Transport failure.
        #[source]
        source: TE,
    },

    /// A response could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A message could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// `connect` has not been called yet.
    #[error("client is not connected")]
    NotConnected,

    /// The responder reported a failure through the error-reply channel.
    #[error("remote error {code}: {description}")]
    Remote {
        /// Error code sent by the responder.
        code: u16,

        /// Error description sent by the responder.
        description: String,
    },

    /// The subject is not valid for the operation.
    #[error(transparent)]
    Subject(#[from] SubjectError),

    /// The operation exceeded the configured operation timeout.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The transport failed.
    #[error(transparent)]
    Transport(TE),
}

//! Abstract interface for the message bus underneath the typed dispatch layer.
//!
//! Implementations own the connection and expose byte-oriented primitives:
//! stream publishes with acknowledgments, core subscriptions, replies and
//! requests. Everything typed lives a layer above, in the `uninats` crate.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Messages flowing in and out of a transport.
pub mod message;

/// Delivery options and acknowledgments for stream publishes.
pub mod publish;

/// Stream declarations.
pub mod stream;

/// Subjects are named, dot-delimited channels for messages.
pub mod subject;

/// The transport trait itself.
pub mod transport;

pub use message::{
    ERROR_CODE_HEADER, ERROR_HEADER, ErrorReply, Headers, InboundMessage, MESSAGE_TYPE_HEADER,
    OutboundMessage,
};
pub use publish::{Acknowledgment, PublishOptions};
pub use stream::{StorageType, StreamConfig};
pub use subject::{Subject, SubjectError};
pub use transport::{Transport, TransportError, TransportOptions};

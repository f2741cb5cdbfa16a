//! In-memory implementation of the transport crate.
//!
//! A [`MemoryBroker`] stands in for the server. Every transport connected
//! through the same broker sees the same subscriptions and streams, and the
//! broker records what was published and answered so tests can inspect it.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// The shared in-process broker.
pub mod broker;

/// Subscriptions handed out by the broker.
pub mod subscription;

/// The transport implementation.
pub mod transport;

pub use broker::{MemoryBroker, PublishedMessage, RecordedErrorReply, RecordedResponse};
pub use subscription::MemorySubscription;
pub use transport::{Error, MemoryTransport, MemoryTransportOptions};

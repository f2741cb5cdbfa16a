//! NATS implementation of the transport crate.
//!
//! Publishes go through JetStream and wait for the stream's acknowledgment.
//! Subscriptions, replies and requests use core NATS.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core NATS subscriptions.
pub mod subscription;

/// The transport implementation.
pub mod transport;

pub use subscription::NatsSubscription;
pub use transport::{Error, NatsTransport, NatsTransportOptions};

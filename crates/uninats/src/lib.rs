//! Typed protobuf publish and request/reply over NATS.
//!
//! A [`Client`] owns one transport connection. Messages are protobuf values
//! implementing [`TypedMessage`]; they are encoded by the [`codec`], tagged
//! with their type name and handed to the transport. Inbound requests are
//! decoded, routed to a [`ReplyHandler`] and the response is sent back to the
//! request's reply destination.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// The typed dispatch client.
pub mod client;

/// Protobuf encoding and decoding of typed messages.
pub mod codec;

/// Client configuration.
pub mod config;

/// Faults raised while serving requests.
pub mod fault;

/// Request handlers.
pub mod handler;

/// Reply registrations and their handles.
pub mod registration;

pub use client::{Client, ClientState, Error};
pub use codec::{DecodeError, EncodeError, TypedMessage};
pub use config::ClientConfig;
pub use fault::Fault;
pub use handler::{ReplyFn, ReplyHandler, RequestContext, reply_fn};
pub use registration::SubscriptionHandle;

pub use uninats_transport::{
    Acknowledgment, PublishOptions, StorageType, StreamConfig, Subject, SubjectError, Transport,
};

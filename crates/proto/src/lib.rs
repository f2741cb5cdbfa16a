//! Protobuf messages exchanged by the uninats example programs.
//!
//! Mirrors `proto/unidrop/uninats/v1/uninats.proto`.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Version 1 of the `unidrop.uninats` package.
pub mod v1;

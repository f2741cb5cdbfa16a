use thiserror::Error;

/// Errors raised while encoding a message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// The message failed its own validation.
    #[error("invalid {type_name}: {reason}")]
    Invalid {
        /// Full protobuf name of the message type.
        type_name: String,

        /// Why validation failed.
        reason: String,
    },

    /// Protobuf encoding failed.
    #[error(transparent)]
    Protobuf(#[from] prost::EncodeError),

    /// The encoded message is larger than the transport accepts.
    #[error("encoded size {size} exceeds maximum payload {max}")]
    TooLarge {
        /// Encoded size in bytes.
        size: usize,

        /// Largest accepted payload.
        max: usize,
    },
}

/// Errors raised while decoding a message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The bytes are not a valid encoding of the requested type.
    #[error(transparent)]
    Protobuf(#[from] prost::DecodeError),

    /// The message names a different type than the one requested.
    #[error("expected {expected} but message is {actual}")]
    TypeMismatch {
        /// Requested type.
        expected: String,

        /// Type named by the message.
        actual: String,
    },
}

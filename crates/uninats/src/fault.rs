use thiserror::Error;

/// A failure while serving an inbound request.
///
/// These never reach a caller directly; they are logged and broadcast on
/// [`crate::Client::faults`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Fault {
    /// The request could not be decoded. No reply was sent.
    #[error("undecodable request on {subject}: {error}")]
    Decode {
        /// Subject the request arrived on.
        subject: String,

        /// Rendered decode error.
        error: String,
    },

    /// The response could not be encoded. No reply was sent.
    #[error("unencodable response on {subject}: {error}")]
    Encode {
        /// Subject the request arrived on.
        subject: String,

        /// Rendered encode error.
        error: String,
    },

    /// The handler failed.
    #[error("handler failed on {subject}: {error}")]
    Handler {
        /// Subject the request arrived on.
        subject: String,

        /// Rendered handler error.
        error: String,
    },

    /// The reply could not be sent.
    #[error("reply failed on {subject}: {error}")]
    Reply {
        /// Subject the request arrived on.
        subject: String,

        /// Rendered transport error.
        error: String,
    },
}

impl Fault {
    /// Subject of the request that faulted.
    #[must_use]
    pub fn subject(&self) -> &str {
        match self {
            Self::Decode { subject, .. }
            | Self::Encode { subject, .. }
            | Self::Handler { subject, .. }
            | Self::Reply { subject, .. } => subject,
        }
    }
}

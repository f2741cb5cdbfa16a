use std::collections::HashMap;

use bytes::Bytes;

/// Message headers, single-valued.
pub type Headers = HashMap<String, String>;

/// Header naming the protobuf type of the payload.
pub const MESSAGE_TYPE_HEADER: &str = "Uninats-Type";

/// Header carrying the description of a failed request.
pub const ERROR_HEADER: &str = "Nats-Service-Error";

/// Header carrying the numeric code of a failed request.
pub const ERROR_CODE_HEADER: &str = "Nats-Service-Error-Code";

/// A message delivered to a subscription or returned from a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InboundMessage {
    /// The concrete subject the message was published to.
    pub subject: String,

    /// Where a response should be sent, if the sender expects one.
    pub reply: Option<String>,

    /// Raw payload.
    pub payload: Bytes,

    /// Headers attached by the sender.
    pub headers: Headers,
}

impl InboundMessage {
    /// Looks up a header by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// A payload plus headers handed to a transport for sending.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Raw payload.
    pub payload: Bytes,

    /// Headers to attach.
    pub headers: Headers,
}

impl OutboundMessage {
    /// Creates a message without headers.
    #[must_use]
    pub fn new(payload: Bytes) -> Self {
        Self {
            payload,
            headers: Headers::new(),
        }
    }

    /// Adds a header, replacing any previous value.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// An explicit failure response, for transports with an error-reply channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorReply {
    /// Numeric error code.
    pub code: u16,

    /// Human readable description.
    pub description: String,
}

impl ErrorReply {
    /// Creates a new error reply.
    #[must_use]
    pub fn new(code: u16, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_headers_replace() {
        let message = OutboundMessage::new(Bytes::from_static(b"x"))
            .with_header(MESSAGE_TYPE_HEADER, "a.A")
            .with_header(MESSAGE_TYPE_HEADER, "b.B");

        assert_eq!(message.headers.len(), 1);
        assert_eq!(message.headers[MESSAGE_TYPE_HEADER], "b.B");
    }

    #[test]
    fn test_inbound_header_lookup() {
        let mut message = InboundMessage::default();
        message
            .headers
            .insert(ERROR_HEADER.to_string(), "boom".to_string());

        assert_eq!(message.header(ERROR_HEADER), Some("boom"));
        assert_eq!(message.header(ERROR_CODE_HEADER), None);
    }
}

use std::pin::Pin;
use std::task::{Context, Poll};

use async_nats::{HeaderMap, Message, Subscriber};
use futures::{Stream, StreamExt};
use uninats_transport::{Headers, InboundMessage};

/// A core NATS subscription.
///
/// Dropping it unsubscribes from the server.
#[derive(Debug)]
pub struct NatsSubscription {
    subscriber: Subscriber,
}

impl NatsSubscription {
    pub(crate) const fn new(subscriber: Subscriber) -> Self {
        Self { subscriber }
    }
}

impl Stream for NatsSubscription {
    type Item = InboundMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.subscriber
            .poll_next_unpin(cx)
            .map(|message| message.map(inbound))
    }
}

pub(crate) fn inbound(message: Message) -> InboundMessage {
    InboundMessage {
        subject: message.subject.to_string(),
        reply: message.reply.map(|reply| reply.to_string()),
        payload: message.payload,
        headers: message.headers.as_ref().map(from_header_map).unwrap_or_default(),
    }
}

/// Flattens NATS headers, keeping the last value of repeated names.
pub(crate) fn from_header_map(headers: &HeaderMap) -> Headers {
    headers
        .iter()
        .filter_map(|(name, values)| {
            values
                .last()
                .map(|value| (name.to_string(), value.to_string()))
        })
        .collect()
}

pub(crate) fn to_header_map(headers: &Headers) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(name.as_str(), value.as_str());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    use uninats_transport::MESSAGE_TYPE_HEADER;

    #[test]
    fn test_header_conversion() {
        let mut headers = Headers::new();
        headers.insert(
            MESSAGE_TYPE_HEADER.to_string(),
            "unidrop.uninats.v1.Event".to_string(),
        );
        headers.insert("Nats-Msg-Id".to_string(), "abc".to_string());

        let map = to_header_map(&headers);
        assert_eq!(
            map.get(MESSAGE_TYPE_HEADER).map(ToString::to_string),
            Some("unidrop.uninats.v1.Event".to_string())
        );

        assert_eq!(from_header_map(&map), headers);
    }

    #[test]
    fn test_repeated_headers_keep_last() {
        let mut map = HeaderMap::new();
        map.append("X-Thing", "first");
        map.append("X-Thing", "second");

        let headers = from_header_map(&map);
        assert_eq!(headers["X-Thing"], "second");
    }
}

use crate::broker::MemoryBroker;

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uninats_transport::InboundMessage;

/// Messages delivered by a [`MemoryBroker`] subscription.
///
/// Dropping the subscription unsubscribes. The stream ends when the owning
/// connection closes.
#[derive(Debug)]
pub struct MemorySubscription {
    id: u64,
    broker: MemoryBroker,
    receiver: UnboundedReceiverStream<InboundMessage>,
}

impl MemorySubscription {
    pub(crate) fn new(
        id: u64,
        broker: MemoryBroker,
        receiver: mpsc::UnboundedReceiver<InboundMessage>,
    ) -> Self {
        Self {
            id,
            broker,
            receiver: UnboundedReceiverStream::new(receiver),
        }
    }
}

impl Stream for MemorySubscription {
    type Item = InboundMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_next_unpin(cx)
    }
}

impl Drop for MemorySubscription {
    fn drop(&mut self) {
        self.broker.unsubscribe(self.id);
    }
}

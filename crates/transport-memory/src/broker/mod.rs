use crate::transport::Error;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};
use uninats_transport::{
    Acknowledgment, ERROR_CODE_HEADER, ERROR_HEADER, ErrorReply, Headers, InboundMessage,
    OutboundMessage, PublishOptions, StreamConfig, Subject,
};

/// A message accepted by one of the broker's streams.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Subject it was published to.
    pub subject: String,

    /// Payload and headers as handed to the transport.
    pub message: OutboundMessage,

    /// Options as handed to the transport.
    pub options: PublishOptions,

    /// Acknowledgment returned to the publisher.
    pub ack: Acknowledgment,
}

/// A response sent to a reply destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedResponse {
    /// Reply destination.
    pub reply: String,

    /// Payload and headers of the response.
    pub message: OutboundMessage,
}

/// An error reply sent to a reply destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedErrorReply {
    /// Reply destination.
    pub reply: String,

    /// The error that was sent.
    pub error: ErrorReply,
}

#[derive(Debug)]
struct SubscriptionEntry {
    id: u64,
    connection: u64,
    pattern: Subject,
    sender: mpsc::UnboundedSender<InboundMessage>,
}

#[derive(Debug)]
struct StreamState {
    config: StreamConfig,
    last_sequence: u64,
    last_message_id: Option<String>,
    subject_sequences: HashMap<String, u64>,
    message_ids: HashMap<String, u64>,
}

impl StreamState {
    fn captures(&self, subject: &str) -> bool {
        self.config
            .subjects
            .iter()
            .filter_map(|pattern| Subject::new(pattern.as_str()).ok())
            .any(|pattern| pattern.matches(subject))
    }
}

#[derive(Debug, Default)]
struct BrokerState {
    next_connection: u64,
    closed: HashSet<u64>,
    next_subscription: u64,
    subscriptions: Vec<SubscriptionEntry>,
    streams: Vec<StreamState>,
    next_inbox: u64,
    pending: HashMap<String, oneshot::Sender<InboundMessage>>,
    publish_calls: usize,
    published: Vec<PublishedMessage>,
    responses: Vec<RecordedResponse>,
    error_responses: Vec<RecordedErrorReply>,
    failures: VecDeque<Error>,
    max_payload: Option<usize>,
    publish_delay: Option<Duration>,
    error_replies: bool,
    refuse_connections: bool,
}

impl BrokerState {
    fn ensure_open(&self, connection: u64) -> Result<(), Error> {
        if self.closed.contains(&connection) {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    /// Delivers to every live subscription whose pattern matches and returns
    /// how many received the message.
    fn deliver(&mut self, message: &InboundMessage) -> usize {
        // Receivers dropped without unsubscribing are pruned here.
        self.subscriptions
            .retain(|entry| !entry.sender.is_closed());

        self.subscriptions
            .iter()
            .filter(|entry| entry.pattern.matches(&message.subject))
            .filter(|entry| entry.sender.send(message.clone()).is_ok())
            .count()
    }
}

/// An in-process stand-in for a NATS server.
///
/// Cheap to clone; clones share state.
///
/// Nothing is ever evicted: message ids are remembered for the broker's
/// lifetime (`duplicate_window` is ignored), and closed connections and
/// accepted messages are kept for inspection. Use one broker per test.
#[derive(Clone, Debug, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    /// Creates an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects payloads larger than `max` bytes.
    #[must_use]
    pub fn with_max_payload(self, max: usize) -> Self {
        self.state.lock().max_payload = Some(max);
        self
    }

    /// Enables the explicit error-reply channel.
    #[must_use]
    pub fn with_error_replies(self) -> Self {
        self.state.lock().error_replies = true;
        self
    }

    /// Holds every publish for `delay` before it reaches the broker.
    #[must_use]
    pub fn with_publish_delay(self, delay: Duration) -> Self {
        self.state.lock().publish_delay = Some(delay);
        self
    }

    /// Makes subsequent connection attempts fail.
    pub fn refuse_connections(&self) {
        self.state.lock().refuse_connections = true;
    }

    /// Queues an error returned by the next publish, whatever its subject.
    pub fn fail_next_publish(&self, error: Error) {
        self.state.lock().failures.push_back(error);
    }

    /// Delivers a raw message to matching subscriptions, bypassing streams.
    ///
    /// Returns how many subscriptions received it.
    pub fn inject(&self, message: &InboundMessage) -> usize {
        self.state.lock().deliver(message)
    }

    /// Number of publish calls that reached the broker, failed ones included.
    #[must_use]
    pub fn publish_calls(&self) -> usize {
        self.state.lock().publish_calls
    }

    /// Messages accepted by streams, in order.
    #[must_use]
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.state.lock().published.clone()
    }

    /// Responses sent so far, in order.
    #[must_use]
    pub fn responses(&self) -> Vec<RecordedResponse> {
        self.state.lock().responses.clone()
    }

    /// Error replies sent so far, in order.
    #[must_use]
    pub fn error_responses(&self) -> Vec<RecordedErrorReply> {
        self.state.lock().error_responses.clone()
    }

    /// Configurations of every stream created so far.
    #[must_use]
    pub fn streams(&self) -> Vec<StreamConfig> {
        self.state
            .lock()
            .streams
            .iter()
            .map(|stream| stream.config.clone())
            .collect()
    }

    /// Live subscriptions on an exact pattern.
    #[must_use]
    pub fn subscription_count(&self, pattern: &str) -> usize {
        self.state
            .lock()
            .subscriptions
            .iter()
            .filter(|entry| entry.pattern.as_str() == pattern && !entry.sender.is_closed())
            .count()
    }

    /// Ends every subscription on an exact pattern as if the server had
    /// dropped it. Returns how many were ended.
    pub fn end_subscriptions(&self, pattern: &str) -> usize {
        let mut state = self.state.lock();
        let before = state.subscriptions.len();
        state
            .subscriptions
            .retain(|entry| entry.pattern.as_str() != pattern);

        before - state.subscriptions.len()
    }

    pub(crate) fn connect(&self, address: &str) -> Result<u64, Error> {
        let mut state = self.state.lock();

        if state.refuse_connections {
            return Err(Error::ConnectionRefused(address.to_string()));
        }

        state.next_connection += 1;
        debug!(connection = state.next_connection, address, "memory connection opened");

        Ok(state.next_connection)
    }

    pub(crate) fn close(&self, connection: u64) -> Result<(), Error> {
        let mut state = self.state.lock();
        state.ensure_open(connection)?;

        state.closed.insert(connection);
        state
            .subscriptions
            .retain(|entry| entry.connection != connection);

        Ok(())
    }

    pub(crate) fn supports_error_replies(&self) -> bool {
        self.state.lock().error_replies
    }

    pub(crate) fn max_payload(&self) -> Option<usize> {
        self.state.lock().max_payload
    }

    pub(crate) fn publish_delay(&self) -> Option<Duration> {
        self.state.lock().publish_delay
    }

    pub(crate) fn subscribe(
        &self,
        connection: u64,
        pattern: &Subject,
    ) -> Result<(u64, mpsc::UnboundedReceiver<InboundMessage>), Error> {
        let mut state = self.state.lock();
        state.ensure_open(connection)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        state.next_subscription += 1;
        let id = state.next_subscription;

        state.subscriptions.push(SubscriptionEntry {
            id,
            connection,
            pattern: pattern.clone(),
            sender,
        });

        trace!(id, subject = %pattern, "memory subscription added");

        Ok((id, receiver))
    }

    pub(crate) fn unsubscribe(&self, id: u64) {
        self.state.lock().subscriptions.retain(|entry| entry.id != id);
    }

    pub(crate) fn publish(
        &self,
        connection: u64,
        subject: &Subject,
        message: OutboundMessage,
        options: &PublishOptions,
    ) -> Result<Acknowledgment, Error> {
        let mut state = self.state.lock();
        state.publish_calls += 1;
        state.ensure_open(connection)?;

        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }

        if let Some(max) = state.max_payload {
            if message.payload.len() > max {
                return Err(Error::MaxPayloadExceeded {
                    size: message.payload.len(),
                    max,
                });
            }
        }

        let stream = state
            .streams
            .iter_mut()
            .find(|stream| stream.captures(subject.as_str()))
            .ok_or_else(|| Error::NoStreamMatch(subject.to_string()))?;

        if let Some(expected) = &options.expected_stream {
            if *expected != stream.config.name {
                return Err(Error::ExpectationFailed("stream"));
            }
        }

        if let Some(expected) = options.expected_last_sequence {
            if expected != stream.last_sequence {
                return Err(Error::ExpectationFailed("sequence"));
            }
        }

        if let Some(expected) = options.expected_last_subject_sequence {
            let last = stream
                .subject_sequences
                .get(subject.as_str())
                .copied()
                .unwrap_or_default();
            if expected != last {
                return Err(Error::ExpectationFailed("subject sequence"));
            }
        }

        if let Some(expected) = &options.expected_last_message_id {
            if Some(expected) != stream.last_message_id.as_ref() {
                return Err(Error::ExpectationFailed("message id"));
            }
        }

        let duplicate = options
            .message_id
            .as_ref()
            .and_then(|id| stream.message_ids.get(id).copied());

        let ack = if let Some(sequence) = duplicate {
            Acknowledgment {
                stream: stream.config.name.clone(),
                sequence,
                domain: String::new(),
                duplicate: true,
            }
        } else {
            stream.last_sequence += 1;
            let sequence = stream.last_sequence;
            stream
                .subject_sequences
                .insert(subject.to_string(), sequence);
            if let Some(id) = &options.message_id {
                stream.message_ids.insert(id.clone(), sequence);
                stream.last_message_id = Some(id.clone());
            }

            Acknowledgment {
                stream: stream.config.name.clone(),
                sequence,
                domain: String::new(),
                duplicate: false,
            }
        };

        if !ack.duplicate {
            let mut headers: Headers = options.headers.clone();
            headers.extend(message.headers.clone());

            state.deliver(&InboundMessage {
                subject: subject.to_string(),
                reply: None,
                payload: message.payload.clone(),
                headers,
            });
        }

        state.published.push(PublishedMessage {
            subject: subject.to_string(),
            message,
            options: options.clone(),
            ack: ack.clone(),
        });

        Ok(ack)
    }

    pub(crate) fn respond(
        &self,
        connection: u64,
        reply: &str,
        message: OutboundMessage,
    ) -> Result<(), Error> {
        let mut state = self.state.lock();
        state.ensure_open(connection)?;

        state.responses.push(RecordedResponse {
            reply: reply.to_string(),
            message: message.clone(),
        });

        Self::route_response(&mut state, reply, message.payload, message.headers);

        Ok(())
    }

    pub(crate) fn respond_error(
        &self,
        connection: u64,
        reply: &str,
        error: ErrorReply,
    ) -> Result<(), Error> {
        let mut state = self.state.lock();
        state.ensure_open(connection)?;

        let mut headers = Headers::new();
        headers.insert(ERROR_HEADER.to_string(), error.description.clone());
        headers.insert(ERROR_CODE_HEADER.to_string(), error.code.to_string());

        state.error_responses.push(RecordedErrorReply {
            reply: reply.to_string(),
            error,
        });

        Self::route_response(&mut state, reply, Bytes::new(), headers);

        Ok(())
    }

    fn route_response(
        state: &mut BrokerState,
        reply: &str,
        payload: Bytes,
        headers: Headers,
    ) {
        let message = InboundMessage {
            subject: reply.to_string(),
            reply: None,
            payload,
            headers,
        };

        if let Some(waiter) = state.pending.remove(reply) {
            let _ = waiter.send(message.clone());
        }

        state.deliver(&message);
    }

    /// Registers a pending request and delivers it. Returns the receiver for
    /// the first response along with the inbox it will arrive on.
    pub(crate) fn start_request(
        &self,
        connection: u64,
        subject: &Subject,
        message: OutboundMessage,
    ) -> Result<(String, oneshot::Receiver<InboundMessage>), Error> {
        let mut state = self.state.lock();
        state.ensure_open(connection)?;

        if let Some(max) = state.max_payload {
            if message.payload.len() > max {
                return Err(Error::MaxPayloadExceeded {
                    size: message.payload.len(),
                    max,
                });
            }
        }

        state.next_inbox += 1;
        let inbox = format!("_INBOX.{connection}.{}", state.next_inbox);

        let (sender, receiver) = oneshot::channel();
        state.pending.insert(inbox.clone(), sender);

        let delivered = state.deliver(&InboundMessage {
            subject: subject.to_string(),
            reply: Some(inbox.clone()),
            payload: message.payload,
            headers: message.headers,
        });

        if delivered == 0 {
            state.pending.remove(&inbox);
            return Err(Error::NoResponders);
        }

        Ok((inbox, receiver))
    }

    pub(crate) fn abandon_request(&self, inbox: &str) {
        self.state.lock().pending.remove(inbox);
    }

    pub(crate) fn create_stream(&self, connection: u64, config: StreamConfig) -> Result<(), Error> {
        let mut state = self.state.lock();
        state.ensure_open(connection)?;

        if !config.has_valid_name() {
            return Err(Error::InvalidStreamName(config.name));
        }

        if state
            .streams
            .iter()
            .any(|stream| stream.config.name == config.name)
        {
            debug!(stream = %config.name, "stream already exists");
            return Ok(());
        }

        state.streams.push(StreamState {
            config,
            last_sequence: 0,
            last_message_id: None,
            subject_sequences: HashMap::new(),
            message_ids: HashMap::new(),
        });

        Ok(())
    }
}

use crate::message::Headers;

/// Delivery options for a stream publish.
///
/// These are handed to the transport as-is; the dispatch layer never reads
/// or rewrites them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Id used by the stream's duplicate window.
    pub message_id: Option<String>,

    /// Reject the publish unless it lands in this stream.
    pub expected_stream: Option<String>,

    /// Reject the publish unless the stream's last sequence matches.
    pub expected_last_sequence: Option<u64>,

    /// Reject the publish unless the subject's last sequence matches.
    pub expected_last_subject_sequence: Option<u64>,

    /// Reject the publish unless the stream's last message id matches.
    pub expected_last_message_id: Option<String>,

    /// Extra headers to attach to the message.
    pub headers: Headers,
}

impl PublishOptions {
    /// Options with nothing set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the message id used for deduplication.
    #[must_use]
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Sets the expected stream name.
    #[must_use]
    pub fn expected_stream(mut self, stream: impl Into<String>) -> Self {
        self.expected_stream = Some(stream.into());
        self
    }

    /// Sets the expected last stream sequence.
    #[must_use]
    pub const fn expected_last_sequence(mut self, sequence: u64) -> Self {
        self.expected_last_sequence = Some(sequence);
        self
    }

    /// Sets the expected last sequence for the published subject.
    #[must_use]
    pub const fn expected_last_subject_sequence(mut self, sequence: u64) -> Self {
        self.expected_last_subject_sequence = Some(sequence);
        self
    }

    /// Sets the expected last message id.
    #[must_use]
    pub fn expected_last_message_id(mut self, id: impl Into<String>) -> Self {
        self.expected_last_message_id = Some(id.into());
        self
    }

    /// Adds an extra header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Metadata reported by the transport once a publish has been accepted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Acknowledgment {
    /// Stream that stored the message.
    pub stream: String,

    /// Sequence assigned by the stream.
    pub sequence: u64,

    /// Domain the stream lives in (empty for the default domain).
    pub domain: String,

    /// Whether the stream recognised the message as a duplicate.
    pub duplicate: bool,
}

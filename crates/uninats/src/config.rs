use std::time::Duration;

/// Default server address.
pub const DEFAULT_ADDRESS: &str = "nats://localhost:4222";

/// Configuration for a [`crate::Client`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server address handed to the transport.
    pub address: String,

    /// Upper bound on any single operation. `None` waits indefinitely.
    pub operation_timeout: Option<Duration>,

    /// How long a request waits for its response.
    pub request_timeout: Duration,

    /// Faults buffered per receiver before the oldest are dropped.
    pub fault_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            operation_timeout: None,
            request_timeout: Duration::from_secs(5),
            fault_capacity: 64,
        }
    }
}

impl ClientConfig {
    /// Config for the given address with defaults otherwise.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Sets the operation timeout.
    #[must_use]
    pub const fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the fault channel capacity.
    #[must_use]
    pub const fn with_fault_capacity(mut self, capacity: usize) -> Self {
        self.fault_capacity = capacity;
        self
    }
}

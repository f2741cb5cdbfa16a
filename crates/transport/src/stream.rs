use std::time::Duration;

/// Where a stream keeps its messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StorageType {
    /// On disk.
    #[default]
    File,

    /// In server memory only.
    Memory,
}

/// Declaration of a persistent stream.
///
/// Limits of `-1` and durations of zero mean "server default".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    /// Stream name. Must not contain whitespace, `.`, `*` or `>`.
    pub name: String,

    /// Free-form description.
    pub description: Option<String>,

    /// Subjects (wildcards allowed) captured by the stream.
    pub subjects: Vec<String>,

    /// Maximum total size in bytes.
    pub max_bytes: i64,

    /// Maximum number of messages.
    pub max_messages: i64,

    /// Maximum age of a message.
    pub max_age: Duration,

    /// Storage backend.
    pub storage: StorageType,

    /// Number of replicas.
    pub num_replicas: usize,

    /// Window in which message ids are deduplicated.
    pub duplicate_window: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            subjects: Vec::new(),
            max_bytes: -1,
            max_messages: -1,
            max_age: Duration::ZERO,
            storage: StorageType::File,
            num_replicas: 1,
            duplicate_window: Duration::ZERO,
        }
    }
}

impl StreamConfig {
    /// Creates a config with the given name and server defaults otherwise.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the captured subjects.
    #[must_use]
    pub fn subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects = subjects.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the maximum total size in bytes.
    #[must_use]
    pub const fn max_bytes(mut self, max_bytes: i64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Sets the maximum number of messages.
    #[must_use]
    pub const fn max_messages(mut self, max_messages: i64) -> Self {
        self.max_messages = max_messages;
        self
    }

    /// Sets the maximum message age.
    #[must_use]
    pub const fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Sets the storage backend.
    #[must_use]
    pub const fn storage(mut self, storage: StorageType) -> Self {
        self.storage = storage;
        self
    }

    /// Whether the name is acceptable to the server.
    #[must_use]
    pub fn has_valid_name(&self) -> bool {
        !self.name.is_empty()
            && !self
                .name
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '.' | '*' | '>'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = StreamConfig::new("product_stream")
            .description("Sample events")
            .subjects(["sample.>"])
            .max_bytes(1024 * 1024 * 1024);

        assert_eq!(config.name, "product_stream");
        assert_eq!(config.subjects, vec!["sample.>".to_string()]);
        assert_eq!(config.max_messages, -1);
        assert_eq!(config.num_replicas, 1);
        assert!(config.has_valid_name());
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "has space", "dotted.name", "star*", "tail>"] {
            assert!(!StreamConfig::new(name).has_valid_name(), "{name}");
        }
    }
}

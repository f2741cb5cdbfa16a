use std::fmt::{Display, Formatter, Result as FmtResult};

use thiserror::Error;

/// Errors produced when validating a subject.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubjectError {
    /// The subject was empty.
    #[error("subject must not be empty")]
    Empty,

    /// Two dots without a segment between them, or a leading/trailing dot.
    #[error("subject `{0}` contains an empty segment")]
    EmptySegment(String),

    /// `>` used anywhere but the final segment.
    #[error("subject `{0}` uses `>` before its last segment")]
    MisplacedTail(String),

    /// Wildcard subject used where a concrete one is required.
    #[error("subject `{0}` contains wildcards and cannot be published to")]
    Wildcard(String),

    /// Whitespace is never valid in a subject.
    #[error("subject `{0}` contains whitespace")]
    Whitespace(String),
}

/// A validated, dot-delimited subject.
///
/// `*` matches exactly one segment and `>` matches one or more trailing
/// segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subject(String);

impl Subject {
    /// Validates a subject, wildcards allowed.
    ///
    /// # Errors
    ///
    /// Returns a `SubjectError` describing the first rule the subject breaks.
    pub fn new(subject: impl Into<String>) -> Result<Self, SubjectError> {
        let subject = subject.into();

        if subject.is_empty() {
            return Err(SubjectError::Empty);
        }

        if subject.chars().any(char::is_whitespace) {
            return Err(SubjectError::Whitespace(subject));
        }

        let segments: Vec<&str> = subject.split('.').collect();

        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(SubjectError::EmptySegment(subject));
        }

        if let Some(position) = segments.iter().position(|segment| *segment == ">") {
            if position != segments.len() - 1 {
                return Err(SubjectError::MisplacedTail(subject));
            }
        }

        Ok(Self(subject))
    }

    /// Validates a subject that messages can be published to.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError::Wildcard` for wildcard subjects, or any error
    /// from [`Subject::new`].
    pub fn publishable(subject: impl Into<String>) -> Result<Self, SubjectError> {
        let subject = Self::new(subject)?;

        if subject.is_wildcard() {
            return Err(SubjectError::Wildcard(subject.0));
        }

        Ok(subject)
    }

    /// Whether any segment is a wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.0
            .split('.')
            .any(|segment| segment == "*" || segment == ">")
    }

    /// Whether a concrete subject is captured by this one.
    #[must_use]
    pub fn matches(&self, subject: &str) -> bool {
        let mut pattern = self.0.split('.');
        let mut tokens = subject.split('.');

        loop {
            match (pattern.next(), tokens.next()) {
                (Some(">"), Some(_)) | (None, None) => return true,
                (Some(expected), Some(token)) if expected == "*" || expected == token => {}
                _ => return false,
            }
        }
    }

    /// The subject as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Subject {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Subject {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl From<Subject> for String {
    fn from(subject: Subject) -> Self {
        subject.0
    }
}

impl TryFrom<&str> for Subject {
    type Error = SubjectError;

    fn try_from(subject: &str) -> Result<Self, Self::Error> {
        Self::new(subject)
    }
}

impl TryFrom<String> for Subject {
    type Error = SubjectError;

    fn try_from(subject: String) -> Result<Self, Self::Error> {
        Self::new(subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_subjects() {
        for subject in ["sample", "sample.created", "sample.*", "sample.>", "*.x.>"] {
            assert!(Subject::new(subject).is_ok(), "{subject}");
        }
    }

    #[test]
    fn test_invalid_subjects() {
        assert_eq!(Subject::new(""), Err(SubjectError::Empty));
        assert!(matches!(
            Subject::new("a..b"),
            Err(SubjectError::EmptySegment(_))
        ));
        assert!(matches!(
            Subject::new(".a"),
            Err(SubjectError::EmptySegment(_))
        ));
        assert!(matches!(
            Subject::new("a b"),
            Err(SubjectError::Whitespace(_))
        ));
        assert!(matches!(
            Subject::new("a.>.b"),
            Err(SubjectError::MisplacedTail(_))
        ));
    }

    #[test]
    fn test_publishable_rejects_wildcards() {
        assert!(Subject::publishable("sample.created").is_ok());
        assert!(matches!(
            Subject::publishable("sample.*"),
            Err(SubjectError::Wildcard(_))
        ));
        assert!(matches!(
            Subject::publishable("sample.>"),
            Err(SubjectError::Wildcard(_))
        ));
    }

    #[test]
    fn test_matching() {
        let exact = Subject::new("example.say.hello").unwrap();
        assert!(exact.matches("example.say.hello"));
        assert!(!exact.matches("example.say"));
        assert!(!exact.matches("example.say.hello.again"));

        let single = Subject::new("sample.*").unwrap();
        assert!(single.matches("sample.created"));
        assert!(!single.matches("sample.created.v2"));
        assert!(!single.matches("sample"));

        let tail = Subject::new("sample.>").unwrap();
        assert!(tail.matches("sample.created"));
        assert!(tail.matches("sample.created.v2"));
        assert!(!tail.matches("sample"));
        assert!(!tail.matches("other.created"));
    }
}

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use uninats_transport::Subject;

/// Handle to a reply registration.
///
/// Dropping the handle leaves the registration running; call
/// [`SubscriptionHandle::unsubscribe`] to stop it.
#[derive(Clone, Debug)]
pub struct SubscriptionHandle {
    subject: Subject,
    id: u64,
    cancellation: CancellationToken,
}

impl SubscriptionHandle {
    pub(crate) const fn new(subject: Subject, id: u64, cancellation: CancellationToken) -> Self {
        Self {
            subject,
            id,
            cancellation,
        }
    }

    /// Subject the registration listens on.
    #[must_use]
    pub const fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Identifier distinguishing registrations on the same subject.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Whether the registration is still serving requests.
    ///
    /// False once it was unsubscribed, replaced by a newer registration on
    /// the same subject, its subscription ended, or the client closed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.cancellation.is_cancelled()
    }

    /// Stops the registration.
    ///
    /// Requests already being handled are not aborted; their
    /// [`crate::RequestContext::cancellation`] is cancelled and whatever
    /// response the handler still returns is sent.
    pub fn unsubscribe(&self) {
        self.cancellation.cancel();
    }
}

#[derive(Debug)]
pub(crate) struct Registration {
    pub(crate) id: u64,
    pub(crate) cancellation: CancellationToken,
}

/// Live registrations keyed by subject; at most one per subject.
#[derive(Debug, Default)]
pub(crate) struct RegistrationTable {
    next_id: u64,
    entries: HashMap<Subject, Registration>,
}

impl RegistrationTable {
    /// Registers `subject`, returning the new id and whatever registration
    /// it displaced.
    pub(crate) fn insert(
        &mut self,
        subject: Subject,
        cancellation: CancellationToken,
    ) -> (u64, Option<Registration>) {
        self.next_id += 1;
        let id = self.next_id;

        let replaced = self
            .entries
            .insert(subject, Registration { id, cancellation });

        (id, replaced)
    }

    /// Removes the registration for `subject` if it is still `id`.
    pub(crate) fn remove(&mut self, subject: &Subject, id: u64) {
        if self
            .entries
            .get(subject)
            .is_some_and(|registration| registration.id == id)
        {
            self.entries.remove(subject);
        }
    }

    /// Removes and returns every registration.
    pub(crate) fn clear(&mut self) -> Vec<Registration> {
        self.entries.drain().map(|(_, registration)| registration).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(s: &str) -> Subject {
        Subject::new(s).unwrap()
    }

    #[test]
    fn test_last_registration_wins() {
        let mut table = RegistrationTable::default();
        let first = CancellationToken::new();

        let (first_id, replaced) = table.insert(subject("a.b"), first.clone());
        assert!(replaced.is_none());

        let (second_id, replaced) = table.insert(subject("a.b"), CancellationToken::new());
        assert_ne!(first_id, second_id);
        assert_eq!(replaced.map(|registration| registration.id), Some(first_id));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_stale_removal_is_ignored() {
        let mut table = RegistrationTable::default();
        let (first_id, _) = table.insert(subject("a.b"), CancellationToken::new());
        let (second_id, _) = table.insert(subject("a.b"), CancellationToken::new());

        table.remove(&subject("a.b"), first_id);
        assert_eq!(table.len(), 1);

        table.remove(&subject("a.b"), second_id);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_handle_unsubscribe() {
        let token = CancellationToken::new();
        let handle = SubscriptionHandle::new(subject("a.*"), 1, token.clone());

        assert!(handle.is_active());
        handle.unsubscribe();
        assert!(!handle.is_active());
        assert!(token.is_cancelled());
    }
}

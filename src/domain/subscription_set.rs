//! Per-channel subscription bookkeeping.
//!
//! Tracks which readers are registered on a channel and which writer
//! handles exist. Writer registrations are accounting only; they do not
//! gate writes.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::SubscriptionId;
use super::reader::ChannelReader;

/// Active reader and writer registrations of one channel.
#[derive(Default)]
pub struct SubscriptionSet {
    readers: HashMap<SubscriptionId, Arc<dyn ChannelReader>>,
    writers: HashSet<SubscriptionId>,
}

impl SubscriptionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reader. Returns `false` if the id was already present,
    /// in which case the existing reader is kept.
    pub fn add_reader(&mut self, id: SubscriptionId, reader: Arc<dyn ChannelReader>) -> bool {
        if self.readers.contains_key(&id) {
            return false;
        }
        self.readers.insert(id, reader);
        true
    }

    /// Removes a reader. Returns `false` if it was not registered.
    pub fn remove_reader(&mut self, id: SubscriptionId) -> bool {
        self.readers.remove(&id).is_some()
    }

    /// Registers a writer. Returns `false` if it was already registered.
    pub fn add_writer(&mut self, id: SubscriptionId) -> bool {
        self.writers.insert(id)
    }

    /// Removes a writer. Returns `false` if it was not registered.
    pub fn remove_writer(&mut self, id: SubscriptionId) -> bool {
        self.writers.remove(&id)
    }

    /// Returns `true` if the reader id is registered.
    #[must_use]
    pub fn contains_reader(&self, id: SubscriptionId) -> bool {
        self.readers.contains_key(&id)
    }

    /// Returns `true` if the writer id is registered.
    #[must_use]
    pub fn contains_writer(&self, id: SubscriptionId) -> bool {
        self.writers.contains(&id)
    }

    /// Shared handles to every registered reader, in no particular order.
    #[must_use]
    pub fn readers(&self) -> Vec<Arc<dyn ChannelReader>> {
        self.readers.values().map(Arc::clone).collect()
    }

    /// Number of registered readers.
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    /// Number of registered writers.
    #[must_use]
    pub fn writer_count(&self) -> usize {
        self.writers.len()
    }

    /// Returns `true` if there are neither readers nor writers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readers.is_empty() && self.writers.is_empty()
    }
}

impl fmt::Debug for SubscriptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionSet")
            .field("readers", &self.readers.keys().collect::<Vec<_>>())
            .field("writers", &self.writers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reader::FnReader;

    fn noop_reader() -> Arc<dyn ChannelReader> {
        Arc::new(FnReader::new(|_, _| {}))
    }

    #[test]
    fn empty_set_has_no_subscriptions() {
        let set = SubscriptionSet::new();
        assert!(set.is_empty());
        assert_eq!(set.reader_count(), 0);
        assert_eq!(set.writer_count(), 0);
    }

    #[test]
    fn add_and_remove_reader() {
        let mut set = SubscriptionSet::new();
        let id = SubscriptionId::new();
        assert!(set.add_reader(id, noop_reader()));
        assert!(set.contains_reader(id));
        assert_eq!(set.readers().len(), 1);

        assert!(set.remove_reader(id));
        assert!(!set.contains_reader(id));
        assert!(set.is_empty());
    }

    #[test]
    fn duplicate_reader_id_is_rejected() {
        let mut set = SubscriptionSet::new();
        let id = SubscriptionId::new();
        assert!(set.add_reader(id, noop_reader()));
        assert!(!set.add_reader(id, noop_reader()));
        assert_eq!(set.reader_count(), 1);
    }

    #[test]
    fn removing_absent_subscription_is_noop() {
        let mut set = SubscriptionSet::new();
        assert!(!set.remove_reader(SubscriptionId::new()));
        assert!(!set.remove_writer(SubscriptionId::new()));
    }

    #[test]
    fn writers_are_tracked_separately() {
        let mut set = SubscriptionSet::new();
        let id = SubscriptionId::new();
        assert!(set.add_writer(id));
        assert!(!set.add_writer(id));
        assert!(set.contains_writer(id));
        assert!(!set.contains_reader(id));
        assert!(!set.is_empty());
        assert!(set.remove_writer(id));
        assert!(set.is_empty());
    }
}

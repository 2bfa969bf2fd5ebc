//! Bounded scan history and the unique-identifier set.
//!
//! Both collections are plain in-memory values. Persisting them is the
//! storage crate's job; mutating them is the scan ledger's.

use std::collections::{BTreeSet, VecDeque};

use crate::constants::DEFAULT_HISTORY_CAPACITY;
use crate::types::{CardIdentifier, ScanRecord};

/// Most-recent-first list of accepted scans with a fixed capacity.
///
/// Ordering is insertion order, not timestamp order. The two coincide only
/// while the wall clock moves forward.
///
/// # Examples
///
/// ```
/// use cardtap_core::{CardIdentifier, History, ScanRecord};
/// use chrono::Utc;
///
/// let mut history = History::with_capacity(2);
/// for uid in ["01020304", "05060708", "090A0B0C"] {
///     let id = CardIdentifier::parse(uid).unwrap();
///     history.push(ScanRecord::new(id, Utc::now()));
/// }
///
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.latest().unwrap().uid.as_str(), "090A0B0C");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    records: VecDeque<ScanRecord>,
    capacity: usize,
}

impl History {
    /// Create an empty history holding at most `capacity` records.
    ///
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuild a history from records stored newest first.
    ///
    /// Records beyond `capacity` are the oldest ones and are dropped.
    pub fn from_records(records: Vec<ScanRecord>, capacity: usize) -> Self {
        let mut history = Self::with_capacity(capacity);
        history.records.extend(records);
        history.records.truncate(history.capacity);
        history
    }

    /// Insert a record at the head, dropping the oldest on overflow.
    pub fn push(&mut self, record: ScanRecord) {
        self.records.push_front(record);
        self.records.truncate(self.capacity);
    }

    /// Remove every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Most recently inserted record.
    pub fn latest(&self) -> Option<&ScanRecord> {
        self.records.front()
    }

    /// Iterate newest first.
    pub fn iter(&self) -> impl Iterator<Item = &ScanRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy the records out, newest first.
    pub fn to_vec(&self) -> Vec<ScanRecord> {
        self.records.iter().cloned().collect()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Every identifier ever accepted.
///
/// Listing order is ascending by identifier text so that exports and
/// persisted documents are stable between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueIdentifierSet {
    ids: BTreeSet<CardIdentifier>,
}

impl UniqueIdentifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identifier, returning `true` if it was not seen before.
    pub fn insert(&mut self, id: CardIdentifier) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: &CardIdentifier) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardIdentifier> {
        self.ids.iter()
    }

    pub fn to_vec(&self) -> Vec<CardIdentifier> {
        self.ids.iter().cloned().collect()
    }
}

impl FromIterator<CardIdentifier> for UniqueIdentifierSet {
    fn from_iter<I: IntoIterator<Item = CardIdentifier>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl Extend<CardIdentifier> for UniqueIdentifierSet {
    fn extend<I: IntoIterator<Item = CardIdentifier>>(&mut self, iter: I) {
        self.ids.extend(iter);
    }
}

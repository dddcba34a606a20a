// # TTL Relation Store
//
// Many-to-many (subject, key) relation with a per-relation expiry.
//
// ## Layout
//
// - `items`: every live relation, in arbitrary order (sorted by expiry during GC)
// - `by_key`: key → subject → position in `items`
//
// `by_key` answers "all subjects of a key" and exact (subject, key) lookups;
// `items` is what the expiry sweep walks. Both always describe the same set
// of relations.
//
// ## Expiry
//
// Nothing expires on access. A relation past its expiry is still listed until
// `garbage_collect` runs with a time after it; callers choose the sweep cadence.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single (subject, key) relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationItem {
    /// Subject side (e.g. the IP in an IP→tag relation)
    pub subject: String,
    /// Key side (e.g. the tag)
    pub key: String,
    /// Absolute expiry time
    pub expiry: DateTime<Utc>,
}

/// Expiring relation store
///
/// # Example
///
/// ```rust
/// use chrono::{Duration, Utc};
/// use uid_core::TtlMap;
///
/// let now = Utc::now();
/// let mut map = TtlMap::new();
/// map.upsert("1.1.1.1", "windows", now + Duration::minutes(5));
/// map.upsert("2.2.2.2", "windows", now + Duration::minutes(60));
///
/// assert_eq!(map.list_subjects("windows").len(), 2);
///
/// map.garbage_collect(now + Duration::minutes(10));
/// assert_eq!(map.list_subjects("windows").len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TtlMap {
    items: Vec<RelationItem>,
    by_key: HashMap<String, HashMap<String, usize>>,
}

impl TtlMap {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store pre-sized for `capacity` relations
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            by_key: HashMap::with_capacity(capacity),
        }
    }

    /// Number of relations held (expired-but-not-collected included)
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert a relation, or refresh its expiry if it already exists
    ///
    /// # Returns
    ///
    /// `true` if a new relation was inserted, `false` if an existing one was refreshed
    pub fn upsert(&mut self, subject: &str, key: &str, expiry: DateTime<Utc>) -> bool {
        if let Some(&pos) = self.by_key.get(key).and_then(|s| s.get(subject)) {
            self.items[pos].expiry = expiry;
            return false;
        }

        let pos = self.items.len();
        self.items.push(RelationItem {
            subject: subject.to_string(),
            key: key.to_string(),
            expiry,
        });
        self.by_key
            .entry(key.to_string())
            .or_default()
            .insert(subject.to_string(), pos);
        true
    }

    /// Remove a relation
    ///
    /// # Returns
    ///
    /// `true` if the relation existed
    pub fn remove(&mut self, subject: &str, key: &str) -> bool {
        let Some(subjects) = self.by_key.get_mut(key) else {
            return false;
        };
        let Some(pos) = subjects.remove(subject) else {
            return false;
        };
        if subjects.is_empty() {
            self.by_key.remove(key);
        }

        self.items.swap_remove(pos);

        // The former last item now sits at `pos`
        if let Some(moved) = self.items.get(pos)
            && let Some(slot) = self
                .by_key
                .get_mut(&moved.key)
                .and_then(|s| s.get_mut(&moved.subject))
        {
            *slot = pos;
        }
        true
    }

    /// Look up a single relation
    pub fn get(&self, subject: &str, key: &str) -> Option<&RelationItem> {
        self.by_key
            .get(key)
            .and_then(|s| s.get(subject))
            .map(|&pos| &self.items[pos])
    }

    /// All subjects currently related to `key`
    ///
    /// Returns a fresh copy. Expiry is not checked here.
    pub fn list_subjects(&self, key: &str) -> BTreeSet<String> {
        self.by_key
            .get(key)
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// All keys with at least one subject
    pub fn keys(&self) -> BTreeSet<String> {
        self.by_key.keys().cloned().collect()
    }

    /// Remove every relation whose expiry is strictly before `at`
    ///
    /// # Returns
    ///
    /// Number of relations removed
    pub fn garbage_collect(&mut self, at: DateTime<Utc>) -> usize {
        self.items.sort_by(|a, b| a.expiry.cmp(&b.expiry));
        let cut = self.items.partition_point(|item| item.expiry < at);
        self.items.drain(..cut);

        // Sorting moved every item, so the index is rebuilt even when nothing was purged
        let mut by_key: HashMap<String, HashMap<String, usize>> =
            HashMap::with_capacity(self.by_key.len());
        for (pos, item) in self.items.iter().enumerate() {
            by_key
                .entry(item.key.clone())
                .or_default()
                .insert(item.subject.clone(), pos);
        }
        self.by_key = by_key;

        cut
    }

    /// Structural copy of the index: key → subject → expiry
    pub fn index_view(&self) -> BTreeMap<String, BTreeMap<String, DateTime<Utc>>> {
        self.by_key
            .iter()
            .map(|(key, subjects)| {
                let subjects = subjects
                    .iter()
                    .map(|(subject, &pos)| (subject.clone(), self.items[pos].expiry))
                    .collect();
                (key.clone(), subjects)
            })
            .collect()
    }

    /// Check that the index and the item list describe the same relations
    pub fn is_consistent(&self) -> bool {
        let indexed: usize = self.by_key.values().map(HashMap::len).sum();
        if indexed != self.items.len() {
            return false;
        }
        self.by_key.iter().all(|(key, subjects)| {
            !subjects.is_empty()
                && subjects.iter().all(|(subject, &pos)| {
                    self.items
                        .get(pos)
                        .is_some_and(|item| &item.key == key && &item.subject == subject)
                })
        })
    }
}

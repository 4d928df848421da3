//! Contributor ranking.

use std::cmp::Reverse;

use crate::store::{ContributorRecord, RecordStore};

/// One contributor in ranked position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    pub identifier: String,
    pub avatar: Option<String>,
    pub profile: Option<String>,
    pub score: usize,
    /// Position in the previously persisted order, filled in by
    /// reconciliation
    pub previous_position: Option<usize>,
}

impl RankedEntry {
    fn from_record(record: &ContributorRecord) -> Self {
        Self {
            identifier: record.identifier().to_string(),
            avatar: record.avatar().map(String::from),
            profile: record.profile().map(String::from),
            score: record.score(),
            previous_position: None,
        }
    }
}

/// Contributors in descending score order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedList {
    entries: Vec<RankedEntry>,
}

impl RankedList {
    /// Wrap entries that are already in ranked order.
    #[must_use]
    pub fn from_entries(entries: Vec<RankedEntry>) -> Self {
        Self { entries }
    }

    /// Identifiers in ranked order.
    #[must_use]
    pub fn identifiers(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.identifier.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RankedEntry> {
        self.entries.iter_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }
}

/// Rank every contributor in the store.
///
/// Descending by score; equal scores fall back to ascending identifier so
/// the order is a pure function of the store contents.
#[must_use]
pub fn rank(store: &RecordStore) -> RankedList {
    let mut entries: Vec<RankedEntry> = store.records().map(RankedEntry::from_record).collect();
    entries.sort_by(|a, b| {
        (Reverse(a.score), &a.identifier).cmp(&(Reverse(b.score), &b.identifier))
    });
    RankedList { entries }
}

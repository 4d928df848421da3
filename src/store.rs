//! In-memory contributor records for a single run.
//!
//! Every pull request and commit is owned by at most one contributor. The
//! store keeps an item → owner index per source so a second attribution of
//! the same item is either a no-op (same owner) or a rejected conflict.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Accumulated contributions of one contributor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorRecord {
    identifier: String,
    avatar: Option<String>,
    profile: Option<String>,
    pull_requests: BTreeSet<String>,
    commits: BTreeSet<String>,
}

impl ContributorRecord {
    fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            avatar: None,
            profile: None,
            pull_requests: BTreeSet::new(),
            commits: BTreeSet::new(),
        }
    }

    /// Login of the contributor.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Avatar reference from the first sighting that carried one.
    #[must_use]
    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }

    /// Profile page reference.
    #[must_use]
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Pull request identifiers attributed to this contributor.
    #[must_use]
    pub fn pull_requests(&self) -> &BTreeSet<String> {
        &self.pull_requests
    }

    /// Commit identifiers attributed to this contributor.
    #[must_use]
    pub fn commits(&self) -> &BTreeSet<String> {
        &self.commits
    }

    /// Ranking score: distinct pull requests plus distinct commits.
    #[must_use]
    pub fn score(&self) -> usize {
        self.pull_requests.len() + self.commits.len()
    }
}

/// Result of attributing one item to a contributor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    /// The item was new and is now owned by the contributor.
    Added,
    /// The item was already owned by the same contributor.
    Duplicate,
    /// The item is owned by someone else and was left there.
    Conflict { owner: String },
}

#[derive(Debug, Clone, Copy)]
enum Source {
    PullRequest,
    Commit,
}

/// Contributor records keyed by identifier.
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    records: BTreeMap<String, ContributorRecord>,
    pull_request_owners: HashMap<String, String>,
    commit_owners: HashMap<String, String>,
}

impl RecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sighting of a contributor, creating the record if needed.
    ///
    /// Avatar and profile references are set once: a later sighting only
    /// fills them in if they are still missing.
    ///
    /// # Returns
    ///
    /// `true` if the contributor was not known before.
    pub fn observe(&mut self, identifier: &str, avatar: Option<&str>, profile: Option<&str>) -> bool {
        let created = !self.records.contains_key(identifier);
        let record = self
            .records
            .entry(identifier.to_string())
            .or_insert_with(|| ContributorRecord::new(identifier));

        if record.avatar.is_none() {
            record.avatar = avatar.map(String::from);
        }
        if record.profile.is_none() {
            record.profile = profile.map(String::from);
        }
        created
    }

    /// Attribute a pull request to a contributor.
    pub fn attribute_pull_request(&mut self, identifier: &str, item: &str) -> Attribution {
        self.attribute(Source::PullRequest, identifier, item)
    }

    /// Attribute a commit to a contributor.
    pub fn attribute_commit(&mut self, identifier: &str, item: &str) -> Attribution {
        self.attribute(Source::Commit, identifier, item)
    }

    fn attribute(&mut self, source: Source, identifier: &str, item: &str) -> Attribution {
        let owners = match source {
            Source::PullRequest => &mut self.pull_request_owners,
            Source::Commit => &mut self.commit_owners,
        };

        if let Some(owner) = owners.get(item) {
            return if owner == identifier {
                Attribution::Duplicate
            } else {
                Attribution::Conflict {
                    owner: owner.clone(),
                }
            };
        }
        owners.insert(item.to_string(), identifier.to_string());

        let record = self
            .records
            .entry(identifier.to_string())
            .or_insert_with(|| ContributorRecord::new(identifier));
        let set = match source {
            Source::PullRequest => &mut record.pull_requests,
            Source::Commit => &mut record.commits,
        };
        set.insert(item.to_string());
        Attribution::Added
    }

    /// Look up a contributor.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&ContributorRecord> {
        self.records.get(identifier)
    }

    /// Iterate records in identifier order.
    pub fn records(&self) -> impl Iterator<Item = &ContributorRecord> {
        self.records.values()
    }

    /// Number of contributors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no contributor has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//! Commit attribution on top of the pull request records.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::collector::CollectReport;
use crate::error::Error;
use crate::forge::ForgeSource;
use crate::pager::{commit_pages, DEFAULT_PREFETCH};
use crate::retry::RetryConfig;
use crate::store::{Attribution, RecordStore};
use crate::types::{Commit, RepoIdentity};

/// Attributes every commit of a repository to its linked author account.
///
/// Works on an empty store as well as on one filled by
/// [`crate::collector::PullRequestCollector`]; contributors that only ever
/// committed get a fresh record.
pub struct CommitSupplementer {
    source: Arc<dyn ForgeSource>,
    retry: RetryConfig,
    prefetch: usize,
}

impl CommitSupplementer {
    /// Create a supplementer over a forge source.
    pub fn new(source: Arc<dyn ForgeSource>, retry: RetryConfig) -> Self {
        Self {
            source,
            retry,
            prefetch: DEFAULT_PREFETCH,
        }
    }

    /// Set how many pages may be fetched ahead of processing.
    #[must_use]
    pub fn with_prefetch(mut self, prefetch: usize) -> Self {
        self.prefetch = prefetch;
        self
    }

    /// Walk all commit pages and enrich `store`.
    ///
    /// # Errors
    ///
    /// Returns the first fatal fetch error. Commits without a resolvable
    /// author are never an error.
    pub async fn supplement(&self, repo: &RepoIdentity, store: &mut RecordStore) -> Result<CollectReport, Error> {
        let mut report = CollectReport::default();
        let mut pages = commit_pages(
            Arc::clone(&self.source),
            repo.clone(),
            self.retry.clone(),
            self.prefetch,
        );

        while let Some(page) = pages.next_page().await {
            let page = page?;
            report.pages += 1;
            debug!(repo = %repo, page = page.number, items = page.items.len(), "commit page");

            for commit in &page.items {
                apply_commit(store, commit, &mut report);
            }
        }

        if report.skipped > 0 {
            warn!(repo = %repo, skipped = report.skipped, "commits without a resolvable author were skipped");
        }
        info!(
            repo = %repo,
            pages = report.pages,
            commits = report.items,
            contributors = report.new_contributors,
            "supplemented commits"
        );
        Ok(report)
    }
}

fn apply_commit(store: &mut RecordStore, commit: &Commit, report: &mut CollectReport) {
    report.items += 1;
    let (Some(login), Some(author)) = (commit.author_login(), commit.author.as_ref()) else {
        debug!(sha = %commit.sha, "commit author unresolvable, skipping");
        report.skipped += 1;
        return;
    };

    if store.observe(login, author.avatar_url.as_deref(), author.html_url.as_deref()) {
        report.new_contributors += 1;
    }

    let attribution = store.attribute_commit(login, &commit.sha);
    if let Attribution::Conflict { owner } = &attribution {
        warn!(sha = %commit.sha, author = login, owner = %owner, "commit already attributed to another contributor");
    }
    report.record(&attribution);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ForgeUser;

    fn commit(sha: &str, login: Option<&str>) -> Commit {
        Commit {
            sha: sha.to_string(),
            html_url: None,
            author: login.map(ForgeUser::new),
        }
    }

    #[test]
    fn test_commit_only_contributor_gets_record() {
        let mut store = RecordStore::new();
        store.observe("alice", Some("https://a/alice"), None);
        let mut report = CollectReport::default();

        apply_commit(&mut store, &commit("aaa", Some("alice")), &mut report);
        apply_commit(&mut store, &commit("bbb", Some("dave")), &mut report);

        assert_eq!(report.new_contributors, 1);
        assert_eq!(store.get("alice").map(|r| r.commits().len()), Some(1));
        assert_eq!(store.get("dave").map(|r| r.commits().len()), Some(1));
        assert_eq!(store.get("alice").and_then(|r| r.avatar()), Some("https://a/alice"));
    }

    #[test]
    fn test_duplicate_commit_counts_once() {
        let mut store = RecordStore::new();
        let mut report = CollectReport::default();

        apply_commit(&mut store, &commit("aaa", Some("bob")), &mut report);
        apply_commit(&mut store, &commit("aaa", Some("bob")), &mut report);

        assert_eq!(report.attributed, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(store.get("bob").map(|r| r.score()), Some(1));
    }

    #[test]
    fn test_null_author_is_skipped() {
        let mut store = RecordStore::new();
        let mut report = CollectReport::default();

        apply_commit(&mut store, &commit("ccc", None), &mut report);
        apply_commit(&mut store, &commit("ddd", Some("")), &mut report);

        assert_eq!(report.skipped, 2);
        assert!(store.is_empty());
    }
}

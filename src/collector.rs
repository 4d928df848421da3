//! Pull request collection.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Error;
use crate::forge::ForgeSource;
use crate::pager::{pull_request_pages, DEFAULT_PREFETCH};
use crate::retry::RetryConfig;
use crate::store::{Attribution, RecordStore};
use crate::types::{PullRequest, RepoIdentity};

/// Counters for one walk over a paginated listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    /// Pages received
    pub pages: u32,
    /// Items seen across all pages
    pub items: usize,
    /// Items newly attributed
    pub attributed: usize,
    /// Items already attributed to the same contributor
    pub duplicates: usize,
    /// Items already attributed to a different contributor
    pub conflicts: usize,
    /// Contributors created by this walk
    pub new_contributors: usize,
    /// Items without a resolvable author
    pub skipped: usize,
}

impl CollectReport {
    pub(crate) fn record(&mut self, attribution: &Attribution) {
        match attribution {
            Attribution::Added => self.attributed += 1,
            Attribution::Duplicate => self.duplicates += 1,
            Attribution::Conflict { .. } => self.conflicts += 1,
        }
    }
}

/// Attributes every pull request of a repository to its author.
pub struct PullRequestCollector {
    source: Arc<dyn ForgeSource>,
    retry: RetryConfig,
    prefetch: usize,
}

impl PullRequestCollector {
    /// Create a collector over a forge source.
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

    /// Walk all pull request pages and fill `store`.
    ///
    /// Running this twice over the same data leaves the store unchanged the
    /// second time.
    ///
    /// # Errors
    ///
    /// Returns the first fatal fetch error; the store may then hold a
    /// partial result and must not be used for persistence.
    pub async fn collect(&self, repo: &RepoIdentity, store: &mut RecordStore) -> Result<CollectReport, Error> {
        let mut report = CollectReport::default();
        let mut pages = pull_request_pages(
            Arc::clone(&self.source),
            repo.clone(),
            self.retry.clone(),
            self.prefetch,
        );

        while let Some(page) = pages.next_page().await {
            let page = page?;
            report.pages += 1;
            debug!(repo = %repo, page = page.number, items = page.items.len(), "pull request page");

            for pull in &page.items {
                apply_pull_request(store, pull, &mut report);
            }
        }

        info!(
            repo = %repo,
            pages = report.pages,
            pull_requests = report.items,
            contributors = report.new_contributors,
            "collected pull requests"
        );
        Ok(report)
    }
}

fn apply_pull_request(store: &mut RecordStore, pull: &PullRequest, report: &mut CollectReport) {
    report.items += 1;
    let Some(author) = pull.user.as_ref().filter(|u| !u.login.is_empty()) else {
        warn!(pull_request = pull.number, "pull request has no author account, skipping");
        report.skipped += 1;
        return;
    };

    if store.observe(&author.login, author.avatar_url.as_deref(), author.html_url.as_deref()) {
        report.new_contributors += 1;
    }

    let attribution = store.attribute_pull_request(&author.login, &pull.item_id());
    if let Attribution::Conflict { owner } = &attribution {
        warn!(
            pull_request = pull.number,
            author = %author.login,
            owner = %owner,
            "pull request already attributed to another contributor"
        );
    }
    report.record(&attribution);
}

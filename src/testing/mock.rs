//! Scripted forge source for testing.
//!
//! Provides a `MockForge` that serves pre-built pages and injected failures
//! through the same `ForgeSource` trait the REST client implements.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Error, ForgeError};
use crate::forge::{Avatar, ForgeSource};
use crate::types::{Commit, ForgeUser, Page, PullRequest, RepoIdentity};

/// Record of a method call.
#[derive(Debug, Clone)]
pub struct MockCall {
    /// Method name (e.g., "pulls.page", "commits.page")
    pub method: String,
    /// Arguments passed to the method
    pub args: Vec<String>,
    /// Timestamp of the call
    pub timestamp: DateTime<Utc>,
}

impl MockCall {
    /// Create a new mock call record.
    pub fn new(method: &str, args: Vec<String>) -> Self {
        Self {
            method: method.to_string(),
            args,
            timestamp: Utc::now(),
        }
    }
}

/// Which listing a scripted page or failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    Pulls,
    Commits,
}

impl Feed {
    fn method(self) -> &'static str {
        match self {
            Self::Pulls => "pulls.page",
            Self::Commits => "commits.page",
        }
    }
}

#[derive(Default)]
struct MockState {
    calls: Vec<MockCall>,
    failures: HashMap<(Feed, u32), VecDeque<ForgeError>>,
}

/// Mock forge for testing.
#[derive(Default)]
pub struct MockForge {
    pulls: Vec<Page<PullRequest>>,
    commits: Vec<Page<Commit>>,
    avatars: HashMap<String, Avatar>,
    avatar_failures: Vec<String>,
    state: Mutex<MockState>,
}

impl MockForge {
    /// Create a mock with no data: both listings are a single empty page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `pages` of pull requests, chained 1 → 2 → … → end.
    #[must_use]
    pub fn with_pull_pages(mut self, pages: Vec<Vec<PullRequest>>) -> Self {
        self.pulls = chain(pages);
        self
    }

    /// Serve `pages` of commits, chained 1 → 2 → … → end.
    #[must_use]
    pub fn with_commit_pages(mut self, pages: Vec<Vec<Commit>>) -> Self {
        self.commits = chain(pages);
        self
    }

    /// Serve an avatar for `url`.
    #[must_use]
    pub fn with_avatar(mut self, url: &str, avatar: Avatar) -> Self {
        self.avatars.insert(url.to_string(), avatar);
        self
    }

    /// Make every download of `url` fail.
    #[must_use]
    pub fn with_failing_avatar(mut self, url: &str) -> Self {
        self.avatar_failures.push(url.to_string());
        self
    }

    /// Fail the next `times` requests for `page` of `feed` with `error`.
    #[must_use]
    pub fn failing(self, feed: Feed, page: u32, error: ForgeError, times: usize) -> Self {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let queue = state.failures.entry((feed, page)).or_default();
            queue.extend(std::iter::repeat(error).take(times));
        }
        self
    }

    /// Get all recorded calls.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).calls.clone()
    }

    /// Count calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    fn record(&self, feed: Feed, repo: &RepoIdentity, page: u32) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .calls
            .push(MockCall::new(feed.method(), vec![repo.full_name(), page.to_string()]));

        match state.failures.get_mut(&(feed, page)).and_then(VecDeque::pop_front) {
            Some(error) => Err(Error::Forge(error)),
            None => Ok(()),
        }
    }
}

fn chain<T>(pages: Vec<Vec<T>>) -> Vec<Page<T>> {
    let total = u32::try_from(pages.len()).unwrap_or(u32::MAX);
    pages
        .into_iter()
        .zip(1..)
        .map(|(items, number)| {
            let next = (number < total).then_some(number + 1);
            Page::new(number, items, next)
        })
        .collect()
}

fn serve<T: Clone>(pages: &[Page<T>], number: u32) -> Page<T> {
    pages
        .iter()
        .find(|p| p.number == number)
        .cloned()
        .unwrap_or_else(|| Page::new(number, Vec::new(), None))
}

#[async_trait]
impl ForgeSource for MockForge {
    async fn pull_requests_page(
        &self,
        repo: &RepoIdentity,
        page: u32,
    ) -> Result<Page<PullRequest>, Error> {
        self.record(Feed::Pulls, repo, page)?;
        Ok(serve(&self.pulls, page))
    }

    async fn commits_page(&self, repo: &RepoIdentity, page: u32) -> Result<Page<Commit>, Error> {
        self.record(Feed::Commits, repo, page)?;
        Ok(serve(&self.commits, page))
    }

    async fn avatar(&self, url: &str, size: u32) -> Result<Avatar, Error> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .push(MockCall::new("avatars.fetch", vec![url.to_string(), size.to_string()]));

        if self.avatar_failures.iter().any(|u| u == url) {
            return Err(Error::Forge(ForgeError::Unexpected {
                status: 404,
                message: format!("no avatar at {url}"),
            }));
        }
        Ok(self.avatars.get(url).cloned().unwrap_or_else(|| Avatar {
            content_type: "image/png".to_string(),
            bytes: url.as_bytes().to_vec(),
        }))
    }
}

/// Pull request fixture authored by `login`, or by a deleted account.
pub fn pull_request(number: u64, login: Option<&str>) -> PullRequest {
    PullRequest {
        number,
        html_url: None,
        state: Some("closed".to_string()),
        user: login.map(|l| ForgeUser::new(l).with_avatar(&format!("https://avatars.test/{l}"))),
    }
}

/// Commit fixture linked to `login`, or to no account.
pub fn commit(sha: &str, login: Option<&str>) -> Commit {
    Commit {
        sha: sha.to_string(),
        html_url: None,
        author: login.map(|l| ForgeUser::new(l).with_avatar(&format!("https://avatars.test/{l}"))),
    }
}

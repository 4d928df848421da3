//! Lazy page sequences with one-page lookahead.
//!
//! A producer task walks the pages of a listing, applying the retry policy
//! to each page, and hands them over a bounded channel. The consumer is the
//! only task that touches the record store, so store mutation stays serial
//! while page N+1 is already in flight.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::Error;
use crate::forge::ForgeSource;
use crate::retry::{with_retry, RetryConfig};
use crate::types::{Commit, Page, PullRequest, RepoIdentity};

/// Default number of pages fetched ahead of the consumer.
pub const DEFAULT_PREFETCH: usize = 1;

/// A stream of pages fed by a background fetch task.
///
/// Yields pages in order until the forge signals end-of-data, then `None`.
/// A fetch failure, or the producer task dying, is yielded once as `Err` and
/// ends the stream. Dropping the stream stops the producer after its
/// in-flight request.
pub struct PageStream<T> {
    label: &'static str,
    rx: mpsc::Receiver<Result<Page<T>, Error>>,
    producer: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> PageStream<T> {
    /// Start fetching pages from page 1.
    ///
    /// `fetch` performs a single attempt for one page number; it is wrapped
    /// in [`with_retry`] using `retry`.
    pub fn spawn<F, Fut>(label: &'static str, retry: RetryConfig, prefetch: usize, fetch: F) -> Self
    where
        F: Fn(u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Page<T>, Error>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(prefetch.max(1));

        let producer = tokio::spawn(async move {
            let mut page = 1;
            loop {
                let request = format!("{label} page {page}");
                let result = with_retry(&retry, &request, || fetch(page)).await;

                let next = match &result {
                    Ok(fetched) => fetched.next,
                    Err(_) => None,
                };
                let failed = result.is_err();
                if tx.send(result).await.is_err() {
                    debug!(label, page, "page consumer dropped, stopping");
                    return;
                }
                if failed {
                    return;
                }

                match next {
                    None => return,
                    Some(n) if n <= page => {
                        let _ = tx
                            .send(Err(Error::Pagination(format!(
                                "{label} page {page} points back to page {n}"
                            ))))
                            .await;
                        return;
                    }
                    Some(n) => page = n,
                }
            }
        });

        Self {
            label,
            rx,
            producer: Some(producer),
        }
    }

    /// Receive the next page.
    ///
    /// Once the channel closes, the producer is joined so that a crashed
    /// fetch task surfaces as an error instead of a silent end-of-data.
    pub async fn next_page(&mut self) -> Option<Result<Page<T>, Error>> {
        if let Some(result) = self.rx.recv().await {
            return Some(result);
        }
        match self.producer.take()?.await {
            Ok(()) => None,
            Err(e) => Some(Err(Error::Pagination(format!(
                "{} fetch task stopped: {e}",
                self.label
            )))),
        }
    }
}

impl<T> Drop for PageStream<T> {
    fn drop(&mut self) {
        if let Some(producer) = &self.producer {
            producer.abort();
        }
    }
}

/// Stream every pull request page of a repository.
pub fn pull_request_pages(
    source: Arc<dyn ForgeSource>,
    repo: RepoIdentity,
    retry: RetryConfig,
    prefetch: usize,
) -> PageStream<PullRequest> {
    let repo = Arc::new(repo);
    PageStream::spawn("pull requests", retry, prefetch, move |page| {
        let source = Arc::clone(&source);
        let repo = Arc::clone(&repo);
        async move { source.pull_requests_page(&repo, page).await }
    })
}

/// Stream every commit page of a repository.
pub fn commit_pages(
    source: Arc<dyn ForgeSource>,
    repo: RepoIdentity,
    retry: RetryConfig,
    prefetch: usize,
) -> PageStream<Commit> {
    let repo = Arc::new(repo);
    PageStream::spawn("commits", retry, prefetch, move |page| {
        let source = Arc::clone(&source);
        let repo = Arc::clone(&repo);
        async move { source.commits_page(&repo, page).await }
    })
}

//! Inlining of avatar images into the ranked list.
//!
//! Remote images inside an SVG are blocked by many markdown renderers, so
//! each avatar URL is swapped for a `data:` URI before rendering. A failed
//! download leaves that entry's URL in place.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::forge::ForgeSource;
use crate::ranker::RankedList;
use crate::retry::{with_retry, RetryConfig};

/// Concurrent avatar downloads.
pub const DEFAULT_AVATAR_CONCURRENCY: usize = 8;

/// Outcome of an embedding pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedReport {
    pub embedded: usize,
    pub failed: usize,
}

/// Replace remote avatar references in `ranked` with inline data URIs.
pub async fn embed_avatars(
    source: Arc<dyn ForgeSource>,
    ranked: &mut RankedList,
    size: u32,
    retry: &RetryConfig,
    concurrency: usize,
) -> EmbedReport {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, entry) in ranked.iter().enumerate() {
        let Some(url) = entry.avatar.clone().filter(|u| !u.starts_with("data:")) else {
            continue;
        };
        let source = Arc::clone(&source);
        let permits = Arc::clone(&permits);
        let retry = retry.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let label = format!("avatar {url}");
            let result = with_retry(&retry, &label, || source.avatar(&url, size)).await;
            (index, url, result)
        });
    }

    let mut report = EmbedReport::default();
    let mut inlined = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, _, Ok(avatar))) => {
                inlined.insert(index, avatar.to_data_uri());
                report.embedded += 1;
            }
            Ok((_, url, Err(e))) => {
                warn!(%url, error = %e, "avatar download failed, keeping remote reference");
                report.failed += 1;
            }
            Err(e) => {
                warn!(error = %e, "avatar task aborted");
                report.failed += 1;
            }
        }
    }

    for (index, entry) in ranked.iter_mut().enumerate() {
        if let Some(uri) = inlined.remove(&index) {
            entry.avatar = Some(uri);
        }
    }

    debug!(embedded = report.embedded, failed = report.failed, "embedded avatars");
    report
}

//! End-to-end roster generation for one repository.
//!
//! Stages run strictly in sequence. Any failure before `persist` leaves the
//! saved order untouched; a `persist` failure is reported after the image
//! has already been written.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::artifact::{ArtifactSink, FileArtifactSink};
use crate::avatars::{embed_avatars, EmbedReport, DEFAULT_AVATAR_CONCURRENCY};
use crate::client::ForgeClient;
use crate::collector::{CollectReport, PullRequestCollector};
use crate::config::Config;
use crate::error::Error;
use crate::forge::ForgeSource;
use crate::pager::DEFAULT_PREFETCH;
use crate::persistence::{FileOrderStore, OrderStore, Reconciler, Reconciliation};
use crate::ranker::rank;
use crate::render::{LayoutConfig, Renderer, SvgRenderer};
use crate::retry::RetryConfig;
use crate::store::RecordStore;
use crate::supplementer::CommitSupplementer;
use crate::types::RepoIdentity;

/// Pipeline stage, used to report where a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Collect,
    Supplement,
    Render,
    Write,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Collect => "collect pull requests",
            Self::Supplement => "supplement commits",
            Self::Render => "render image",
            Self::Write => "write image",
            Self::Persist => "persist order",
        };
        f.write_str(name)
    }
}

/// A failed run and the stage it failed in.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct RunError {
    pub stage: Stage,
    #[source]
    pub source: Error,
}

impl RunError {
    fn at(stage: Stage) -> impl FnOnce(Error) -> Self {
        move |source| Self { stage, source }
    }
}

/// Tunables of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub retry: RetryConfig,
    pub layout: LayoutConfig,
    pub embed_avatars: bool,
    pub skip_unchanged: bool,
    pub prefetch: usize,
    pub avatar_concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            layout: LayoutConfig::default(),
            embed_avatars: true,
            skip_unchanged: false,
            prefetch: DEFAULT_PREFETCH,
            avatar_concurrency: DEFAULT_AVATAR_CONCURRENCY,
        }
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            retry: config.retry.clone(),
            layout: config.layout,
            embed_avatars: config.embed_avatars,
            skip_unchanged: config.skip_unchanged,
            ..Default::default()
        }
    }
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Image written and order persisted.
    Rendered {
        path: PathBuf,
        reconciliation: Reconciliation,
    },
    /// Ranking matches the persisted order and the stored image is current;
    /// nothing written.
    Unchanged,
    /// The repository has no attributable contributors; nothing written.
    Empty,
}

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub repo: RepoIdentity,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub contributors: usize,
    pub pulls: CollectReport,
    pub commits: CollectReport,
    pub avatars: EmbedReport,
    pub outcome: RunOutcome,
}

/// Collect → supplement → rank → reconcile → render → write → persist.
pub struct RosterPipeline {
    source: Arc<dyn ForgeSource>,
    reconciler: Reconciler,
    renderer: Box<dyn Renderer>,
    sink: Box<dyn ArtifactSink>,
    settings: PipelineSettings,
}

impl RosterPipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        source: Arc<dyn ForgeSource>,
        orders: Arc<dyn OrderStore>,
        renderer: Box<dyn Renderer>,
        sink: Box<dyn ArtifactSink>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            reconciler: Reconciler::new(orders),
            renderer,
            sink,
            settings,
        }
    }

    /// Production wiring: REST client, file state, SVG output.
    ///
    /// # Errors
    ///
    /// Returns an error if the forge client cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let client = ForgeClient::from_config(config)?;
        Ok(Self::new(
            Arc::new(client),
            Arc::new(FileOrderStore::new(&config.state_dir)),
            Box::new(SvgRenderer),
            Box::new(FileArtifactSink::new(&config.output_dir)),
            PipelineSettings::from_config(config),
        ))
    }

    /// Run every stage for `repo`.
    ///
    /// # Errors
    ///
    /// Returns a `RunError` naming the failed stage.
    pub async fn run(&self, repo: &RepoIdentity) -> Result<RunSummary, RunError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(repo = %repo, "building contributor roster");

        let mut store = RecordStore::new();
        let pulls = PullRequestCollector::new(Arc::clone(&self.source), self.settings.retry.clone())
            .with_prefetch(self.settings.prefetch)
            .collect(repo, &mut store)
            .await
            .map_err(RunError::at(Stage::Collect))?;

        let commits = CommitSupplementer::new(Arc::clone(&self.source), self.settings.retry.clone())
            .with_prefetch(self.settings.prefetch)
            .supplement(repo, &mut store)
            .await
            .map_err(RunError::at(Stage::Supplement))?;

        let mut ranked = rank(&store);
        info!(repo = %repo, contributors = ranked.len(), "ranked contributors");

        let summary = |avatars: EmbedReport, outcome: RunOutcome| RunSummary {
            repo: repo.clone(),
            started_at,
            elapsed: clock.elapsed(),
            contributors: store.len(),
            pulls: pulls.clone(),
            commits: commits.clone(),
            avatars,
            outcome,
        };

        if ranked.is_empty() {
            warn!(repo = %repo, "no contributors found, nothing to render");
            return Ok(summary(EmbedReport::default(), RunOutcome::Empty));
        }

        let previous = self.reconciler.load(repo);
        let reconciliation = self.reconciler.reconcile(previous.as_ref(), &mut ranked);
        if reconciliation.is_unchanged() && self.settings.skip_unchanged && self.artifact_is_current(repo) {
            info!(repo = %repo, "contributor order unchanged, skipping render");
            return Ok(summary(EmbedReport::default(), RunOutcome::Unchanged));
        }
        info!(
            repo = %repo,
            first_run = reconciliation.is_first_run(),
            added = reconciliation.added.len(),
            removed = reconciliation.removed.len(),
            moved = reconciliation.moved.len(),
            "reconciled against persisted order"
        );

        let avatars = if self.settings.embed_avatars {
            embed_avatars(
                Arc::clone(&self.source),
                &mut ranked,
                self.settings.layout.block_size,
                &self.settings.retry,
                self.settings.avatar_concurrency,
            )
            .await
        } else {
            EmbedReport::default()
        };

        let image = self
            .renderer
            .render(&ranked, &self.settings.layout)
            .map_err(RunError::at(Stage::Render))?;
        let path = self
            .sink
            .write(&repo.key(), &image)
            .map_err(RunError::at(Stage::Write))?;

        self.reconciler
            .commit(repo, &ranked)
            .map_err(|e| RunError::at(Stage::Persist)(Error::from(e)))?;

        let done = summary(avatars, RunOutcome::Rendered { path, reconciliation });
        info!(repo = %repo, "Time cost: {}s", done.elapsed.as_secs_f64().round());
        Ok(done)
    }

    /// Whether the stored image exists and was rendered with the current layout.
    fn artifact_is_current(&self, repo: &RepoIdentity) -> bool {
        match self.sink.read(&repo.key()) {
            Ok(Some(artifact)) => self.renderer.is_current(&artifact, &self.settings.layout),
            Ok(None) => false,
            Err(e) => {
                warn!(repo = %repo, error = %e, "existing image unreadable, rendering again");
                false
            }
        }
    }
}

//! End-to-end pipeline tests against the scripted forge.

use std::sync::Arc;
use std::time::Duration;

use contrib_wall::testing::{commit, pull_request, Feed, MockForge};
use contrib_wall::{
    CommitSupplementer, Error, ForgeError, LayoutConfig, MemoryArtifactSink, MemoryOrderStore,
    OrderStore, PipelineSettings, PullRequestCollector, RankedList, RecordStore, Renderer,
    RepoIdentity, RetryConfig, RosterPipeline, RunOutcome, Stage, SvgRenderer,
};

fn repo() -> RepoIdentity {
    RepoIdentity::new("octo", "wall").expect("valid identity")
}

fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        initial_backoff: Duration::from_millis(1),
        jitter: 0.0,
        attempt_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        retry: fast_retry(2),
        embed_avatars: false,
        ..Default::default()
    }
}

/// alice: 3 pull requests, 2 commits; bob: 2 pull requests, 3 commits.
fn tied_forge() -> MockForge {
    MockForge::new()
        .with_pull_pages(vec![
            vec![
                pull_request(1, Some("alice")),
                pull_request(2, Some("bob")),
                pull_request(3, Some("alice")),
            ],
            vec![pull_request(4, Some("bob")), pull_request(5, Some("alice"))],
        ])
        .with_commit_pages(vec![
            vec![commit("a1", Some("alice")), commit("b1", Some("bob"))],
            vec![
                commit("a2", Some("alice")),
                commit("b2", Some("bob")),
                commit("b3", Some("bob")),
            ],
        ])
}

struct Harness {
    forge: Arc<MockForge>,
    orders: MemoryOrderStore,
    sink: MemoryArtifactSink,
}

impl Harness {
    fn new(forge: MockForge) -> Self {
        Self {
            forge: Arc::new(forge),
            orders: MemoryOrderStore::new(),
            sink: MemoryArtifactSink::new(),
        }
    }

    fn pipeline(&self, settings: PipelineSettings) -> RosterPipeline {
        self.pipeline_with(settings, Box::new(SvgRenderer), Arc::new(self.orders.clone()))
    }

    fn pipeline_with(
        &self,
        settings: PipelineSettings,
        renderer: Box<dyn Renderer>,
        orders: Arc<dyn OrderStore>,
    ) -> RosterPipeline {
        RosterPipeline::new(
            Arc::clone(&self.forge) as Arc<dyn contrib_wall::ForgeSource>,
            orders,
            renderer,
            Box::new(self.sink.clone()),
            settings,
        )
    }

    fn saved(&self) -> Option<Vec<String>> {
        self.orders.get("octo_wall")
    }

    fn svg(&self) -> Option<String> {
        self.sink
            .get("octo_wall")
            .map(|bytes| String::from_utf8(bytes).expect("utf-8 svg"))
    }
}

struct FailingRenderer;

impl Renderer for FailingRenderer {
    fn render(&self, _ranked: &RankedList, _layout: &LayoutConfig) -> Result<Vec<u8>, Error> {
        Err(Error::Render("canvas exploded".to_string()))
    }
}

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn test_first_run_renders_and_persists() {
        let harness = Harness::new(tied_forge());

        let summary = harness
            .pipeline(settings())
            .run(&repo())
            .await
            .expect("run succeeds");

        assert_eq!(summary.contributors, 2);
        assert_eq!(summary.pulls.items, 5);
        assert_eq!(summary.commits.items, 5);
        match &summary.outcome {
            RunOutcome::Rendered { reconciliation, .. } => {
                assert!(reconciliation.is_first_run());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(
            harness.saved(),
            Some(vec!["alice".to_string(), "bob".to_string()])
        );
        let svg = harness.svg().expect("image written");
        assert!(svg.find("alice") < svg.find("bob"));
    }

    #[tokio::test]
    async fn test_null_author_commit_is_skipped() {
        let forge = MockForge::new()
            .with_pull_pages(vec![vec![pull_request(1, Some("alice"))]])
            .with_commit_pages(vec![vec![
                commit("a1", Some("alice")),
                commit("ghost", None),
                commit("d1", Some("dave")),
            ]]);
        let harness = Harness::new(forge);

        let summary = harness
            .pipeline(settings())
            .run(&repo())
            .await
            .expect("run succeeds");

        assert_eq!(summary.commits.skipped, 1);
        assert_eq!(summary.commits.new_contributors, 1);
        assert_eq!(
            harness.saved(),
            Some(vec!["alice".to_string(), "dave".to_string()])
        );
    }

    fn skipping() -> PipelineSettings {
        PipelineSettings {
            skip_unchanged: true,
            ..settings()
        }
    }

    #[tokio::test]
    async fn test_unchanged_order_skips_render() {
        let harness = Harness::new(tied_forge());
        let first = harness
            .pipeline(skipping())
            .run(&repo())
            .await
            .expect("first run succeeds");
        assert!(matches!(first.outcome, RunOutcome::Rendered { .. }));
        let image = harness.svg().expect("image written");

        let second = harness
            .pipeline(skipping())
            .run(&repo())
            .await
            .expect("second run succeeds");

        assert_eq!(second.outcome, RunOutcome::Unchanged);
        assert_eq!(harness.svg(), Some(image));
    }

    #[tokio::test]
    async fn test_unchanged_order_with_missing_image_renders() {
        let harness = Harness::new(tied_forge());
        harness.orders.insert(
            "octo_wall",
            vec!["alice".to_string(), "bob".to_string()],
        );

        let summary = harness
            .pipeline(skipping())
            .run(&repo())
            .await
            .expect("run succeeds");

        assert!(matches!(summary.outcome, RunOutcome::Rendered { .. }));
        assert!(harness.svg().is_some());
    }

    #[tokio::test]
    async fn test_layout_change_renders_unchanged_order() {
        let harness = Harness::new(tied_forge());
        let wide = PipelineSettings {
            layout: LayoutConfig::new(1000, 120, 8).expect("valid layout"),
            ..skipping()
        };
        harness
            .pipeline(wide)
            .run(&repo())
            .await
            .expect("first run succeeds");

        let narrow = PipelineSettings {
            layout: LayoutConfig::new(400, 120, 3).expect("valid layout"),
            ..skipping()
        };
        let summary = harness
            .pipeline(narrow)
            .run(&repo())
            .await
            .expect("second run succeeds");

        let RunOutcome::Rendered { reconciliation, .. } = summary.outcome else {
            panic!("expected a render");
        };
        assert!(reconciliation.is_unchanged());
        let svg = harness.svg().expect("image written");
        assert!(svg.contains(r#"width="400""#));
        assert!(!svg.contains(r#"width="1000""#));
    }

    #[tokio::test]
    async fn test_unchanged_order_renders_by_default() {
        let harness = Harness::new(tied_forge());
        for _ in 0..2 {
            let summary = harness
                .pipeline(settings())
                .run(&repo())
                .await
                .expect("run succeeds");
            assert!(matches!(summary.outcome, RunOutcome::Rendered { .. }));
        }
    }

    #[tokio::test]
    async fn test_reordered_contributors_are_reported() {
        let harness = Harness::new(tied_forge());
        harness.orders.insert(
            "octo_wall",
            vec!["bob".to_string(), "carol".to_string(), "alice".to_string()],
        );

        let summary = harness
            .pipeline(settings())
            .run(&repo())
            .await
            .expect("run succeeds");

        let RunOutcome::Rendered { reconciliation, .. } = summary.outcome else {
            panic!("expected a render");
        };
        assert_eq!(reconciliation.removed, vec!["carol".to_string()]);
        assert_eq!(reconciliation.moved.len(), 2);
        assert!(harness
            .svg()
            .expect("image written")
            .contains(r#"data-previous-position="2""#));
        assert_eq!(
            harness.saved(),
            Some(vec!["alice".to_string(), "bob".to_string()])
        );
    }

    #[tokio::test]
    async fn test_empty_repository_renders_nothing() {
        let harness = Harness::new(MockForge::new());

        let summary = harness
            .pipeline(settings())
            .run(&repo())
            .await
            .expect("run succeeds");

        assert_eq!(summary.outcome, RunOutcome::Empty);
        assert!(harness.saved().is_none());
        assert!(harness.svg().is_none());
    }

    #[tokio::test]
    async fn test_avatars_are_inlined() {
        let forge = MockForge::new()
            .with_pull_pages(vec![vec![
                pull_request(1, Some("alice")),
                pull_request(2, Some("bob")),
            ]])
            .with_failing_avatar("https://avatars.test/bob");
        let harness = Harness::new(forge);
        let settings = PipelineSettings {
            embed_avatars: true,
            retry: fast_retry(0),
            ..settings()
        };

        let summary = harness
            .pipeline(settings)
            .run(&repo())
            .await
            .expect("run succeeds");

        assert_eq!(summary.avatars.embedded, 1);
        assert_eq!(summary.avatars.failed, 1);
        let svg = harness.svg().expect("image written");
        assert!(svg.contains("data:image/png;base64,"));
        assert!(svg.contains("https://avatars.test/bob"));
        assert_eq!(harness.forge.call_count("avatars.fetch"), 2);
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_render_failure_preserves_persisted_order() {
        let harness = Harness::new(tied_forge());
        let before = vec!["bob".to_string(), "alice".to_string()];
        harness.orders.insert("octo_wall", before.clone());

        let error = harness
            .pipeline_with(
                settings(),
                Box::new(FailingRenderer),
                Arc::new(harness.orders.clone()),
            )
            .run(&repo())
            .await
            .expect_err("render fails");

        assert_eq!(error.stage, Stage::Render);
        assert_eq!(harness.saved(), Some(before));
        assert!(harness.svg().is_none());
    }

    #[tokio::test]
    async fn test_render_failure_on_first_run_stores_nothing() {
        let harness = Harness::new(tied_forge());

        let error = harness
            .pipeline_with(
                settings(),
                Box::new(FailingRenderer),
                Arc::new(harness.orders.clone()),
            )
            .run(&repo())
            .await
            .expect_err("render fails");

        assert_eq!(error.stage, Stage::Render);
        assert!(harness.saved().is_none());
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_written_image() {
        let harness = Harness::new(tied_forge());

        let error = harness
            .pipeline_with(
                settings(),
                Box::new(SvgRenderer),
                Arc::new(MemoryOrderStore::new().failing_stores()),
            )
            .run(&repo())
            .await
            .expect_err("persist fails");

        assert_eq!(error.stage, Stage::Persist);
        assert!(matches!(error.source, Error::Persistence(_)));
        assert!(harness.svg().is_some());
    }

    #[tokio::test]
    async fn test_unreadable_state_is_treated_as_first_run() {
        let harness = Harness::new(tied_forge());
        let orders = Arc::new(MemoryOrderStore::new().failing_loads());

        let summary = harness
            .pipeline_with(settings(), Box::new(SvgRenderer), orders.clone())
            .run(&repo())
            .await
            .expect("run succeeds");

        assert!(matches!(
            summary.outcome,
            RunOutcome::Rendered { ref reconciliation, .. } if reconciliation.is_first_run()
        ));
        assert_eq!(
            orders.get("octo_wall"),
            Some(vec!["alice".to_string(), "bob".to_string()])
        );
    }

    #[tokio::test]
    async fn test_authentication_failure_is_not_retried() {
        let forge = tied_forge().failing(
            Feed::Pulls,
            1,
            ForgeError::Authentication {
                status: 401,
                message: "Bad credentials".to_string(),
            },
            1,
        );
        let harness = Harness::new(forge);

        let error = harness
            .pipeline(settings())
            .run(&repo())
            .await
            .expect_err("auth fails");

        assert_eq!(error.stage, Stage::Collect);
        assert!(matches!(
            error.source,
            Error::Forge(ForgeError::Authentication { .. })
        ));
        assert_eq!(harness.forge.call_count("pulls.page"), 1);
        assert_eq!(harness.forge.call_count("commits.page"), 0);
        assert!(harness.saved().is_none());
    }

    #[tokio::test]
    async fn test_repository_not_found_fails_fast() {
        let forge = MockForge::new().failing(
            Feed::Pulls,
            1,
            ForgeError::RepositoryNotFound {
                repository: "octo/wall".to_string(),
                message: "Not Found".to_string(),
            },
            5,
        );
        let harness = Harness::new(forge);

        let error = harness
            .pipeline(settings())
            .run(&repo())
            .await
            .expect_err("not found");

        assert!(matches!(
            error.source,
            Error::Forge(ForgeError::RepositoryNotFound { .. })
        ));
        assert_eq!(harness.forge.call_count("pulls.page"), 1);
    }

    #[tokio::test]
    async fn test_transient_page_failure_is_retried() {
        let forge = tied_forge().failing(
            Feed::Commits,
            2,
            ForgeError::Transient {
                message: "connection reset".to_string(),
            },
            2,
        );
        let harness = Harness::new(forge);

        let summary = harness
            .pipeline(settings())
            .run(&repo())
            .await
            .expect("run succeeds after retries");

        assert_eq!(summary.commits.items, 5);
        assert_eq!(harness.forge.call_count("commits.page"), 4);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_the_run() {
        let forge = tied_forge().failing(
            Feed::Commits,
            1,
            ForgeError::Server {
                status: 502,
                message: "Bad Gateway".to_string(),
            },
            3,
        );
        let harness = Harness::new(forge);

        let error = harness
            .pipeline(settings())
            .run(&repo())
            .await
            .expect_err("retries exhausted");

        assert_eq!(error.stage, Stage::Supplement);
        assert_eq!(harness.forge.call_count("commits.page"), 3);
        assert!(harness.saved().is_none());
    }
}

mod collection {
    use super::*;

    #[tokio::test]
    async fn test_empty_page_with_next_continues() {
        let forge = Arc::new(MockForge::new().with_pull_pages(vec![
            vec![],
            vec![],
            vec![pull_request(9, Some("carol"))],
        ]));
        let collector = PullRequestCollector::new(forge.clone(), fast_retry(0));
        let mut store = RecordStore::new();

        let report = collector
            .collect(&repo(), &mut store)
            .await
            .expect("collect succeeds");

        assert_eq!(report.pages, 3);
        assert!(store.get("carol").is_some());
    }

    #[tokio::test]
    async fn test_collecting_twice_is_idempotent() {
        let forge = Arc::new(tied_forge());
        let collector = PullRequestCollector::new(forge.clone(), fast_retry(0));
        let mut store = RecordStore::new();

        collector.collect(&repo(), &mut store).await.expect("first pass");
        let second = collector.collect(&repo(), &mut store).await.expect("second pass");

        assert_eq!(second.attributed, 0);
        assert_eq!(second.duplicates, 5);
        assert_eq!(store.get("alice").map(|r| r.pull_requests().len()), Some(3));
        assert_eq!(store.get("bob").map(|r| r.pull_requests().len()), Some(2));
    }

    #[tokio::test]
    async fn test_supplementer_works_on_empty_store() {
        let forge = Arc::new(tied_forge());
        let supplementer = CommitSupplementer::new(forge.clone(), fast_retry(0)).with_prefetch(3);
        let mut store = RecordStore::new();

        let report = supplementer
            .supplement(&repo(), &mut store)
            .await
            .expect("supplement succeeds");

        assert_eq!(report.new_contributors, 2);
        assert_eq!(store.get("bob").map(|r| r.commits().len()), Some(3));
        assert!(store.get("bob").is_some_and(|r| r.pull_requests().is_empty()));
    }

    #[tokio::test]
    async fn test_merge_scores_sum_both_sources() {
        let forge = Arc::new(tied_forge());
        let mut store = RecordStore::new();

        PullRequestCollector::new(forge.clone(), fast_retry(0))
            .collect(&repo(), &mut store)
            .await
            .expect("collect succeeds");
        CommitSupplementer::new(forge.clone(), fast_retry(0))
            .supplement(&repo(), &mut store)
            .await
            .expect("supplement succeeds");

        assert_eq!(store.get("alice").map(|r| r.score()), Some(5));
        assert_eq!(store.get("bob").map(|r| r.score()), Some(5));
    }
}

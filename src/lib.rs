//! Ranked contributor avatar walls for forge-hosted repositories.
//!
//! Pull requests and commits are collected page by page into one record per
//! contributor, ranked by contribution count, reconciled against the order
//! persisted by the previous run and rendered as an SVG grid.
//!
//! # Quick Start
//!
//! ```rust
//! use contrib_wall::{rank, RecordStore};
//!
//! let mut store = RecordStore::new();
//! store.observe("alice", None, None);
//! store.attribute_pull_request("alice", "1");
//! store.attribute_commit("bob", "6dcb09b");
//! store.attribute_commit("bob", "1a2b3c4");
//!
//! assert_eq!(rank(&store).identifiers(), vec!["bob", "alice"]);
//! ```

pub mod artifact;
pub mod avatars;
pub mod client;
pub mod clients;
pub mod collector;
pub mod config;
pub mod error;
pub mod forge;
pub mod pager;
pub mod persistence;
pub mod pipeline;
pub mod ranker;
pub mod render;
pub mod retry;
pub mod store;
pub mod supplementer;
pub mod testing;
pub mod transport;
pub mod types;

// Re-exports
pub use artifact::{ArtifactSink, FileArtifactSink, MemoryArtifactSink};
pub use avatars::{embed_avatars, EmbedReport};
pub use client::ForgeClient;
pub use clients::{AvatarsClient, CommitsClient, PullsClient};
pub use collector::{CollectReport, PullRequestCollector};
pub use config::{Config, ConfigError};
pub use error::{Error, ForgeError, PersistenceError};
pub use forge::{Avatar, ForgeSource};
pub use pager::PageStream;
pub use persistence::{
    FileOrderStore, MemoryOrderStore, Move, OrderStore, PersistedOrder, Reconciler, Reconciliation,
};
pub use pipeline::{PipelineSettings, RosterPipeline, RunError, RunOutcome, RunSummary, Stage};
pub use ranker::{rank, RankedEntry, RankedList};
pub use render::{LayoutConfig, Renderer, SvgRenderer};
pub use retry::{with_retry, RetryConfig};
pub use store::{Attribution, ContributorRecord, RecordStore};
pub use supplementer::CommitSupplementer;
pub use transport::HttpTransport;
pub use types::{Commit, ForgeUser, Page, PullRequest, RepoIdentity};

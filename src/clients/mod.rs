//! Resource clients for the forge REST API.

pub mod avatars;
pub mod commits;
pub mod pulls;

// Re-exports
pub use avatars::AvatarsClient;
pub use commits::CommitsClient;
pub use pulls::PullsClient;

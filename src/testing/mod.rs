//! Testing utilities.
//!
//! Provides a scripted forge source and fixtures for exercising the
//! pipeline without network access.

mod mock;

pub use mock::{commit, pull_request, Feed, MockCall, MockForge};

//! Upstream integrations for the event server.
//!
//! The `sse` crate only knows the [`upstream::ResourceSource`] contract. This
//! crate provides the implementation that talks to the GitHub REST API, and
//! the error tree used to classify what went wrong on the way.

pub use upstream::{RepoKey, RepoSnapshot, ResourceSource};

pub mod error;
pub mod gateway;

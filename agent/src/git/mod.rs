//! Git checkouts

pub mod repo;

pub use repo::{RepoManager, RepoSpec};

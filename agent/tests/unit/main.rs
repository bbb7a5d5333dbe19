//! Integration tests for the periphery agent

mod common;
mod test_changelog;
mod test_locks;
mod test_router;

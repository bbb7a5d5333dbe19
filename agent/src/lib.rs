//! Periphery Agent Library
//!
//! Host agent that runs on every managed machine and performs repository,
//! container, image and network operations for a central controller, plus
//! the changelog differ the controller uses to describe updates.

pub mod app;
pub mod changelog;
pub mod command;
pub mod config;
pub mod docker;
pub mod errors;
pub mod filesys;
pub mod git;
pub mod http;
pub mod logs;
pub mod models;
pub mod server;
pub mod telemetry;
pub mod utils;

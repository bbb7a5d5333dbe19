//! HTTP server

pub mod auth;
pub mod handlers;
pub mod locks;
pub mod pm2;
pub mod serve;
pub mod state;

pub use locks::KeyedLocks;
pub use serve::{build_router, serve};
pub use state::AgentService;

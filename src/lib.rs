//! itemgate - hook-driven items API
//!
//! Extensions intercept every create, read, update and delete on a
//! collection through ordered hook chains; an accountability-aware items
//! service wraps storage; a bulk coordinator fans updates out with
//! per-item outcomes.

pub mod app;
pub mod bulk;
pub mod cli;
pub mod config;
pub mod core;
pub mod extensions;
pub mod hooks;
pub mod http_server;
pub mod items;
pub mod observability;
pub mod query;

pub use app::{App, AppBuilder};
pub use config::Config;

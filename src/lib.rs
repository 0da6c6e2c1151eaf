//! Vigil - site-reliability toolkit for HTTP endpoints
//!
//! This library provides the backend execution plane for two capabilities:
//! a long-running health-check scheduler that probes a dynamic set of
//! registered endpoints at per-target intervals, and an on-demand load-test
//! engine that drives bounded concurrent request bursts and persists an
//! aggregate performance report. Both share a document-store persistence
//! gateway owned by an external configuration portal.

pub mod api;
pub mod clock;
pub mod config;
pub mod health;
pub mod loadtest;
pub mod logging;
pub mod store;

pub use config::VigilConfig;
pub use store::{MemoryStore, MongoStore, Store};

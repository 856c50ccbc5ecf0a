//! # orderbridge-api
//!
//! HTTP API layer for OrderBridge: import submission, order and job
//! dashboards, and the operator re-enable path.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;

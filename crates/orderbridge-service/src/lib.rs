//! # orderbridge-service
//!
//! Business logic services for OrderBridge — orchestrates repositories
//! on behalf of the API layer and the workflow handlers.

pub mod channel;
pub mod import;
pub mod order;

pub use channel::ChannelPolicyService;
pub use import::ImportService;
pub use order::OrderService;

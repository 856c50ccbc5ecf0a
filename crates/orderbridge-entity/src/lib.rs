//! # orderbridge-entity
//!
//! Domain entity models for OrderBridge. Every struct in this crate
//! represents a database table row or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and database
//! entities additionally derive `sqlx::FromRow`.

pub mod channel;
pub mod import;
pub mod job;
pub mod order;

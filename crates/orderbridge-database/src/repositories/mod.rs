//! Concrete repository implementations.

pub mod channel_rule;
pub mod import;
pub mod job;
pub mod order;

pub use channel_rule::ChannelRuleRepository;
pub use import::ImportRepository;
pub use job::JobRepository;
pub use order::OrderRepository;

//! Sales channel domain entities.

pub mod rule;

pub use rule::{ChannelPolicy, ChannelRule};

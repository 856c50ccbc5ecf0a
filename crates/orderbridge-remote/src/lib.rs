//! # orderbridge-remote
//!
//! Client for the remote order system. Exposes the [`api::RemoteOrderApi`]
//! trait consumed by the workflow handlers, an HTTP implementation over
//! `reqwest`, and the [`error::RemoteError`] shape inspected by the
//! transient-error classifier.

pub mod api;
pub mod error;
pub mod http;

pub use api::RemoteOrderApi;
pub use error::RemoteError;
pub use http::HttpRemoteOrderApi;

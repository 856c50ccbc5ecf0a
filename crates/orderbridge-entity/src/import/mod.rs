//! Import staging domain entities.

pub mod batch;
pub mod row;

pub use batch::{ImportBatch, ImportBatchStatus};
pub use row::{ImportRow, ImportRowStatus, OrderRowInput};

//! Domain model (task kinds, requests, results, ids).

pub mod ids;
pub mod result;
pub mod task;

pub use ids::{BatchId, RequestId};
pub use result::TaskResult;
pub use task::{RawParameters, TaskKind, TaskRequest};

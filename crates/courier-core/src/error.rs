use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::domain::TaskKind;
use crate::typed::ParamError;

/// Coarse failure classes front ends map onto their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The requested task kind is not registered.
    NotFound,
    /// The parameter bundle failed validation. No task body ran.
    BadRequest,
    /// The task ran (or was cut off by a deadline) and failed.
    OperationFailed,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("task kind not found: {0}")]
    UnknownTaskKind(TaskKind),

    #[error("invalid parameters: {0}")]
    InvalidParameters(#[from] ParamError),

    #[error("task execution failed: {0}")]
    TaskExecution(#[from] TaskError),

    #[error("dispatch deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl DispatchError {
    pub fn class(&self) -> ErrorClass {
        match self {
            DispatchError::UnknownTaskKind(_) => ErrorClass::NotFound,
            DispatchError::InvalidParameters(_) => ErrorClass::BadRequest,
            DispatchError::TaskExecution(_) | DispatchError::DeadlineExceeded(_) => {
                ErrorClass::OperationFailed
            }
        }
    }

    /// Offending field name, for `InvalidParameters`.
    pub fn field(&self) -> Option<&str> {
        match self {
            DispatchError::InvalidParameters(p) => Some(p.field.as_str()),
            _ => None,
        }
    }
}

/// Failure raised by a task body. Carries the native cause as text.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("failed to resolve `{host}`: {reason}")]
    Resolve { host: String, reason: String },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(String),

    #[error("no such process: pid {0}")]
    NoSuchProcess(u32),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for TaskError {
    fn from(e: serde_json::Error) -> Self {
        TaskError::Store(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_failure_kind() {
        let unknown = DispatchError::UnknownTaskKind(TaskKind::new("nope"));
        assert_eq!(unknown.class(), ErrorClass::NotFound);

        let invalid = DispatchError::from(ParamError::missing("domain"));
        assert_eq!(invalid.class(), ErrorClass::BadRequest);
        assert_eq!(invalid.field(), Some("domain"));

        let failed = DispatchError::from(TaskError::NoSuchProcess(7));
        assert_eq!(failed.class(), ErrorClass::OperationFailed);

        let late = DispatchError::DeadlineExceeded(Duration::from_millis(5));
        assert_eq!(late.class(), ErrorClass::OperationFailed);
    }

    #[test]
    fn messages_carry_the_cause() {
        let e = DispatchError::from(TaskError::Resolve {
            host: "nx.invalid".into(),
            reason: "no addresses".into(),
        });
        let msg = e.to_string();
        assert!(msg.contains("nx.invalid"));
        assert!(msg.contains("no addresses"));

        let e = DispatchError::UnknownTaskKind(TaskKind::new("nonexistent_kind"));
        assert!(e.to_string().contains("nonexistent_kind"));
    }
}

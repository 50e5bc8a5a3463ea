use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Untyped parameter bundle as it arrives from a front end.
///
/// Owned by the dispatcher for the duration of one request and consumed by
/// schema coercion.
pub type RawParameters = serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskKind(String);

impl TaskKind {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for TaskKind {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskKind {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskKind {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One element of a batch: kind + raw parameters.
///
/// Accepts both the `{task_type, params}` shape used by the CLI and the
/// `{kind, parameters}` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    #[serde(alias = "kind")]
    pub task_type: TaskKind,

    #[serde(alias = "parameters", default = "empty_params")]
    pub params: RawParameters,
}

impl TaskRequest {
    pub fn new(task_type: impl Into<TaskKind>, params: RawParameters) -> Self {
        Self {
            task_type: task_type.into(),
            params,
        }
    }
}

fn empty_params() -> RawParameters {
    serde_json::Value::Object(serde_json::Map::new())
}

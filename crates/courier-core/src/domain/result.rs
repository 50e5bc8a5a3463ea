//! Task result: the serialized output of one execution.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::task::TaskKind;

/// Output of a single task execution.
///
/// The dispatcher works with type-erased tasks, so the typed output is carried
/// as JSON. `decode` recovers the task's own output type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub kind: TaskKind,
    pub value: serde_json::Value,
}

impl TaskResult {
    pub fn new(kind: TaskKind, value: serde_json::Value) -> Self {
        Self { kind, value }
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }

    pub fn into_value(self) -> serde_json::Value {
        self.value
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.value)
    }
}

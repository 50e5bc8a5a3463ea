//! DynTask - 型消去された Task
//!
//! `Task` は関連型を持つので trait object にできません。
//! `TaskEntry<T, F>` が factory と組み合わせて `DynTask` に変換し、
//! registry は `HashMap<TaskKind, Arc<dyn DynTask>>` で管理します。
//!
//! 実行は 2 段階:
//! 1. `prepare`: 検証済みパラメータを `T::Params` にデコードし `T::check` を実行。
//!    ここで新しい Task インスタンスを factory から作る。副作用なし。
//! 2. `PreparedTask::run`: task 本体を実行し、出力を JSON にする。

use async_trait::async_trait;
use std::marker::PhantomData;

use super::schema::{ParamError, ParameterSchema, ValidatedParameters};
use super::task::Task;
use crate::error::TaskError;

/// Object-safe view of a registered task kind.
pub trait DynTask: Send + Sync {
    fn kind(&self) -> &'static str;

    fn schema(&self) -> ParameterSchema;

    fn prepare(&self, params: ValidatedParameters) -> Result<Box<dyn PreparedTask>, ParamError>;
}

/// A task instance bound to its decoded parameters, ready to run once.
#[async_trait]
pub trait PreparedTask: Send {
    async fn run(self: Box<Self>) -> Result<serde_json::Value, TaskError>;
}

pub struct TaskEntry<T, F> {
    factory: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> TaskEntry<T, F>
where
    T: Task,
    F: Fn() -> T + Send + Sync + 'static,
{
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            _marker: PhantomData,
        }
    }
}

impl<T, F> DynTask for TaskEntry<T, F>
where
    T: Task,
    F: Fn() -> T + Send + Sync + 'static,
{
    fn kind(&self) -> &'static str {
        T::KIND
    }

    fn schema(&self) -> ParameterSchema {
        T::SCHEMA
    }

    fn prepare(&self, params: ValidatedParameters) -> Result<Box<dyn PreparedTask>, ParamError> {
        let params: T::Params = params.decode()?;
        T::check(&params)?;
        Ok(Box::new(Prepared {
            task: (self.factory)(),
            params,
        }))
    }
}

struct Prepared<T: Task> {
    task: T,
    params: T::Params,
}

#[async_trait]
impl<T: Task> PreparedTask for Prepared<T> {
    async fn run(self: Box<Self>) -> Result<serde_json::Value, TaskError> {
        let Prepared { task, params } = *self;
        let output = task.execute(params).await?;
        serde_json::to_value(output)
            .map_err(|e| TaskError::Other(format!("failed to encode {} output: {e}", T::KIND)))
    }
}

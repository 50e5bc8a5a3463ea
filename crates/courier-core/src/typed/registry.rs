//! TaskRegistry - task kind の登録と検索
//!
//! - 起動時に構築（mutable）
//! - 実行時は `Arc<TaskRegistry>` として共有（immutable、ロック不要）
//!
//! 実行時の登録・削除はありません。テストでは別の registry を持つ
//! Dispatcher を作ることで隔離できます。

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::{DynTask, TaskEntry};
use super::schema::ParameterSchema;
use super::task::Task;
use crate::domain::TaskKind;

#[derive(Default)]
pub struct TaskRegistry {
    entries: HashMap<TaskKind, Arc<dyn DynTask>>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("task kind '{0}' is already registered")]
    AlreadyRegistered(TaskKind),
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register `T` with a factory that builds a fresh instance per dispatch.
    pub fn register<T, F>(&mut self, factory: F) -> Result<(), RegistryError>
    where
        T: Task,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let kind = TaskKind::new(T::KIND);
        if self.entries.contains_key(&kind) {
            return Err(RegistryError::AlreadyRegistered(kind));
        }
        self.entries.insert(kind, Arc::new(TaskEntry::new(factory)));
        Ok(())
    }

    pub fn lookup(&self, kind: &str) -> Option<Arc<dyn DynTask>> {
        self.entries.get(kind).cloned()
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<TaskKind> {
        let mut kinds: Vec<TaskKind> = self.entries.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Registered kinds with their schemas, sorted by kind.
    pub fn schemas(&self) -> Vec<(TaskKind, ParameterSchema)> {
        self.kinds()
            .into_iter()
            .filter_map(|k| {
                let schema = self.entries.get(&k)?.schema();
                Some((k, schema))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

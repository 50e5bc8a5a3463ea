//! RegistryBuilder - task registry の構築
//!
//! # Fail-fast 設計
//! - `expect_kinds()` で期待される task kind を登録
//! - `build()` 時に「期待集合 ⊆ 登録済み集合」をチェック
//! - 不足があれば BuildError を返す

use std::sync::Arc;

use crate::typed::{RegistryError, Task, TaskRegistry};

/// Builds the immutable registry handed to a `Dispatcher`.
///
/// # 使用例
/// ```ignore
/// let registry = RegistryBuilder::new()
///     .register(|| DnsQueryTask::new(timeout))?
///     .expect_kinds(&["dns_query"])
///     .build()?;
/// let dispatcher = Dispatcher::new(registry);
/// ```
pub struct RegistryBuilder {
    registry: TaskRegistry,
    expected_kinds: Option<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing task kinds: {0:?}. These kinds were expected but not registered.")]
    MissingTaskKinds(Vec<String>),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: TaskRegistry::new(),
            expected_kinds: None,
        }
    }

    pub fn register<T, F>(mut self, factory: F) -> Result<Self, RegistryError>
    where
        T: Task,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.registry.register(factory)?;
        Ok(self)
    }

    pub fn expect_kinds(mut self, kinds: &[&str]) -> Self {
        self.expected_kinds = Some(kinds.iter().map(|k| k.to_string()).collect());
        self
    }

    pub fn build(self) -> Result<Arc<TaskRegistry>, BuildError> {
        if let Some(expected) = &self.expected_kinds {
            let missing: Vec<String> = expected
                .iter()
                .filter(|k| self.registry.lookup(k).is_none())
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingTaskKinds(missing));
            }
        }
        Ok(Arc::new(self.registry))
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::testing::{DelayTask, EchoTask};

    #[test]
    fn build_success() {
        let registry = RegistryBuilder::new()
            .register(|| EchoTask)
            .unwrap()
            .expect_kinds(&["echo"])
            .build()
            .unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn build_missing_task_kinds() {
        let result = RegistryBuilder::new()
            .register(|| EchoTask)
            .unwrap()
            .expect_kinds(&["echo", "delay"])
            .build();
        assert!(matches!(
            result,
            Err(BuildError::MissingTaskKinds(missing)) if missing == vec!["delay".to_string()]
        ));
    }

    #[test]
    fn build_without_expectations() {
        let registry = RegistryBuilder::new()
            .register(|| EchoTask)
            .unwrap()
            .register(|| DelayTask)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_registration_fails_fast() {
        let result = RegistryBuilder::new()
            .register(|| EchoTask)
            .unwrap()
            .register(|| EchoTask);
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
    }
}

//! registry_task - ファイルに保存されるモックの key/value レジストリ
//!
//! # 保存形式
//! フラットな JSON object（pretty print）。初回アクセス時に `{}` で作成し、
//! 変更のたびに一時ファイルへ全体を書いてから rename します。
//!
//! # 排他
//! read-modify-write は store ごとの async mutex で直列化します。
//! guard はスコープを抜けると（エラー時も）解放されます。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::TaskError;
use crate::typed::{FieldSpec, FieldType, ParamError, ParameterSchema, Task};

type Entries = Map<String, Value>;

pub struct KvStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl KvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>, TaskError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        Ok(entries.remove(key))
    }

    pub async fn set(&self, key: &str, value: Value) -> Result<(), TaskError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value);
        self.save(&entries).await
    }

    /// `false` if the key was not present; the file is left untouched then.
    pub async fn delete(&self, key: &str) -> Result<bool, TaskError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.save(&entries).await?;
        Ok(true)
    }

    /// Caller must hold `lock`.
    async fn load(&self) -> Result<Entries, TaskError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "creating empty store");
                let empty = Entries::new();
                self.save(&empty).await?;
                return Ok(empty);
            }
            Err(e) => return Err(e.into()),
        };

        if text.trim().is_empty() {
            return Ok(Entries::new());
        }
        match serde_json::from_str::<Value>(&text)? {
            Value::Object(entries) => Ok(entries),
            _ => Err(TaskError::Store(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
        }
    }

    /// Caller must hold `lock`.
    async fn save(&self, entries: &Entries) -> Result<(), TaskError> {
        let text = serde_json::to_string_pretty(entries)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, text).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "store".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegistryAction {
    Get,
    Set,
    Delete,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryParameters {
    pub action: RegistryAction,
    pub key: String,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegistryReply {
    Found { key: String, value: Value },
    NotFound { key: String },
    Stored { key: String },
    Deleted { key: String },
}

pub struct RegistryTask {
    store: Arc<KvStore>,
}

impl RegistryTask {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Task for RegistryTask {
    const KIND: &'static str = "registry_task";
    const SCHEMA: ParameterSchema = ParameterSchema::new(
        "RegistryParameters",
        &[
            FieldSpec::required(
                "action",
                FieldType::Enum {
                    variants: &["GET", "SET", "DELETE"],
                },
            ),
            FieldSpec::required("key", FieldType::String),
            FieldSpec::optional("value", FieldType::Any),
        ],
    );
    type Params = RegistryParameters;
    type Output = RegistryReply;

    fn check(params: &RegistryParameters) -> Result<(), ParamError> {
        if params.key.is_empty() {
            return Err(ParamError::new("key", "must not be empty"));
        }
        if params.action == RegistryAction::Set && params.value.is_none() {
            return Err(ParamError::new("value", "required for SET"));
        }
        Ok(())
    }

    async fn execute(&self, params: RegistryParameters) -> Result<RegistryReply, TaskError> {
        let RegistryParameters { action, key, value } = params;
        let reply = match (action, value) {
            (RegistryAction::Get, _) => match self.store.get(&key).await? {
                Some(value) => RegistryReply::Found { key, value },
                None => RegistryReply::NotFound { key },
            },
            (RegistryAction::Set, Some(value)) => {
                self.store.set(&key, value).await?;
                info!(%key, "stored");
                RegistryReply::Stored { key }
            }
            (RegistryAction::Set, None) => {
                return Err(TaskError::Other("SET without a value".to_string()));
            }
            (RegistryAction::Delete, _) => {
                if self.store.delete(&key).await? {
                    info!(%key, "deleted");
                    RegistryReply::Deleted { key }
                } else {
                    RegistryReply::NotFound { key }
                }
            }
        };
        Ok(reply)
    }
}

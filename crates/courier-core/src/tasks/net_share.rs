//! net_share - ネットワーク共有の管理（プロセス内のモック共有テーブル）

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TaskError;
use crate::typed::{FieldSpec, FieldType, ParamError, ParameterSchema, Task};

/// In-memory share table shared by every `net_share` dispatch.
#[derive(Debug, Default)]
pub struct ShareTable {
    shares: Mutex<BTreeSet<String>>,
}

impl ShareTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains(name)
    }

    /// `false` if the share already existed.
    pub fn add(&self, name: &str) -> bool {
        self.lock().insert(name.to_string())
    }

    /// `false` if there was nothing to remove.
    pub fn remove(&self, name: &str) -> bool {
        self.lock().remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.shares.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShareAction {
    Get,
    Add,
    Delete,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetShareParameters {
    pub action: ShareAction,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ShareReply {
    Present { name: String },
    Absent { name: String },
    Added { name: String },
    AlreadyExists { name: String },
    Deleted { name: String },
}

pub struct NetShareTask {
    table: Arc<ShareTable>,
}

impl NetShareTask {
    pub fn new(table: Arc<ShareTable>) -> Self {
        Self { table }
    }
}

#[async_trait]
impl Task for NetShareTask {
    const KIND: &'static str = "net_share";
    const SCHEMA: ParameterSchema = ParameterSchema::new(
        "NetShareParameters",
        &[
            FieldSpec::required(
                "action",
                FieldType::Enum {
                    variants: &["GET", "ADD", "DELETE"],
                },
            ),
            FieldSpec::required("name", FieldType::String),
        ],
    );
    type Params = NetShareParameters;
    type Output = ShareReply;

    fn check(params: &NetShareParameters) -> Result<(), ParamError> {
        if params.name.trim().is_empty() {
            return Err(ParamError::new("name", "must not be empty"));
        }
        Ok(())
    }

    async fn execute(&self, params: NetShareParameters) -> Result<ShareReply, TaskError> {
        let NetShareParameters { action, name } = params;
        let reply = match action {
            ShareAction::Get if self.table.contains(&name) => ShareReply::Present { name },
            ShareAction::Get => ShareReply::Absent { name },
            ShareAction::Add if self.table.add(&name) => {
                info!(share = %name, "share added");
                ShareReply::Added { name }
            }
            ShareAction::Add => ShareReply::AlreadyExists { name },
            ShareAction::Delete if self.table.remove(&name) => {
                info!(share = %name, "share deleted");
                ShareReply::Deleted { name }
            }
            ShareAction::Delete => ShareReply::Absent { name },
        };
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(action: ShareAction, name: &str) -> NetShareParameters {
        NetShareParameters {
            action,
            name: name.into(),
        }
    }

    #[tokio::test]
    async fn add_get_delete_cycle() {
        let table = Arc::new(ShareTable::new());
        let task = NetShareTask::new(table.clone());

        let r = task.execute(params(ShareAction::Get, "docs")).await.unwrap();
        assert_eq!(r, ShareReply::Absent { name: "docs".into() });

        let r = task.execute(params(ShareAction::Add, "docs")).await.unwrap();
        assert_eq!(r, ShareReply::Added { name: "docs".into() });
        let r = task.execute(params(ShareAction::Add, "docs")).await.unwrap();
        assert_eq!(r, ShareReply::AlreadyExists { name: "docs".into() });

        // A fresh instance sees the same table.
        let other = NetShareTask::new(table.clone());
        let r = other.execute(params(ShareAction::Get, "docs")).await.unwrap();
        assert_eq!(r, ShareReply::Present { name: "docs".into() });

        let r = other.execute(params(ShareAction::Delete, "docs")).await.unwrap();
        assert_eq!(r, ShareReply::Deleted { name: "docs".into() });
        let r = other.execute(params(ShareAction::Delete, "docs")).await.unwrap();
        assert_eq!(r, ShareReply::Absent { name: "docs".into() });
        assert!(table.names().is_empty());
    }

    #[test]
    fn action_is_case_insensitive_after_coercion() {
        let validated = NetShareTask::SCHEMA
            .coerce(json!({"action": "add", "name": "public"}))
            .unwrap();
        let p: NetShareParameters = validated.decode().unwrap();
        assert_eq!(p.action, ShareAction::Add);
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = NetShareTask::SCHEMA
            .coerce(json!({"action": "LIST", "name": "public"}))
            .unwrap_err();
        assert_eq!(err.field, "action");
    }

    #[test]
    fn reply_is_tagged_by_status() {
        let v = serde_json::to_value(ShareReply::AlreadyExists { name: "x".into() }).unwrap();
        assert_eq!(v, json!({"status": "already_exists", "name": "x"}));
    }
}

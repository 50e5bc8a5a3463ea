//! courier-core
//!
//! Pluggable remote-task execution agent.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（task kind, request, result, ids）
//! - **typed**: 型付き Task API（Task trait, ParameterSchema, DynTask, TaskRegistry）
//! - **app**: registry の構築と dispatch（RegistryBuilder, Dispatcher）
//! - **tasks**: 組み込み task（dns_query, http_request, port_scan, ...）
//! - **ports**: 時刻と ID 生成の抽象化
//! - **config**: 環境変数による設定
//! - **observe**: tracing subscriber の初期化
//! - **error**: dispatch / 実行エラー

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod observe;
pub mod ports;
pub mod tasks;
pub mod typed;

pub use app::{BuildError, Dispatcher, RegistryBuilder};
pub use config::{AgentConfig, ConfigError, ScanConfig};
pub use domain::{RawParameters, TaskKind, TaskRequest, TaskResult};
pub use error::{DispatchError, ErrorClass, TaskError};
pub use tasks::{default_dispatcher, default_registry};
pub use typed::{ParamError, ParameterSchema, Task, TaskRegistry};

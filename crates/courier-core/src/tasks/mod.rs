//! Tasks - 組み込み task kind の実装と既定 registry
//!
//! 長寿命の協調オブジェクト（HTTP client、port scanner、share table、KV store）は
//! ここで 1 回だけ作り、factory に渡します。task インスタンス自体は dispatch ごとに新規です。

pub mod dns_query;
pub mod http_request;
pub mod http_server;
mod net;
pub mod net_share;
pub mod port_scan;
pub mod process_tree;
pub mod registry_task;

use std::sync::Arc;

use crate::app::{BuildError, Dispatcher, RegistryBuilder};
use crate::config::AgentConfig;
use crate::typed::TaskRegistry;

pub use dns_query::DnsQueryTask;
pub use http_request::HttpRequestTask;
pub use http_server::HttpServerTask;
pub use net_share::{NetShareTask, ShareTable};
pub use port_scan::{PortScanTask, PortScanner, ProbeCache, Prober, TcpProber};
pub use process_tree::ProcessTreeTask;
pub use registry_task::{KvStore, RegistryTask};

/// Every kind `default_registry` registers.
pub const BUILTIN_KINDS: &[&str] = &[
    "dns_query",
    "http_request",
    "port_scan",
    "net_share",
    "http_server",
    "registry_task",
    "process_tree_task",
];

pub fn default_registry(config: &AgentConfig) -> Result<Arc<TaskRegistry>, BuildError> {
    let resolve_timeout = config.resolve_timeout;
    let client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;
    let scanner = Arc::new(PortScanner::new(&config.scan, config.resolve_timeout));
    let shares = Arc::new(ShareTable::new());
    let store = Arc::new(KvStore::new(config.store_path.clone()));
    let bind_host = config.http_server_host.clone();

    let registry = RegistryBuilder::new()
        .register(move || DnsQueryTask::new(resolve_timeout))?
        .register(move || HttpRequestTask::new(client.clone()))?
        .register(move || PortScanTask::new(scanner.clone()))?
        .register(move || NetShareTask::new(shares.clone()))?
        .register(move || HttpServerTask::new(bind_host.clone()))?
        .register(move || RegistryTask::new(store.clone()))?
        .register(|| ProcessTreeTask)?
        .expect_kinds(BUILTIN_KINDS)
        .build()?;
    Ok(registry)
}

/// `default_registry` plus the configured dispatch deadline.
pub fn default_dispatcher(config: &AgentConfig) -> Result<Dispatcher, BuildError> {
    let registry = default_registry(config)?;
    Ok(Dispatcher::new(registry).with_deadline(config.dispatch_deadline))
}

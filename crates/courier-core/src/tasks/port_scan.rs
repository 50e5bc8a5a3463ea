//! port_scan - 並行 TCP connect による port scan
//!
//! # 動作
//! - ドメインは 1 回だけ解決（失敗したら task 全体が失敗）
//! - `[from_port, to_port]` の各 port に独立した connect を投げる（1 本ごとに timeout）
//! - 同時接続数は `max_in_flight` で上限を設ける
//! - 結果は完了順に関係なく昇順
//!
//! # Probe cache
//! (domain, port) → open/closed のメモ化。デフォルトは無効で、
//! 有効にした場合は TTL で期限切れになります。

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tracing::{debug, instrument, trace};

use super::net::resolve;
use crate::config::ScanConfig;
use crate::error::TaskError;
use crate::ports::{Clock, SystemClock};
use crate::typed::schema::PORT;
use crate::typed::{FieldSpec, FieldType, ParameterSchema, Task};

/// One connect attempt. `Ok(())` means the port accepted the connection.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, addr: SocketAddr) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, addr: SocketAddr) -> io::Result<()> {
        TcpStream::connect(addr).await.map(drop)
    }
}

/// Memoised probe outcomes keyed by (domain, port).
///
/// Expired entries are swept on `put` once the map reaches `sweep_at`;
/// the threshold then tracks twice the live size.
pub struct ProbeCache {
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    inner: Mutex<CacheInner>,
}

const MIN_SWEEP_AT: usize = 1024;

type ProbeKey = (String, u16);

struct CacheInner {
    entries: HashMap<ProbeKey, (bool, DateTime<Utc>)>,
    sweep_at: usize,
}

impl ProbeCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            clock,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                sweep_at: MIN_SWEEP_AT,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cached outcome, if present and younger than the TTL.
    pub fn get(&self, domain: &str, port: u16) -> Option<bool> {
        let now = self.clock.now();
        let mut inner = self.lock();
        let key = (domain.to_ascii_lowercase(), port);
        match inner.entries.get(&key) {
            Some(&(open, stored_at)) if now - stored_at < self.ttl => Some(open),
            Some(_) => {
                inner.entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, domain: &str, port: u16, open: bool) {
        let now = self.clock.now();
        let mut inner = self.lock();
        if inner.entries.len() >= inner.sweep_at {
            let before = inner.entries.len();
            inner.entries.retain(|_, (_, at)| now - *at < self.ttl);
            inner.sweep_at = (inner.entries.len() * 2).max(MIN_SWEEP_AT);
            trace!(swept = before - inner.entries.len(), "probe cache swept");
        }
        inner
            .entries
            .insert((domain.to_ascii_lowercase(), port), (open, now));
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Concurrent probe-and-aggregate engine.
///
/// Shared by every `port_scan` dispatch so that an enabled cache outlives a
/// single scan.
pub struct PortScanner {
    prober: Arc<dyn Prober>,
    probe_timeout: Duration,
    max_in_flight: usize,
    resolve_timeout: Duration,
    cache: Option<Arc<ProbeCache>>,
}

impl PortScanner {
    pub fn new(config: &ScanConfig, resolve_timeout: Duration) -> Self {
        let cache = config
            .cache_ttl
            .map(|ttl| Arc::new(ProbeCache::new(ttl, Arc::new(SystemClock))));
        Self {
            prober: Arc::new(TcpProber),
            probe_timeout: config.probe_timeout,
            max_in_flight: config.max_in_flight.max(1),
            resolve_timeout,
            cache,
        }
    }

    pub fn with_prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = prober;
        self
    }

    pub fn with_cache(mut self, cache: Option<Arc<ProbeCache>>) -> Self {
        self.cache = cache;
        self
    }

    /// Open ports in `[from_port, to_port]`, ascending.
    #[instrument(level = "debug", skip(self))]
    pub async fn scan(
        &self,
        domain: &str,
        from_port: u16,
        to_port: u16,
    ) -> Result<Vec<u16>, TaskError> {
        if from_port > to_port {
            return Ok(Vec::new());
        }

        let ips: Vec<IpAddr> = resolve(domain, 0, self.resolve_timeout)
            .await?
            .into_iter()
            .map(|a| a.ip())
            .collect();

        let ips = ips.as_slice();
        let mut open: Vec<u16> = stream::iter(from_port..=to_port)
            .map(move |port| self.probe_port(domain, ips, port))
            .buffer_unordered(self.max_in_flight)
            .filter_map(|(port, is_open)| async move { is_open.then_some(port) })
            .collect()
            .await;
        open.sort_unstable();

        debug!(open = open.len(), "scan finished");
        Ok(open)
    }

    async fn probe_port(&self, domain: &str, ips: &[IpAddr], port: u16) -> (u16, bool) {
        if let Some(open) = self.cache.as_ref().and_then(|c| c.get(domain, port)) {
            trace!(port, open, "cache hit");
            return (port, open);
        }

        let mut is_open = false;
        for ip in ips {
            let addr = SocketAddr::new(*ip, port);
            match tokio::time::timeout(self.probe_timeout, self.prober.probe(addr)).await {
                Ok(Ok(())) => {
                    is_open = true;
                    break;
                }
                Ok(Err(e)) => trace!(%addr, error = %e, "closed"),
                Err(_) => trace!(%addr, "timed out"),
            }
        }

        if let Some(cache) = &self.cache {
            cache.put(domain, port, is_open);
        }
        (port, is_open)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortScanParameters {
    pub domain: String,
    pub from_port: u16,
    pub to_port: u16,
}

pub struct PortScanTask {
    scanner: Arc<PortScanner>,
}

impl PortScanTask {
    pub fn new(scanner: Arc<PortScanner>) -> Self {
        Self { scanner }
    }
}

#[async_trait]
impl Task for PortScanTask {
    const KIND: &'static str = "port_scan";
    const SCHEMA: ParameterSchema = ParameterSchema::new(
        "PortScanParameters",
        &[
            FieldSpec::required("domain", FieldType::String),
            FieldSpec::required("from_port", PORT),
            FieldSpec::required("to_port", PORT),
        ],
    );
    type Params = PortScanParameters;
    type Output = Vec<u16>;

    async fn execute(&self, params: PortScanParameters) -> Result<Vec<u16>, TaskError> {
        self.scanner
            .scan(&params.domain, params.from_port, params.to_port)
            .await
    }
}

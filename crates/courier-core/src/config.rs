//! Agent configuration: defaults overridable from `COURIER_*` environment
//! variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const ENV_STORE_PATH: &str = "COURIER_STORE_PATH";
pub const ENV_PROBE_TIMEOUT_MS: &str = "COURIER_PROBE_TIMEOUT_MS";
pub const ENV_SCAN_MAX_IN_FLIGHT: &str = "COURIER_SCAN_MAX_IN_FLIGHT";
pub const ENV_PROBE_CACHE_TTL_MS: &str = "COURIER_PROBE_CACHE_TTL_MS";
pub const ENV_RESOLVE_TIMEOUT_MS: &str = "COURIER_RESOLVE_TIMEOUT_MS";
pub const ENV_HTTP_TIMEOUT_MS: &str = "COURIER_HTTP_TIMEOUT_MS";
pub const ENV_DISPATCH_DEADLINE_MS: &str = "COURIER_DISPATCH_DEADLINE_MS";
pub const ENV_HTTP_SERVER_HOST: &str = "COURIER_HTTP_SERVER_HOST";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: `{value}` ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Per-port connect timeout.
    pub probe_timeout: Duration,
    /// Upper bound on simultaneous connect attempts.
    pub max_in_flight: usize,
    /// `None` disables probe memoisation.
    pub cache_ttl: Option<Duration>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(1),
            max_in_flight: 1024,
            cache_ttl: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// JSON file backing `registry_task`.
    pub store_path: PathBuf,
    pub scan: ScanConfig,
    pub resolve_timeout: Duration,
    pub http_timeout: Duration,
    /// Per-dispatch deadline. `None` means no deadline.
    pub dispatch_deadline: Option<Duration>,
    /// Address `http_server` tasks bind to.
    pub http_server_host: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("mock_registry.json"),
            scan: ScanConfig::default(),
            resolve_timeout: Duration::from_secs(5),
            http_timeout: Duration::from_secs(10),
            dispatch_deadline: None,
            http_server_host: "0.0.0.0".to_string(),
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from defaults plus whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(path) = lookup(ENV_STORE_PATH) {
            cfg.store_path = PathBuf::from(path);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_PROBE_TIMEOUT_MS)? {
            cfg.scan.probe_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var::<usize>(&lookup, ENV_SCAN_MAX_IN_FLIGHT)? {
            if n == 0 {
                return Err(ConfigError::Invalid {
                    var: ENV_SCAN_MAX_IN_FLIGHT,
                    value: n.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            cfg.scan.max_in_flight = n;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_PROBE_CACHE_TTL_MS)? {
            cfg.scan.cache_ttl = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_RESOLVE_TIMEOUT_MS)? {
            cfg.resolve_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_HTTP_TIMEOUT_MS)? {
            cfg.http_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_DISPATCH_DEADLINE_MS)? {
            cfg.dispatch_deadline = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(host) = lookup(ENV_HTTP_SERVER_HOST) {
            cfg.http_server_host = host;
        }

        Ok(cfg)
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|e| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_disable_cache_and_deadline() {
        let cfg = AgentConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, AgentConfig::default());
        assert_eq!(cfg.scan.probe_timeout, Duration::from_secs(1));
        assert!(cfg.scan.cache_ttl.is_none());
        assert!(cfg.dispatch_deadline.is_none());
    }

    #[test]
    fn env_overrides_are_applied() {
        let cfg = AgentConfig::from_lookup(lookup(&[
            (ENV_STORE_PATH, "/tmp/reg.json"),
            (ENV_PROBE_TIMEOUT_MS, "250"),
            (ENV_SCAN_MAX_IN_FLIGHT, "64"),
            (ENV_PROBE_CACHE_TTL_MS, "5000"),
            (ENV_DISPATCH_DEADLINE_MS, "30000"),
            (ENV_HTTP_SERVER_HOST, "127.0.0.1"),
        ]))
        .unwrap();

        assert_eq!(cfg.store_path, PathBuf::from("/tmp/reg.json"));
        assert_eq!(cfg.scan.probe_timeout, Duration::from_millis(250));
        assert_eq!(cfg.scan.max_in_flight, 64);
        assert_eq!(cfg.scan.cache_ttl, Some(Duration::from_secs(5)));
        assert_eq!(cfg.dispatch_deadline, Some(Duration::from_secs(30)));
        assert_eq!(cfg.http_server_host, "127.0.0.1");
    }

    #[test]
    fn zero_ttl_keeps_cache_disabled() {
        let cfg = AgentConfig::from_lookup(lookup(&[(ENV_PROBE_CACHE_TTL_MS, "0")])).unwrap();
        assert!(cfg.scan.cache_ttl.is_none());
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = AgentConfig::from_lookup(lookup(&[(ENV_HTTP_TIMEOUT_MS, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == ENV_HTTP_TIMEOUT_MS));

        let err = AgentConfig::from_lookup(lookup(&[(ENV_SCAN_MAX_IN_FLIGHT, "0")])).unwrap_err();
        assert!(err.to_string().contains(ENV_SCAN_MAX_IN_FLIGHT));
    }
}

//! 名前解決の共通処理（dns_query / port_scan）

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::lookup_host;
use tracing::trace;

use crate::error::TaskError;

/// Resolve `host` once, IPv4 addresses first.
///
/// An empty answer is a resolution failure, not an empty success.
pub(crate) async fn resolve(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<Vec<SocketAddr>, TaskError> {
    let lookup = tokio::time::timeout(timeout, lookup_host((host, port)))
        .await
        .map_err(|_| TaskError::Timeout {
            operation: "name resolution",
            after: timeout,
        })?;

    let mut addrs: Vec<SocketAddr> = lookup
        .map_err(|e| TaskError::Resolve {
            host: host.to_string(),
            reason: e.to_string(),
        })?
        .collect();

    if addrs.is_empty() {
        return Err(TaskError::Resolve {
            host: host.to_string(),
            reason: "no addresses returned".to_string(),
        });
    }

    dedup_ipv4_first(&mut addrs);
    trace!(host, count = addrs.len(), "resolved");
    Ok(addrs)
}

fn dedup_ipv4_first(addrs: &mut Vec<SocketAddr>) {
    addrs.sort_unstable_by_key(|a| (a.is_ipv6(), *a));
    addrs.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_addresses_are_collapsed_even_when_not_adjacent() {
        let mut addrs: Vec<SocketAddr> = [
            "10.0.0.2:80",
            "[::1]:80",
            "10.0.0.1:80",
            "10.0.0.2:80",
            "[::1]:80",
        ]
        .iter()
        .map(|a| a.parse().unwrap())
        .collect();
        dedup_ipv4_first(&mut addrs);
        let expected: Vec<SocketAddr> = ["10.0.0.1:80", "10.0.0.2:80", "[::1]:80"]
            .iter()
            .map(|a| a.parse().unwrap())
            .collect();
        assert_eq!(addrs, expected);
    }

    #[tokio::test]
    async fn literal_addresses_resolve_without_dns() {
        let addrs = resolve("127.0.0.1", 80, Duration::from_secs(1)).await.unwrap();
        assert_eq!(addrs, vec!["127.0.0.1:80".parse::<SocketAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn localhost_prefers_ipv4() {
        let addrs = resolve("localhost", 0, Duration::from_secs(5)).await.unwrap();
        if addrs.iter().any(|a| a.is_ipv4()) {
            assert!(addrs[0].is_ipv4());
        }
    }

    #[tokio::test]
    async fn unresolvable_host_names_the_host() {
        let err = resolve("nonexistent.invalid", 80, Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            TaskError::Resolve { host, .. } => assert_eq!(host, "nonexistent.invalid"),
            // Some resolvers stall on .invalid instead of failing.
            TaskError::Timeout { .. } => {}
            other => panic!("unexpected error: {other}"),
        }
    }
}

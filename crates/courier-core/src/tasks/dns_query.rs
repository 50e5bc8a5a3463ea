//! dns_query - ドメイン名を IP アドレスに解決する

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::net::resolve;
use crate::error::TaskError;
use crate::typed::{FieldSpec, FieldType, ParameterSchema, Task};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DnsQueryParameters {
    pub domain: String,
}

pub struct DnsQueryTask {
    timeout: Duration,
}

impl DnsQueryTask {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Task for DnsQueryTask {
    const KIND: &'static str = "dns_query";
    const SCHEMA: ParameterSchema = ParameterSchema::new(
        "DnsQueryParameters",
        &[FieldSpec::required("domain", FieldType::String)],
    );
    type Params = DnsQueryParameters;
    /// First IPv4 address when there is one.
    type Output = String;

    async fn execute(&self, params: DnsQueryParameters) -> Result<String, TaskError> {
        let addrs = resolve(&params.domain, 0, self.timeout).await?;
        // resolve() never returns an empty list and sorts IPv4 first.
        addrs
            .first()
            .map(|a| a.ip().to_string())
            .ok_or_else(|| TaskError::Resolve {
                host: params.domain,
                reason: "no addresses returned".to_string(),
            })
    }
}

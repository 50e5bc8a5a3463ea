//! http_request - 指定ホストへ HTTP リクエストを送り、本文を返す

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use tracing::debug;

use crate::error::TaskError;
use crate::typed::schema::PORT;
use crate::typed::{FieldSpec, FieldType, ParamError, ParameterSchema, Task};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpRequestParameters {
    pub method: String,
    pub domain: String,
    pub port: u16,
    pub path: String,
}

impl HttpRequestParameters {
    fn url(&self) -> String {
        format!("http://{}:{}{}", self.domain, self.port, self.path)
    }
}

/// Holds a clone of the agent-wide client; the connection pool is shared.
pub struct HttpRequestTask {
    client: Client,
}

impl HttpRequestTask {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn parse_method(raw: &str) -> Result<Method, ParamError> {
    Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| ParamError::new("method", format!("`{raw}` is not an HTTP method")))
}

#[async_trait]
impl Task for HttpRequestTask {
    const KIND: &'static str = "http_request";
    const SCHEMA: ParameterSchema = ParameterSchema::new(
        "HttpRequestParameters",
        &[
            FieldSpec::required("method", FieldType::String),
            FieldSpec::required("domain", FieldType::String),
            FieldSpec::required("port", PORT),
            FieldSpec::required("path", FieldType::String),
        ],
    );
    type Params = HttpRequestParameters;
    type Output = String;

    fn check(params: &HttpRequestParameters) -> Result<(), ParamError> {
        parse_method(&params.method)?;
        if params.domain.is_empty() {
            return Err(ParamError::new("domain", "must not be empty"));
        }
        Ok(())
    }

    async fn execute(&self, params: HttpRequestParameters) -> Result<String, TaskError> {
        let method = parse_method(&params.method).map_err(|e| TaskError::Other(e.to_string()))?;
        let url = params.url();
        debug!(%method, %url, "sending request");

        let response = self.client.request(method, &url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%url, status = status.as_u16(), bytes = body.len(), "response received");
        Ok(body)
    }
}

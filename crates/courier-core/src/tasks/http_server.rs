//! http_server - 指定 port で 1 ページだけ返す HTTP サーバーを起動する
//!
//! サーバーはバックグラウンドで動き続け、task 自体は bind 完了で返ります。

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::TaskError;
use crate::typed::schema::PORT;
use crate::typed::{FieldSpec, FieldType, ParamError, ParameterSchema, Task};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpServerParameters {
    /// 0 picks an ephemeral port.
    pub port: u16,
    pub page_uri: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpServerReply {
    /// The port actually bound.
    pub port: u16,
    pub page_uri: String,
}

pub struct HttpServerTask {
    bind_host: String,
}

impl HttpServerTask {
    pub fn new(bind_host: impl Into<String>) -> Self {
        Self {
            bind_host: bind_host.into(),
        }
    }
}

#[derive(Clone)]
struct Page {
    uri: Arc<str>,
    body: Arc<str>,
}

impl Page {
    fn respond(&self, method: &Method, uri: &Uri) -> Response {
        let is_read = method == Method::GET || method == Method::HEAD;
        if is_read && uri.path() == &*self.uri {
            Html(self.body.to_string()).into_response()
        } else {
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

fn page_router(page: Page) -> Router {
    Router::new().fallback(move |method: Method, uri: Uri| {
        let page = page.clone();
        async move { page.respond(&method, &uri) }
    })
}

#[async_trait]
impl Task for HttpServerTask {
    const KIND: &'static str = "http_server";
    const SCHEMA: ParameterSchema = ParameterSchema::new(
        "HttpServerParameters",
        &[
            FieldSpec::required("port", PORT),
            FieldSpec::required("page_uri", FieldType::String),
            FieldSpec::required("data", FieldType::String),
        ],
    );
    type Params = HttpServerParameters;
    type Output = HttpServerReply;

    fn check(params: &HttpServerParameters) -> Result<(), ParamError> {
        if !params.page_uri.starts_with('/') {
            return Err(ParamError::new("page_uri", "must start with `/`"));
        }
        Ok(())
    }

    async fn execute(&self, params: HttpServerParameters) -> Result<HttpServerReply, TaskError> {
        let listener = TcpListener::bind((self.bind_host.as_str(), params.port)).await?;
        let local = listener.local_addr()?;

        let page = Page {
            uri: Arc::from(params.page_uri.as_str()),
            body: Arc::from(params.data),
        };
        let router = page_router(page);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                warn!(%local, error = %e, "page server stopped");
            }
        });
        info!(%local, page_uri = %params.page_uri, "page server started");

        Ok(HttpServerReply {
            port: local.port(),
            page_uri: params.page_uri,
        })
    }
}

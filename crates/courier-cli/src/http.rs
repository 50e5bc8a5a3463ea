//! HTTP front end
//!
//! - `POST /run_task`  : `{task_type, parameters}` → `{"result": …}`
//! - `POST /run_tasks` : `[{task_type, params}, …]` → slot ごとの結果
//! - `GET  /tasks`     : 登録済み kind と schema
//!
//! DispatchError の分類を HTTP status に対応付けるのはここだけです。

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use courier_core::{DispatchError, Dispatcher, ErrorClass, ParameterSchema, TaskKind, TaskRequest};
use serde::Serialize;
use serde_json::{Value, json};

use crate::report::SlotReport;

pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route("/run_task", post(run_task))
        .route("/run_tasks", post(run_tasks))
        .route("/tasks", get(list_tasks))
        .with_state(dispatcher)
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    field: Option<String>,
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        let status = match (&e, e.class()) {
            (DispatchError::DeadlineExceeded(_), _) => StatusCode::GATEWAY_TIMEOUT,
            (_, ErrorClass::NotFound) => StatusCode::NOT_FOUND,
            (_, ErrorClass::BadRequest) => StatusCode::BAD_REQUEST,
            (_, ErrorClass::OperationFailed) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
            field: e.field().map(str::to_string),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.message });
        if let Some(field) = self.field {
            body["field"] = Value::String(field);
        }
        (self.status, Json(body)).into_response()
    }
}

async fn run_task(
    State(dispatcher): State<Dispatcher>,
    Json(req): Json<TaskRequest>,
) -> Result<Json<Value>, ApiError> {
    let result = dispatcher
        .dispatch_one(req.task_type.as_str(), req.params)
        .await?;
    Ok(Json(json!({ "result": result.into_value() })))
}

async fn run_tasks(
    State(dispatcher): State<Dispatcher>,
    Json(requests): Json<Vec<TaskRequest>>,
) -> Json<Vec<SlotReport>> {
    let results = dispatcher.dispatch_many(requests).await;
    Json(results.into_iter().map(SlotReport::from).collect())
}

#[derive(Serialize)]
struct TaskInfo {
    kind: TaskKind,
    schema: ParameterSchema,
}

async fn list_tasks(State(dispatcher): State<Dispatcher>) -> Json<Vec<TaskInfo>> {
    let tasks = dispatcher
        .registry()
        .schemas()
        .into_iter()
        .map(|(kind, schema)| TaskInfo { kind, schema })
        .collect();
    Json(tasks)
}

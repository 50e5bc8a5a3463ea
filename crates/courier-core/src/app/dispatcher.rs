//! Dispatcher - task kind + raw parameters を実行結果に解決する
//!
//! 1. registry で kind を検索（無ければ `UnknownTaskKind`）
//! 2. schema でパラメータを検証（`InvalidParameters`、task 本体は動かない）
//! 3. 新しい Task インスタンスを作って実行（失敗は `TaskExecution`、リトライしない）
//!
//! バッチは 1 リクエスト = 1 tokio task で並行実行し、結果は入力順に返します。
//! 1 つの失敗が他のスロットを止めることはありません。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::join_all;
use tokio::task::JoinError;
use tracing::{Instrument, debug, info_span, warn};

use crate::domain::{RawParameters, RequestId, TaskKind, TaskRequest, TaskResult};
use crate::error::{DispatchError, TaskError};
use crate::ports::{IdGenerator, SystemClock, UlidGenerator};
use crate::typed::TaskRegistry;

/// Outcome of one batch slot.
pub type SlotResult = Result<TaskResult, DispatchError>;

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<TaskRegistry>,
    ids: Arc<dyn IdGenerator>,
    deadline: Option<Duration>,
}

impl Dispatcher {
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        Self {
            registry,
            ids: Arc::new(UlidGenerator::new(Arc::new(SystemClock))),
            deadline: None,
        }
    }

    /// Bound every dispatch (and every batch slot) by `deadline`.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Run one task.
    pub async fn dispatch_one(
        &self,
        kind: &str,
        raw: RawParameters,
    ) -> Result<TaskResult, DispatchError> {
        let request_id = self.ids.request_id();
        let span = info_span!("dispatch", %request_id, kind);
        self.run(request_id, kind, raw).instrument(span).await
    }

    /// Run all requests concurrently; `result[i]` belongs to `requests[i]`.
    pub async fn dispatch_many(&self, requests: Vec<TaskRequest>) -> Vec<SlotResult> {
        let batch_id = self.ids.batch_id();
        let batch_span = info_span!("dispatch_batch", %batch_id, size = requests.len());

        let handles: Vec<_> = requests
            .into_iter()
            .map(|req| {
                let this = self.clone();
                let request_id = self.ids.request_id();
                let span = info_span!(
                    parent: &batch_span,
                    "dispatch",
                    %request_id,
                    kind = %req.task_type
                );
                tokio::spawn(
                    async move { this.run(request_id, req.task_type.as_str(), req.params).await }
                        .instrument(span),
                )
            })
            .collect();

        let joined = join_all(handles).instrument(batch_span.clone()).await;

        let results: Vec<SlotResult> = joined
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|e| Err(join_failure(e))))
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        batch_span.in_scope(|| debug!(failed, "batch joined"));
        results
    }

    async fn run(
        &self,
        request_id: RequestId,
        kind: &str,
        raw: RawParameters,
    ) -> Result<TaskResult, DispatchError> {
        let entry = self.registry.lookup(kind).ok_or_else(|| {
            debug!("unknown task kind");
            DispatchError::UnknownTaskKind(TaskKind::new(kind))
        })?;

        let prepared = entry
            .schema()
            .coerce(raw)
            .and_then(|params| entry.prepare(params))
            .inspect_err(|e| debug!(field = %e.field, reason = %e.reason, "invalid parameters"))?;

        let body = AssertUnwindSafe(prepared.run())
            .catch_unwind()
            .map(|caught| match caught {
                Ok(res) => res.map_err(DispatchError::from),
                Err(payload) => Err(TaskError::Panicked(panic_message(payload)).into()),
            });

        let started = Instant::now();
        let outcome = match self.deadline {
            Some(limit) => tokio::time::timeout(limit, body)
                .await
                .unwrap_or(Err(DispatchError::DeadlineExceeded(limit))),
            None => body.await,
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(value) => {
                debug!(%request_id, elapsed_ms, "task completed");
                Ok(TaskResult::new(TaskKind::new(entry.kind()), value))
            }
            Err(e) => {
                warn!(%request_id, elapsed_ms, error = %e, "task failed");
                Err(e)
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

fn join_failure(e: JoinError) -> DispatchError {
    let cause = if e.is_panic() {
        panic_message(e.into_panic())
    } else {
        "task was cancelled".to_string()
    };
    DispatchError::TaskExecution(TaskError::Panicked(cause))
}

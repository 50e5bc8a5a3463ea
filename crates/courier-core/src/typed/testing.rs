//! テスト用の Task 型

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::schema::{FieldSpec, FieldType, ParamError, ParameterSchema};
use super::task::Task;
use crate::error::TaskError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EchoParameters {
    pub message: String,
}

pub struct EchoTask;

#[async_trait]
impl Task for EchoTask {
    const KIND: &'static str = "echo";
    const SCHEMA: ParameterSchema = ParameterSchema::new(
        "EchoParameters",
        &[FieldSpec::required("message", FieldType::String)],
    );
    type Params = EchoParameters;
    type Output = String;

    async fn execute(&self, params: EchoParameters) -> Result<String, TaskError> {
        Ok(params.message)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrictParameters {
    pub value: i64,
}

/// Rejects negative values in `check`, panics if the body ever runs with one.
pub struct StrictTask;

#[async_trait]
impl Task for StrictTask {
    const KIND: &'static str = "strict";
    const SCHEMA: ParameterSchema = ParameterSchema::new(
        "StrictParameters",
        &[FieldSpec::required(
            "value",
            FieldType::Integer {
                min: i64::MIN,
                max: i64::MAX,
            },
        )],
    );
    type Params = StrictParameters;
    type Output = i64;

    fn check(params: &StrictParameters) -> Result<(), ParamError> {
        if params.value < 0 {
            return Err(ParamError::new("value", "must not be negative"));
        }
        Ok(())
    }

    async fn execute(&self, params: StrictParameters) -> Result<i64, TaskError> {
        assert!(params.value >= 0, "body ran with unchecked parameters");
        Ok(params.value)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelayParameters {
    pub label: String,
    pub delay_ms: u64,
    #[serde(default)]
    pub fail: bool,
}

/// Sleeps, then returns its label (or fails with it).
pub struct DelayTask;

#[async_trait]
impl Task for DelayTask {
    const KIND: &'static str = "delay";
    const SCHEMA: ParameterSchema = ParameterSchema::new(
        "DelayParameters",
        &[
            FieldSpec::required("label", FieldType::String),
            FieldSpec::required(
                "delay_ms",
                FieldType::Integer {
                    min: 0,
                    max: 60_000,
                },
            ),
            FieldSpec::optional("fail", FieldType::Any),
        ],
    );
    type Params = DelayParameters;
    type Output = String;

    async fn execute(&self, params: DelayParameters) -> Result<String, TaskError> {
        tokio::time::sleep(Duration::from_millis(params.delay_ms)).await;
        if params.fail {
            return Err(TaskError::Other(format!("{} failed", params.label)));
        }
        Ok(params.label)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PanicParameters {}

pub struct PanicTask;

#[async_trait]
impl Task for PanicTask {
    const KIND: &'static str = "panic";
    const SCHEMA: ParameterSchema = ParameterSchema::new("PanicParameters", &[]);
    type Params = PanicParameters;
    type Output = ();

    async fn execute(&self, _params: PanicParameters) -> Result<(), TaskError> {
        panic!("boom");
    }
}

//! Per-slot batch outcome as printed by `batch` and returned by `/run_tasks`.

use courier_core::ErrorClass;
use courier_core::app::SlotResult;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SlotReport {
    Ok {
        ok: Value,
    },
    Err {
        error: String,
        class: ErrorClass,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },
}

impl From<SlotResult> for SlotReport {
    fn from(slot: SlotResult) -> Self {
        match slot {
            Ok(result) => SlotReport::Ok {
                ok: result.into_value(),
            },
            Err(e) => SlotReport::Err {
                error: e.to_string(),
                class: e.class(),
                field: e.field().map(str::to_string),
            },
        }
    }
}

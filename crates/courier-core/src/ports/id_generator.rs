//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: Clock の時刻 + 乱数で ULID を作る

use std::sync::Arc;

use ulid::Ulid;

use crate::domain::{BatchId, RequestId};
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn request_id(&self) -> RequestId;

    fn batch_id(&self) -> BatchId;
}

pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn next(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl IdGenerator for UlidGenerator {
    fn request_id(&self) -> RequestId {
        RequestId::from(self.next())
    }

    fn batch_id(&self) -> BatchId {
        BatchId::from(self.next())
    }
}

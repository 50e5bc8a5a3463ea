//! Ports - 時刻と ID 生成の抽象化

pub mod clock;
pub mod id_generator;

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};

//! App - registry の構築と dispatch
//!
//! - `RegistryBuilder`: 起動時に task kind を登録し、期待集合をチェック
//! - `Dispatcher`: 単発 / バッチの実行入口

pub mod builder;
pub mod dispatcher;

pub use builder::{BuildError, RegistryBuilder};
pub use dispatcher::{Dispatcher, SlotResult};

//! Typed - 型付き Task API
//!
//! # 二層構造
//! - **表層（Typed）**: `Task` trait - 型付きパラメータと出力
//! - **内部（Dyn）**: `DynTask` trait - object-safe, type erasure
//!
//! パラメータ検証は `ParameterSchema::coerce` に一本化されています。

pub mod handler;
pub mod registry;
pub mod schema;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use self::handler::{DynTask, PreparedTask, TaskEntry};
pub use self::registry::{RegistryError, TaskRegistry};
pub use self::schema::{FieldSpec, FieldType, ParamError, ParameterSchema, ValidatedParameters};
pub use self::task::Task;

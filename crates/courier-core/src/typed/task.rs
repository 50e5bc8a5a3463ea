//! Task trait - 型付き Task の定義
//!
//! task kind ごとに「識別子・パラメータ schema・型付きパラメータ・出力型」を
//! 静的に結びつけます。task 本体は検証済みの `Params` しか受け取りません。

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::schema::{ParamError, ParameterSchema};
use crate::error::TaskError;

/// Task は task kind と型を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Deserialize)]
/// #[serde(deny_unknown_fields)]
/// struct EchoParameters {
///     message: String,
/// }
///
/// struct EchoTask;
///
/// #[async_trait]
/// impl Task for EchoTask {
///     const KIND: &'static str = "echo";
///     const SCHEMA: ParameterSchema = ParameterSchema::new(
///         "EchoParameters",
///         &[FieldSpec::required("message", FieldType::String)],
///     );
///     type Params = EchoParameters;
///     type Output = String;
///
///     async fn execute(&self, params: EchoParameters) -> Result<String, TaskError> {
///         Ok(params.message)
///     }
/// }
/// ```
///
/// # 契約
/// - `SCHEMA` は `Params` が読む全フィールドを宣言する
/// - `check` は検証の一部で、副作用を持たない
/// - 1 回の dispatch につき新しいインスタンスが作られる（状態を持ち越さない）
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Registry key, e.g. `"port_scan"`.
    const KIND: &'static str;

    const SCHEMA: ParameterSchema;

    type Params: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    /// Cross-field validation that the schema alone cannot express.
    fn check(_params: &Self::Params) -> Result<(), ParamError> {
        Ok(())
    }

    async fn execute(&self, params: Self::Params) -> Result<Self::Output, TaskError>;
}

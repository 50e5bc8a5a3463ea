//! ParameterSchema - 全 task 共通のパラメータ検証
//!
//! RawParameters（型なし JSON）を、task ごとの schema に従って検証・正規化します。
//! 検証は task 本体の実行前に一度だけ行われ、task 側は型付きの値だけを受け取ります。
//!
//! # 検証内容
//! - 必須フィールドの存在
//! - 型変換（整数文字列 → 整数、enum は大文字に正規化）
//! - 未知フィールドの拒否（typo を早期に検出）

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::domain::RawParameters;

/// Inclusive bounds for TCP/UDP port fields.
pub const PORT: FieldType = FieldType::Integer {
    min: 0,
    max: u16::MAX as i64,
};

/// Inclusive bounds for process id fields.
pub const PID: FieldType = FieldType::Integer {
    min: 0,
    max: u32::MAX as i64,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer { min: i64, max: i64 },
    /// Case-insensitive on input, normalised to the declared spelling.
    Enum { variants: &'static [&'static str] },
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    #[serde(flatten)]
    pub ty: FieldType,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
        }
    }
}

/// Accepted shape of one task kind's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParameterSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

/// A parameter bundle rejected by schema coercion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field `{field}`: {reason}")]
pub struct ParamError {
    pub field: String,
    pub reason: String,
}

impl ParamError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, "required field is missing")
    }

    pub fn unknown(field: impl Into<String>) -> Self {
        Self::new(field, "unknown field")
    }

    fn mistyped(field: &str, expected: &str, got: &Value) -> Self {
        Self::new(field, format!("expected {expected}, got {}", json_kind(got)))
    }
}

/// Parameters that passed schema coercion. Only the dispatcher creates these.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedParameters(Map<String, Value>);

impl ValidatedParameters {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Decode into the task's typed parameter record.
    pub fn decode<P: DeserializeOwned>(self) -> Result<P, ParamError> {
        serde_json::from_value(Value::Object(self.0))
            .map_err(|e| ParamError::new("params", e.to_string()))
    }
}

impl ParameterSchema {
    pub const fn new(name: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self { name, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate and normalise a raw bundle.
    ///
    /// `null` is treated as an empty bundle so that missing fields are reported
    /// by name. Optional fields given as `null` are treated as absent.
    pub fn coerce(&self, raw: RawParameters) -> Result<ValidatedParameters, ParamError> {
        let mut input = match raw {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => return Err(ParamError::mistyped("params", "an object", &other)),
        };

        if let Some(unknown) = input.keys().find(|k| self.field(k).is_none()) {
            return Err(ParamError::unknown(unknown.as_str()));
        }

        let mut out = Map::with_capacity(self.fields.len());
        for spec in self.fields {
            match input.remove(spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        return Err(ParamError::missing(spec.name));
                    }
                }
                Some(value) => {
                    let value = coerce_value(spec, value)?;
                    out.insert(spec.name.to_string(), value);
                }
            }
        }
        Ok(ValidatedParameters(out))
    }
}

fn coerce_value(spec: &FieldSpec, value: Value) -> Result<Value, ParamError> {
    match spec.ty {
        FieldType::Any => Ok(value),
        FieldType::String => match value {
            Value::String(_) => Ok(value),
            other => Err(ParamError::mistyped(spec.name, "a string", &other)),
        },
        FieldType::Integer { min, max } => {
            let n = as_integer(&value)
                .ok_or_else(|| ParamError::mistyped(spec.name, "an integer", &value))?;
            if n < min || n > max {
                return Err(ParamError::new(
                    spec.name,
                    format!("{n} is out of range {min}..={max}"),
                ));
            }
            Ok(Value::from(n))
        }
        FieldType::Enum { variants } => {
            let Value::String(s) = &value else {
                return Err(ParamError::mistyped(spec.name, "a string", &value));
            };
            variants
                .iter()
                .find(|v| v.eq_ignore_ascii_case(s.trim()))
                .map(|v| Value::String((*v).to_string()))
                .ok_or_else(|| {
                    ParamError::new(
                        spec.name,
                        format!("`{s}` is not one of {}", variants.join(", ")),
                    )
                })
        }
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    const SAMPLE: ParameterSchema = ParameterSchema::new(
        "SampleParameters",
        &[
            FieldSpec::required("host", FieldType::String),
            FieldSpec::required("port", PORT),
            FieldSpec::required(
                "action",
                FieldType::Enum {
                    variants: &["GET", "SET"],
                },
            ),
            FieldSpec::optional("value", FieldType::Any),
        ],
    );

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Sample {
        host: String,
        port: u16,
        action: String,
        value: Option<Value>,
    }

    #[test]
    fn valid_bundle_decodes() {
        let v = SAMPLE
            .coerce(json!({"host": "h", "port": 80, "action": "GET"}))
            .unwrap();
        let s: Sample = v.decode().unwrap();
        assert_eq!(s.host, "h");
        assert_eq!(s.port, 80);
        assert!(s.value.is_none());
    }

    #[test]
    fn missing_required_field_is_named() {
        let err = SAMPLE.coerce(json!({"host": "h", "action": "GET"})).unwrap_err();
        assert_eq!(err.field, "port");
        assert!(err.reason.contains("missing"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = SAMPLE
            .coerce(json!({"host": "h", "port": 1, "action": "GET", "hots": "typo"}))
            .unwrap_err();
        assert_eq!(err, ParamError::unknown("hots"));
    }

    #[test]
    fn integer_strings_are_coerced() {
        let v = SAMPLE
            .coerce(json!({"host": "h", "port": " 8080 ", "action": "GET"}))
            .unwrap();
        assert_eq!(v.get("port"), Some(&json!(8080)));
    }

    #[test]
    fn integer_out_of_range_is_rejected() {
        let err = SAMPLE
            .coerce(json!({"host": "h", "port": 70000, "action": "GET"}))
            .unwrap_err();
        assert_eq!(err.field, "port");
        assert!(err.reason.contains("out of range"));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let err = SAMPLE
            .coerce(json!({"host": 42, "port": 1, "action": "GET"}))
            .unwrap_err();
        assert_eq!(err.field, "host");
        assert!(err.reason.contains("expected a string"));

        let err = SAMPLE
            .coerce(json!({"host": "h", "port": true, "action": "GET"}))
            .unwrap_err();
        assert_eq!(err.field, "port");
    }

    #[test]
    fn enum_is_case_insensitive_and_normalised() {
        let v = SAMPLE
            .coerce(json!({"host": "h", "port": 1, "action": "set"}))
            .unwrap();
        assert_eq!(v.get("action"), Some(&json!("SET")));

        let err = SAMPLE
            .coerce(json!({"host": "h", "port": 1, "action": "PUT"}))
            .unwrap_err();
        assert_eq!(err.field, "action");
    }

    #[test]
    fn null_bundle_reports_first_missing_field() {
        let err = SAMPLE.coerce(Value::Null).unwrap_err();
        assert_eq!(err.field, "host");
    }

    #[test]
    fn non_object_bundle_is_rejected() {
        let err = SAMPLE.coerce(json!([1, 2])).unwrap_err();
        assert_eq!(err.field, "params");
    }

    #[test]
    fn optional_null_is_absent() {
        let v = SAMPLE
            .coerce(json!({"host": "h", "port": 1, "action": "GET", "value": null}))
            .unwrap();
        assert!(v.get("value").is_none());
    }

    #[test]
    fn schema_serializes_for_introspection() {
        let v = serde_json::to_value(SAMPLE).unwrap();
        assert_eq!(v["fields"][1]["name"], "port");
        assert_eq!(v["fields"][1]["type"], "integer");
        assert_eq!(v["fields"][1]["max"], 65535);
    }
}

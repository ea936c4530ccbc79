use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const RESPONSE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Ok,
    Error,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HintKind {
    Info,
    Action,
    Warn,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct Hint {
    #[serde(rename = "type")]
    pub kind: HintKind,
    pub text: String,
}

impl Hint {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: HintKind::Info,
            text: text.into(),
        }
    }

    pub fn action(text: impl Into<String>) -> Self {
        Self {
            kind: HintKind::Action,
            text: text.into(),
        }
    }

    pub fn warn(text: impl Into<String>) -> Self {
        Self {
            kind: HintKind::Warn,
            text: text.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
    pub hint: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, JsonSchema)]
pub struct ResponseMeta {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Envelope printed on stdout for every command
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct Response {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub meta: ResponseMeta,
}

impl Response {
    pub fn ok(data: Value) -> Self {
        Self {
            status: ResponseStatus::Ok,
            message: None,
            error: None,
            hints: Vec::new(),
            data,
            meta: ResponseMeta {
                schema_version: RESPONSE_SCHEMA_VERSION,
                ..Default::default()
            },
        }
    }

    pub fn error(error: ErrorEnvelope) -> Self {
        let mut hints = Vec::new();
        if let Some(hint) = &error.hint {
            hints.push(Hint::action(hint.clone()));
        }
        Self {
            status: ResponseStatus::Error,
            message: Some(error.message.clone()),
            error: Some(error),
            hints,
            data: Value::Null,
            meta: ResponseMeta {
                schema_version: RESPONSE_SCHEMA_VERSION,
                ..Default::default()
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, ResponseStatus::Error)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct CapabilitiesServer {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct DefaultSettings {
    pub rate_max: f64,
    pub rate_tolerance: f64,
    pub funding_tolerance: f64,
    pub deviation_threshold: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct Capabilities {
    pub schema_version: u32,
    pub server: CapabilitiesServer,
    pub actions: Vec<String>,
    pub defaults: DefaultSettings,
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

/// JSON Schema of [`Response`], pretty-printed
pub fn response_schema() -> Result<String> {
    let schema = schemars::schema_for!(Response);
    serde_json::to_string_pretty(&schema).map_err(Into::into)
}

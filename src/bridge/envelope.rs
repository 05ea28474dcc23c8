use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response shape of every host call: `{success, result}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
}

/// Payload the plugin backend wraps its return value in: `{code, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPayload {
    pub code: i64,
    #[serde(default)]
    pub data: Value,
}

impl CallEnvelope {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            result: Some(serde_json::json!({ "code": 0, "data": data })),
        }
    }

    pub fn empty() -> Self {
        Self {
            success: true,
            result: None,
        }
    }

    pub fn rejected(code: i64, data: Value) -> Self {
        Self {
            success: true,
            result: Some(serde_json::json!({ "code": code, "data": data })),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            result: Some(Value::String(reason.into())),
        }
    }

    /// Compact JSON form used in log lines.
    pub fn to_log_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

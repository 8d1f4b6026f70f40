//! JSON-RPC 2.0 envelope used by the Zabbix API

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version tag carried by every request
pub const JSONRPC_VERSION: &str = "2.0";

/// A single JSON-RPC call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
    pub id: u64,
}

impl RpcRequest {
    /// Build a request for `method` with the given params
    pub fn new(method: impl Into<String>, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// Reply to a JSON-RPC call
///
/// Exactly one of `result` and `error` is expected to be present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub id: Option<u64>,
}

/// Structured error object returned by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            Some(data) if !data.is_empty() => {
                write!(f, "{} ({}): {}", self.message, self.code, data)
            }
            _ => write!(f, "{} ({})", self.message, self.code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let req = RpcRequest::new("apiinfo.version", json!({}), 7);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({"jsonrpc": "2.0", "method": "apiinfo.version", "params": {}, "id": 7})
        );
    }

    #[test]
    fn test_error_response_parses() {
        let body = r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Invalid params.","data":"Incorrect user name or password or account is temporarily blocked."},"id":1}"#;
        let resp: RpcResponse = serde_json::from_str(body).unwrap();
        assert!(resp.result.is_none());
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32602);
        assert!(err.to_string().contains("Incorrect user name"));
    }

    #[test]
    fn test_error_display_without_data() {
        let err = RpcError {
            code: -32500,
            message: "Application error.".to_string(),
            data: None,
        };
        assert_eq!(err.to_string(), "Application error. (-32500)");
    }
}

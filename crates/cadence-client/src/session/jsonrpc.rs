//! JSON-RPC 2.0 message types for the language server channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    /// Protocol version, always "2.0".
    pub jsonrpc: &'static str,
    /// Correlation id pairing the request with its response.
    pub id: i64,
    /// The method to invoke.
    pub method: String,
    /// Optional parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a new request with the given correlation id.
    #[must_use]
    pub fn with_id(id: i64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 notification (no response expected).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    /// Protocol version, always "2.0".
    pub jsonrpc: &'static str,
    /// The method to invoke.
    pub method: String,
    /// Optional parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Creates a new notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response message.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version.
    pub jsonrpc: String,
    /// Correlation id this response corresponds to.
    pub id: Option<i64>,
    /// The result on success.
    #[serde(default)]
    pub result: Option<Value>,
    /// The error on failure.
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional data.
    #[serde(default)]
    pub data: Option<Value>,
}

/// A request initiated by the server.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    /// Correlation id chosen by the server (number or string).
    pub id: Value,
    /// The method the server wants invoked.
    pub method: String,
    /// Optional parameters.
    pub params: Option<Value>,
}

/// A notification initiated by the server.
#[derive(Debug, Clone)]
pub struct ServerNotification {
    /// The notification method.
    pub method: String,
    /// Optional parameters.
    pub params: Option<Value>,
}

/// Any message the server may deliver on the channel.
#[derive(Debug, Clone)]
pub enum ServerMessage {
    /// A response to a client request.
    Response(JsonRpcResponse),
    /// A server-initiated request.
    Request(ServerRequest),
    /// A server-initiated notification.
    Notification(ServerNotification),
}

/// Raw shape used to classify an incoming frame before full decoding.
#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

impl ServerMessage {
    /// Classifies and decodes one frame received from the server.
    ///
    /// A frame carrying a `method` is a server request (with an id) or a
    /// notification (without one); anything else is a response.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error when the frame is not a
    /// JSON-RPC message.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawMessage = serde_json::from_slice(bytes)?;
        match raw.method {
            Some(method) => match raw.id {
                Some(id) => Ok(Self::Request(ServerRequest {
                    id,
                    method,
                    params: raw.params,
                })),
                None => Ok(Self::Notification(ServerNotification {
                    method,
                    params: raw.params,
                })),
            },
            None => Ok(Self::Response(JsonRpcResponse {
                jsonrpc: "2.0".to_owned(),
                id: raw.id.as_ref().and_then(Value::as_i64),
                result: raw.result,
                error: raw.error,
            })),
        }
    }
}

//! Request and response types for the PersonaMem API.
//!
//! Request DTOs serialize as snake_case JSON to match the server models.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;

/// HTTP verbs the executor issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!("unsupported method: {}", other)),
        }
    }
}

/// What UI code asks the executor to send.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutgoingRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl OutgoingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Decoded response of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult {
    /// Body parsed as JSON.
    Json(Value),
    /// Body that is not valid JSON, returned as received.
    Text(String),
    /// Successful response with an empty body.
    NoContent,
}

impl ApiResult {
    pub fn is_no_content(&self) -> bool {
        matches!(self, ApiResult::NoContent)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiResult::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ApiResult::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Decode a JSON result into `T`.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            ApiResult::Json(v) => serde_json::from_value(v)
                .map_err(|e| ApiError::UnexpectedResponse(e.to_string())),
            ApiResult::Text(t) => Err(ApiError::UnexpectedResponse(format!(
                "expected JSON, got text: {}",
                t
            ))),
            ApiResult::NoContent => Err(ApiError::UnexpectedResponse(
                "expected JSON, got an empty body".to_string(),
            )),
        }
    }
}

/// Failure body convention: `{"detail": ...}`.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

/// GET /me
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: Option<String>,
}

/// POST /chat; without `session_id` the server opens a new conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: None,
        }
    }

    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// One entry of GET /sessions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionSummary {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub message_count: Option<u64>,
}

/// One entry of GET /memories.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryRecord {
    pub id: String,
    pub memory_type: String,
    pub content: String,
    #[serde(default)]
    pub importance_score: Option<f64>,
    #[serde(default)]
    pub reinforcement_count: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// PUT /profile; absent fields are left unchanged by the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expertise_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goals: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality_tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// PUT /memory
#[derive(Debug, Clone, Serialize)]
pub struct MemoryUpsert {
    pub content: String,
    pub memory_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl MemoryUpsert {
    pub fn semantic(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            memory_type: "semantic".to_string(),
            metadata: None,
        }
    }
}

/// `{"message": ...}` acknowledgement returned by mutating routes.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

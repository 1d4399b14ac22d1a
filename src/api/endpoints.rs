//! PersonaMem routes on top of the request executor.
//!
//! Each helper builds the path (percent-encoding user input) and delegates to
//! `ApiClient`, so session handling is identical for every route.

use super::client::ApiClient;
use super::error::ApiError;
use super::transport::Transport;
use super::types::{
    ApiResult, ChatRequest, MeResponse, MemoryRecord, MemoryUpsert, MessageResponse, Method, ProfileUpdate,
    SessionSummary,
};

/// Server-side cap on GET /memories `limit`.
pub const MAX_MEMORY_LIMIT: u32 = 200;

/// Server-side cap on GET /memory/search `top_k`.
pub const MAX_SEARCH_TOP_K: u32 = 20;

pub const DEFAULT_MEMORY_LIMIT: u32 = 50;
pub const DEFAULT_SEARCH_TOP_K: u32 = 5;

fn to_value<B: serde::Serialize>(body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::InvalidArgument(e.to_string()))
}

/// GET /me
pub async fn me<T: Transport>(client: &ApiClient<T>) -> Result<MeResponse, ApiError> {
    client.get("/me").await?.json()
}

/// POST /chat
///
/// The reply is streamed as plain text and collected whole. A reply that
/// happens to parse as JSON is turned back into its text.
pub async fn chat<T: Transport>(
    client: &ApiClient<T>,
    request: &ChatRequest,
) -> Result<String, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::InvalidArgument(
            "chat message must not be empty".to_string(),
        ));
    }
    let reply = client.post("/chat", &to_value(request)?).await?;
    Ok(match reply {
        ApiResult::Text(text) => text,
        ApiResult::Json(serde_json::Value::String(text)) => text,
        ApiResult::Json(value) => value.to_string(),
        ApiResult::NoContent => String::new(),
    })
}

/// GET /sessions
pub async fn sessions<T: Transport>(
    client: &ApiClient<T>,
) -> Result<Vec<SessionSummary>, ApiError> {
    client.get("/sessions").await?.json()
}

/// GET /session/{id}; the transcript shape is left to the caller.
pub async fn session<T: Transport>(
    client: &ApiClient<T>,
    session_id: &str,
) -> Result<ApiResult, ApiError> {
    let path = format!("/session/{}", urlencoding::encode(session_id));
    client.get(&path).await
}

/// GET /profile
pub async fn profile<T: Transport>(client: &ApiClient<T>) -> Result<ApiResult, ApiError> {
    client.get("/profile").await
}

/// PUT /profile
pub async fn update_profile<T: Transport>(
    client: &ApiClient<T>,
    update: &ProfileUpdate,
) -> Result<ApiResult, ApiError> {
    client.put("/profile", &to_value(update)?).await
}

/// GET /memories?memory_type={type}&limit={n}
pub async fn memories<T: Transport>(
    client: &ApiClient<T>,
    memory_type: Option<&str>,
    limit: u32,
) -> Result<Vec<MemoryRecord>, ApiError> {
    let mut path = format!("/memories?limit={}", limit.min(MAX_MEMORY_LIMIT));
    if let Some(kind) = memory_type {
        path.push_str(&format!("&memory_type={}", urlencoding::encode(kind)));
    }
    client.get(&path).await?.json()
}

/// PUT /memory
pub async fn upsert_memory<T: Transport>(
    client: &ApiClient<T>,
    memory: &MemoryUpsert,
) -> Result<ApiResult, ApiError> {
    client.put("/memory", &to_value(memory)?).await
}

/// DELETE /memory/{id}
pub async fn delete_memory<T: Transport>(
    client: &ApiClient<T>,
    memory_id: &str,
) -> Result<MessageResponse, ApiError> {
    let path = format!("/memory/{}", urlencoding::encode(memory_id));
    client.delete(&path).await?.json()
}

/// POST /memory/rebuild-index
pub async fn rebuild_index<T: Transport>(
    client: &ApiClient<T>,
) -> Result<MessageResponse, ApiError> {
    client
        .execute("/memory/rebuild-index", Method::Post, None)
        .await?
        .json()
}

/// GET /memory/search?q={query}&top_k={n}
pub async fn search_memories<T: Transport>(
    client: &ApiClient<T>,
    query: &str,
    top_k: u32,
) -> Result<ApiResult, ApiError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::InvalidArgument(
            "search query must not be empty".to_string(),
        ));
    }
    let path = format!(
        "/memory/search?q={}&top_k={}",
        urlencoding::encode(query),
        top_k.clamp(1, MAX_SEARCH_TOP_K)
    );
    client.get(&path).await
}

/// GET /metrics
pub async fn metrics<T: Transport>(client: &ApiClient<T>) -> Result<ApiResult, ApiError> {
    client.get("/metrics").await
}

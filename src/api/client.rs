//! Authenticated request executor.
//!
//! Every call carries `Authorization: Bearer <token>` read from the session
//! store. A missing token or a 401 response ends the session: the store is
//! wiped and the navigator sends the user back to the entry point before the
//! error reaches the caller.

use std::sync::Arc;

use serde_json::Value;

use super::error::ApiError;
use super::transport::{HttpRequest, HttpResponse, Transport};
use super::types::{ApiResult, ErrorBody, Method, OutgoingRequest};
use crate::navigation::Navigator;
use crate::session::Session;

/// Content type attached to every request.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Status the server uses to reject a session token.
const STATUS_UNAUTHORIZED: u16 = 401;

/// HTTP client wrapper for PersonaMem API communication.
pub struct ApiClient<T: Transport> {
    transport: T,
    session: Session,
    navigator: Arc<dyn Navigator>,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, session: Session, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            transport,
            session,
            navigator,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send an authenticated request and decode the response.
    pub async fn execute(
        &self,
        path: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<ApiResult, ApiError> {
        let Some(token) = self.session.token() else {
            log::info!("No session token for {} {}, redirecting", method, path);
            self.navigator.redirect_to_entry();
            return Err(ApiError::AuthenticationRequired);
        };

        let request = HttpRequest {
            method,
            path: path.to_string(),
            headers: vec![
                ("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string()),
                ("Authorization".to_string(), format!("Bearer {}", token)),
            ],
            body: body.map(|b| b.to_string()),
        };

        let resp = self.transport.send(request).await?;

        if resp.status == STATUS_UNAUTHORIZED {
            log::warn!("{} {} rejected with 401, ending session", method, path);
            self.end_session();
            return Err(ApiError::SessionExpired);
        }

        if !resp.is_success() {
            let detail = error_detail(&resp);
            log::debug!("{} {} failed ({}): {}", method, path, resp.status, detail);
            return Err(ApiError::RequestFailed {
                status: resp.status,
                detail,
            });
        }

        Ok(decode_body(resp.body))
    }

    pub async fn send(&self, request: &OutgoingRequest) -> Result<ApiResult, ApiError> {
        self.execute(&request.path, request.method, request.body.as_ref())
            .await
    }

    pub async fn get(&self, path: &str) -> Result<ApiResult, ApiError> {
        self.execute(path, Method::Get, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<ApiResult, ApiError> {
        self.execute(path, Method::Post, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<ApiResult, ApiError> {
        self.execute(path, Method::Put, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResult, ApiError> {
        self.execute(path, Method::Delete, None).await
    }

    /// Wipe the session store and send the user to the entry point.
    ///
    /// Used for explicit logout and for server-rejected tokens. A store that
    /// fails to clear is logged; the redirect still happens.
    pub fn end_session(&self) {
        if let Err(e) = self.session.clear() {
            log::error!("Failed to clear session store: {}", e);
        }
        self.navigator.redirect_to_entry();
    }
}

/// Best-effort failure message from a non-success response.
fn error_detail(resp: &HttpResponse) -> String {
    let detail = serde_json::from_str::<ErrorBody>(&resp.body)
        .ok()
        .and_then(|b| b.detail);

    match detail {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => format!("Request failed with status {}", resp.status),
        Some(other) => other.to_string(),
    }
}

/// Empty body is no content; unparseable JSON is handed back as text.
fn decode_body(body: String) -> ApiResult {
    if body.is_empty() {
        return ApiResult::NoContent;
    }
    match serde_json::from_str::<Value>(&body) {
        Ok(value) => ApiResult::Json(value),
        Err(_) => ApiResult::Text(body),
    }
}

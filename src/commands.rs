//! Command handlers for the `persona` front end.
//!
//! Each handler drives the library the way page scripts drive it in the
//! browser: API calls through the executor, failures through the toaster,
//! output through the formatters.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::api::endpoints;
use crate::api::types::{ChatRequest, MemoryRecord, MemoryUpsert, ProfileUpdate, SessionSummary};
use crate::api::{ApiError, ApiResult, Method};
use crate::debounce::{debounce, Debounced};
use crate::format::{abbreviate, escape_html, relative_time_at};
use crate::session::{SessionError, StoreError};
use crate::state::AppState;

/// Quiet period before an interactive search is sent.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Invalid JSON body: {0}")]
    Body(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CommandError {
    /// Failures that already ended the session (and were reported by the
    /// navigator) do not need another notification.
    pub fn is_auth(&self) -> bool {
        matches!(self, CommandError::Api(e) if e.is_auth())
    }
}

// ── Session ──────────────────────────────────────────────────────────────

pub fn set_token(state: &AppState, token: &str) -> Result<(), CommandError> {
    state.session().set_token(token.trim())?;
    state.toaster.success("Session token saved");
    Ok(())
}

pub fn show_token(state: &AppState) -> Result<(), CommandError> {
    let subject = state.session().subject()?;
    println!("{}", subject);
    Ok(())
}

pub fn clear_store(state: &AppState) -> Result<(), CommandError> {
    state.session().clear()?;
    state.toaster.present("Local storage cleared", Default::default());
    Ok(())
}

pub fn logout(state: &AppState) {
    log::info!("Logging out");
    state.api.end_session();
}

// ── Raw requests ─────────────────────────────────────────────────────────

pub async fn request(
    state: &AppState,
    method: Method,
    path: &str,
    data: Option<&str>,
) -> Result<(), CommandError> {
    let body = data.map(serde_json::from_str::<Value>).transpose()?;
    let result = state.api.execute(path, method, body.as_ref()).await?;
    println!("{}", render_result(&result));
    Ok(())
}

// ── Routes ───────────────────────────────────────────────────────────────

pub async fn me(state: &AppState) -> Result<(), CommandError> {
    let me = endpoints::me(&state.api).await?;
    println!(
        "{} <{}>  joined {}",
        me.username,
        me.email,
        relative_time_at(me.created_at.as_deref(), Utc::now())
    );
    println!("id: {}", me.id);
    Ok(())
}

pub async fn chat(
    state: &AppState,
    message: &str,
    session_id: Option<&str>,
) -> Result<(), CommandError> {
    let mut request = ChatRequest::new(message);
    if let Some(id) = session_id {
        request = request.in_session(id);
    }
    let reply = endpoints::chat(&state.api, &request).await?;
    println!("{}", reply);
    Ok(())
}

pub async fn sessions(state: &AppState, html: bool) -> Result<(), CommandError> {
    let sessions = endpoints::sessions(&state.api).await?;
    let now = Utc::now();
    if html {
        println!("{}", render_sessions_html(&sessions, now));
    } else {
        print!("{}", render_sessions_text(&sessions, now));
    }
    Ok(())
}

pub async fn session(state: &AppState, id: &str) -> Result<(), CommandError> {
    let result = endpoints::session(&state.api, id).await?;
    println!("{}", render_result(&result));
    Ok(())
}

pub async fn profile(state: &AppState) -> Result<(), CommandError> {
    let result = endpoints::profile(&state.api).await?;
    println!("{}", render_result(&result));
    Ok(())
}

pub async fn update_profile(state: &AppState, update: &ProfileUpdate) -> Result<(), CommandError> {
    endpoints::update_profile(&state.api, update).await?;
    state.toaster.success("Profile updated");
    Ok(())
}

pub async fn memories(
    state: &AppState,
    memory_type: Option<&str>,
    limit: u32,
    html: bool,
) -> Result<(), CommandError> {
    let memories = endpoints::memories(&state.api, memory_type, limit).await?;
    let now = Utc::now();
    if html {
        println!("{}", render_memories_html(&memories, now));
    } else {
        for mem in &memories {
            println!(
                "{}  [{}] {}  ({})",
                mem.id,
                mem.memory_type,
                mem.content,
                relative_time_at(mem.timestamp.as_deref(), now)
            );
        }
    }
    Ok(())
}

pub async fn remember(
    state: &AppState,
    content: &str,
    memory_type: &str,
) -> Result<(), CommandError> {
    let memory = MemoryUpsert {
        memory_type: memory_type.to_string(),
        ..MemoryUpsert::semantic(content)
    };
    endpoints::upsert_memory(&state.api, &memory).await?;
    state.toaster.success("Memory stored");
    Ok(())
}

pub async fn forget(state: &AppState, id: &str) -> Result<(), CommandError> {
    let ack = endpoints::delete_memory(&state.api, id).await?;
    state.toaster.success(&ack.message);
    Ok(())
}

pub async fn search(state: &AppState, query: &str, top_k: u32) -> Result<(), CommandError> {
    let result = endpoints::search_memories(&state.api, query, top_k).await?;
    println!("{}", render_result(&result));
    Ok(())
}

/// Search as you type: each stdin line is a query, debounced so only the
/// last line of a burst hits the server.
pub async fn search_interactive(state: Arc<AppState>, top_k: u32) -> Result<(), CommandError> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let submit = debounce(
        move |query: String| {
            let _ = tx.send(query);
        },
        SEARCH_DEBOUNCE,
    );

    let reader = tokio::spawn(pump_queries(BufReader::new(tokio::io::stdin()), submit));

    while let Some(query) = rx.recv().await {
        match endpoints::search_memories(&state.api, &query, top_k).await {
            Ok(result) => println!("{}", render_result(&result)),
            Err(ApiError::InvalidArgument(_)) => {}
            Err(e) if e.is_auth() => {
                reader.abort();
                return Err(e.into());
            }
            Err(e) => state.toaster.error(&e.to_string()),
        }
    }

    let _ = reader.await;
    Ok(())
}

/// Feed every line of `input` to `submit` until EOF or a read error.
///
/// `submit` is dropped on return; a call still pending fires afterwards.
pub async fn pump_queries<R>(input: R, submit: Debounced<String>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => submit.call(line),
            Ok(None) => break,
            Err(e) => {
                log::warn!("Failed to read queries: {}", e);
                break;
            }
        }
    }
}

pub async fn metrics(state: &AppState) -> Result<(), CommandError> {
    let result = endpoints::metrics(&state.api).await?;
    match result.as_json() {
        Some(value) => print!("{}", render_metrics(value)),
        None => println!("{}", render_result(&result)),
    }
    Ok(())
}

pub async fn rebuild_index(state: &AppState) -> Result<(), CommandError> {
    let ack = endpoints::rebuild_index(&state.api).await?;
    state.toaster.success(&ack.message);
    Ok(())
}

pub async fn copy(state: &AppState, text: &str) {
    state.clipboard.copy(text).await;
}

// ── Rendering ────────────────────────────────────────────────────────────

pub fn render_result(result: &ApiResult) -> String {
    match result {
        ApiResult::Json(value) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        ApiResult::Text(text) => text.clone(),
        ApiResult::NoContent => "(no content)".to_string(),
    }
}

fn session_title(session: &SessionSummary) -> &str {
    session
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or("New Conversation")
}

pub fn render_sessions_text(sessions: &[SessionSummary], now: DateTime<Utc>) -> String {
    let mut out = String::new();
    for s in sessions {
        let when = s.updated_at.as_deref().or(s.created_at.as_deref());
        out.push_str(&format!(
            "{}  {}  {}\n",
            s.id,
            session_title(s),
            relative_time_at(when, now)
        ));
    }
    out
}

pub fn render_sessions_html(sessions: &[SessionSummary], now: DateTime<Utc>) -> String {
    let mut out = String::from("<ul class=\"sessions\">\n");
    for s in sessions {
        let when = s.updated_at.as_deref().or(s.created_at.as_deref());
        out.push_str(&format!(
            "  <li data-id=\"{}\">{} <span class=\"time\">{}</span></li>\n",
            escape_html(&s.id),
            escape_html(session_title(s)),
            relative_time_at(when, now)
        ));
    }
    out.push_str("</ul>");
    out
}

pub fn render_memories_html(memories: &[MemoryRecord], now: DateTime<Utc>) -> String {
    let mut out = String::from("<ul class=\"memories\">\n");
    for m in memories {
        out.push_str(&format!(
            "  <li data-id=\"{}\" class=\"{}\">{} <span class=\"time\">{}</span></li>\n",
            escape_html(&m.id),
            escape_html(&m.memory_type),
            escape_html(&m.content),
            relative_time_at(m.timestamp.as_deref(), now)
        ));
    }
    out.push_str("</ul>");
    out
}

/// One `key: value` line per top-level metric; integer counts are
/// abbreviated, everything else is printed as JSON.
pub fn render_metrics(metrics: &Value) -> String {
    let Some(map) = metrics.as_object() else {
        return format!("{}\n", metrics);
    };
    let mut out = String::new();
    for (key, value) in map {
        let shown = match value.as_i64() {
            Some(n) => abbreviate(n),
            None => value.to_string(),
        };
        out.push_str(&format!("{}: {}\n", key, shown));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap()
    }

    fn summary(id: &str, title: Option<&str>, updated_at: Option<&str>) -> SessionSummary {
        SessionSummary {
            id: id.to_string(),
            title: title.map(str::to_string),
            created_at: None,
            updated_at: updated_at.map(str::to_string),
            message_count: None,
        }
    }

    #[test]
    fn test_render_result_variants() {
        assert_eq!(render_result(&ApiResult::NoContent), "(no content)");
        assert_eq!(render_result(&ApiResult::Text("hi".into())), "hi");
        assert_eq!(
            render_result(&ApiResult::Json(json!({"a": 1}))),
            "{\n  \"a\": 1\n}"
        );
    }

    #[test]
    fn test_render_sessions_text() {
        let sessions = vec![
            summary("s1", Some("Trip planning"), Some("2024-03-20T11:58:00")),
            summary("s2", None, None),
        ];
        assert_eq!(
            render_sessions_text(&sessions, now()),
            "s1  Trip planning  2m ago\ns2  New Conversation  -\n"
        );
    }

    #[test]
    fn test_render_sessions_html_escapes_titles() {
        let sessions = vec![summary(
            "s1",
            Some("<script>alert(\"x\")</script> & more"),
            Some("2024-03-20T11:59:30"),
        )];
        let html = render_sessions_html(&sessions, now());
        assert!(html.contains(
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; more"
        ));
        assert!(html.contains("<span class=\"time\">just now</span>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_render_memories_html() {
        let memories = vec![MemoryRecord {
            id: "m1".into(),
            memory_type: "semantic".into(),
            content: "likes <b>bold</b> tea".into(),
            importance_score: Some(0.7),
            reinforcement_count: Some(3),
            timestamp: Some("2024-03-18T12:00:00".into()),
        }];
        let html = render_memories_html(&memories, now());
        assert_eq!(
            html,
            "<ul class=\"memories\">\n  <li data-id=\"m1\" class=\"semantic\">likes &lt;b&gt;bold&lt;/b&gt; tea <span class=\"time\">2d ago</span></li>\n</ul>"
        );
    }

    #[test]
    fn test_render_metrics_abbreviates_counts() {
        let metrics = json!({
            "total_memories": 1500,
            "total_messages": 2500000,
            "avg_importance": 0.42,
            "sessions": 12
        });
        let text = render_metrics(&metrics);
        assert!(text.contains("total_memories: 1.5K\n"));
        assert!(text.contains("total_messages: 2.5M\n"));
        assert!(text.contains("avg_importance: 0.42\n"));
        assert!(text.contains("sessions: 12\n"));
    }

    #[test]
    fn test_render_metrics_non_object() {
        assert_eq!(render_metrics(&json!([1, 2])), "[1,2]\n");
    }

    // ── Interactive search ──────────────────────────────────────────────

    fn query_channel() -> (Debounced<String>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let submit = debounce(
            move |query: String| {
                let _ = tx.send(query);
            },
            SEARCH_DEBOUNCE,
        );
        (submit, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_typed_burst_submits_only_the_last_line() {
        let (submit, mut rx) = query_channel();

        pump_queries(BufReader::new(&b"me\nmem\nmemo\n"[..]), submit).await;

        assert_eq!(rx.recv().await.as_deref(), Some("memo"));
        // The pump dropped its handle and the timer has fired: channel closed.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pauses_between_lines_submit_each_query() {
        use tokio::io::AsyncWriteExt;

        let (submit, mut rx) = query_channel();
        let (mut typist, input) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            typist.write_all(b"tea\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(400)).await;
            typist.write_all(b"coffee\n").await.unwrap();
        });

        pump_queries(BufReader::new(input), submit).await;
        writer.await.unwrap();

        assert_eq!(rx.recv().await.as_deref(), Some("tea"));
        assert_eq!(rx.recv().await.as_deref(), Some("coffee"));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_input_submits_nothing() {
        let (submit, mut rx) = query_channel();
        pump_queries(BufReader::new(&b""[..]), submit).await;
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_auth_errors_are_flagged() {
        assert!(CommandError::Api(ApiError::SessionExpired).is_auth());
        assert!(CommandError::Api(ApiError::AuthenticationRequired).is_auth());
        assert!(!CommandError::Api(ApiError::InvalidArgument("x".into())).is_auth());
        assert!(!CommandError::Session(SessionError::NoToken).is_auth());
    }
}

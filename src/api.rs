use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::calls::{self, CallOutcome};
use crate::config::PortalConfig;
use crate::error::ApiError;
use crate::news::{self, CachePolicy, FeedSource, GoogleNewsFetcher, NewsResponse};
use crate::notify::{self, AutomationHook, N8nWebhook, NotificationRequest};
use crate::store::{MemoryStore, PortalStore, SupabaseStore};

pub const ENV_STORE_MODE: &str = "PORTAL_STORE";

const SESSION_COOKIE_PREFIX: &str = "sb-";
const SESSION_COOKIE_SUFFIX: &str = "-auth-token";
const BASE64_VALUE_PREFIX: &str = "base64-";

#[derive(Clone)]
pub struct AppState {
    pub news: Arc<dyn FeedSource>,
    pub cache_policy: CachePolicy,
    pub store: Option<Arc<dyn PortalStore>>,
    pub hook: Option<Arc<dyn AutomationHook>>,
}

impl AppState {
    /// News only; notification and webhook routes answer 503 until a store is attached.
    pub fn new(news: Arc<dyn FeedSource>, cache_policy: CachePolicy) -> Self {
        Self {
            news,
            cache_policy,
            store: None,
            hook: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn PortalStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn AutomationHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Production wiring: Google News, Supabase (if configured), n8n (if configured).
    /// `PORTAL_STORE=memory` swaps the hosted store for an in-process one.
    pub fn from_config(cfg: &PortalConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("hoa-portal/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building http client")?;

        let policy = CachePolicy::hourly();
        let fetcher = GoogleNewsFetcher::new(client.clone(), policy);
        let mut state = Self::new(Arc::new(fetcher), policy);

        let memory_mode = std::env::var(ENV_STORE_MODE)
            .map(|v| v.eq_ignore_ascii_case("memory"))
            .unwrap_or(false);
        if memory_mode {
            tracing::warn!("using in-memory store; nothing is persisted");
            state = state.with_store(Arc::new(MemoryStore::new()));
        } else if let Some(backend) = cfg.backend() {
            state = state.with_store(Arc::new(SupabaseStore::new(client.clone(), backend)));
        } else {
            tracing::warn!("hosted store not configured; notification and call routes disabled");
        }

        if let Some(hook) = N8nWebhook::from_url(client, cfg.n8n_webhook_url.as_deref()) {
            state = state.with_hook(Arc::new(hook));
        }
        Ok(state)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/news", get(get_news))
        .route("/api/notifications/send", post(send_notification))
        .route("/api/vapi/webhook", post(vapi_webhook))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn get_news(State(state): State<AppState>) -> Response {
    let articles = news::latest_articles(state.news.as_ref()).await;
    let cache_control = HeaderValue::from_str(&state.cache_policy.header_value())
        .unwrap_or_else(|_| HeaderValue::from_static("no-store"));
    (
        [(header::CACHE_CONTROL, cache_control)],
        Json(NewsResponse { articles }),
    )
        .into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

/// Access token from the browser session cookie (`sb-<ref>-auth-token`, or
/// its `.0`, `.1`, ... chunks when the session outgrew one cookie).
fn session_cookie_token(headers: &HeaderMap) -> Option<String> {
    let mut chunks: Vec<(String, usize, String)> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let (base, idx) = match name.rsplit_once('.') {
                Some((base, n)) => (base, n.parse::<usize>().ok()?),
                None => (name, 0),
            };
            (base.starts_with(SESSION_COOKIE_PREFIX) && base.ends_with(SESSION_COOKIE_SUFFIX))
                .then(|| (base.to_string(), idx, value.to_string()))
        })
        .collect();
    chunks.sort();
    let base = chunks.first()?.0.clone();
    let joined: String = chunks
        .iter()
        .filter(|(b, _, _)| *b == base)
        .map(|(_, _, v)| v.as_str())
        .collect();
    session_access_token(&joined)
}

// Cookie value is the session JSON, URL-encoded or `base64-` + base64url.
fn session_access_token(raw: &str) -> Option<String> {
    let raw = urlencoding::decode(raw).ok()?;
    let json = match raw.strip_prefix(BASE64_VALUE_PREFIX) {
        Some(b64) => {
            let bytes = URL_SAFE_NO_PAD.decode(b64.trim_end_matches('=')).ok()?;
            String::from_utf8(bytes).ok()?
        }
        None => raw.to_string(),
    };
    let session: Value = serde_json::from_str(&json).ok()?;
    let token = match &session {
        Value::Array(parts) => parts.first()?.as_str()?,
        other => other.get("access_token")?.as_str()?,
    };
    (!token.is_empty()).then(|| token.to_string())
}

/// Bearer header first, then the session cookie the portal frontend sends.
fn session_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers)
        .map(str::to_string)
        .or_else(|| session_cookie_token(headers))
}

async fn send_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<NotificationRequest>, JsonRejection>,
) -> Result<Json<notify::SendOutcome>, ApiError> {
    let store = state.store.as_deref().ok_or(ApiError::Unavailable)?;

    let token = session_token(&headers).ok_or(ApiError::Unauthorized)?;
    let user = store
        .authenticate(&token)
        .await
        .map_err(|e| {
            tracing::warn!(error = ?e, "identity lookup failed");
            ApiError::Unauthorized
        })?
        .ok_or(ApiError::Unauthorized)?;

    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let note = req.validate()?;

    let outcome =
        notify::send_notification(store, state.hook.as_deref(), &user, note).await?;
    Ok(Json(outcome))
}

fn webhook_error(message: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": message.into() })),
    )
        .into_response()
}

fn ignored() -> Response {
    Json(json!({
        "success": true,
        "message": "Ignored non-end-of-call-report message"
    }))
    .into_response()
}

async fn vapi_webhook(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = body else {
        return webhook_error("Internal server error");
    };
    let Some(store) = state.store.as_deref() else {
        if calls::parse_report(&body).is_none() {
            return ignored();
        }
        return webhook_error(ApiError::Unavailable.to_string());
    };

    match calls::ingest_report(store, &body).await {
        Ok(CallOutcome::Ignored(_)) => ignored(),
        Ok(CallOutcome::Recorded(_)) => Json(json!({ "success": true })).into_response(),
        Err(e) => {
            tracing::error!(error = ?e, "inserting call note failed");
            webhook_error(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_parsing() {
        let mut h = HeaderMap::new();
        assert_eq!(bearer_token(&h), None);
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&h), Some("abc"));
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer   "));
        assert_eq!(bearer_token(&h), None);
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&h), None);
    }

    #[test]
    fn chunked_url_encoded_session_cookie() {
        let session = urlencoding::encode(r#"{"access_token":"jwt-abc","refresh_token":"r"}"#)
            .into_owned();
        let (a, b) = session.split_at(10);
        let mut h = HeaderMap::new();
        h.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!(
                "theme=dark; sb-ref-auth-token.1={b}; sb-ref-auth-token.0={a}"
            ))
            .unwrap(),
        );
        assert_eq!(session_cookie_token(&h).as_deref(), Some("jwt-abc"));
    }

    #[test]
    fn base64_and_legacy_array_session_values() {
        let b64 = URL_SAFE_NO_PAD.encode(r#"{"access_token":"jwt-b64"}"#);
        assert_eq!(
            session_access_token(&format!("base64-{b64}")).as_deref(),
            Some("jwt-b64")
        );
        assert_eq!(
            session_access_token(r#"["jwt-old","refresh",null]"#).as_deref(),
            Some("jwt-old")
        );
        assert_eq!(session_access_token("base64-!!!"), None);
        assert_eq!(session_access_token(r#"{"access_token":""}"#), None);
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut h = HeaderMap::new();
        h.insert(
            header::COOKIE,
            HeaderValue::from_static(r#"sb-ref-auth-token=["from-cookie"]"#),
        );
        assert_eq!(session_token(&h).as_deref(), Some("from-cookie"));
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(session_token(&h).as_deref(), Some("from-header"));
    }
}

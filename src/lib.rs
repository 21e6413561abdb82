// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod calls;
pub mod config;
pub mod error;
pub mod metrics;
pub mod news;
pub mod notify;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::error::ApiError;
pub use crate::news::{Article, CachePolicy, FeedSource, GoogleNewsFetcher};

use axum::Router;
use tracing::info;

/// Full router for a prepared state, including `/metrics`.
pub fn app_with_state(state: AppState) -> anyhow::Result<Router> {
    let metrics = crate::metrics::Metrics::init(state.cache_policy)?;
    Ok(api::router(state).merge(metrics.router()))
}

/// Build the production app from config file + environment.
///
/// Example usage inside the `#[shuttle_runtime::main]` function:
/// ```ignore
/// let router = hoa_portal::app().await?;
/// ```
pub async fn app() -> anyhow::Result<Router> {
    let cfg = config::PortalConfig::load_default()?;
    let state = AppState::from_config(&cfg)?;
    info!(
        store = state.store.as_ref().map(|s| s.name()).unwrap_or("none"),
        hook = state.hook.as_ref().map(|h| h.name()).unwrap_or("none"),
        news = state.news.name(),
        "portal app wired"
    );
    app_with_state(state)
}

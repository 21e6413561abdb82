//! HOA Portal — Binary Entrypoint
//! Boots the Axum HTTP server: news aggregation, board notifications and the
//! voice-assistant webhook.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Local log output. Activation requires PORTAL_DEV_LOG=1; PORTAL_LOG_JSON=1
/// switches to JSON lines. Uses `try_init` so a subscriber installed by the
/// runtime wins.
fn enable_dev_tracing() {
    let on = std::env::var("PORTAL_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");
    if !on {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hoa_portal=info,news=info,warn"));
    let json = std::env::var("PORTAL_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if let Err(e) = res {
        eprintln!("dev tracing not installed: {e}");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let router = hoa_portal::app().await?;
    Ok(router.into())
}

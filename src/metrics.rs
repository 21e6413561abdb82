use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::news::CachePolicy;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and publish the
    /// news cache lifetime as a static gauge.
    pub fn init(policy: CachePolicy) -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                PrometheusBuilder::new()
                    .install_recorder()
                    .context("prometheus: install recorder")
            })?
            .clone();

        crate::news::ensure_metrics_described();
        describe_counter!("notifications_sent_total", "Notifications recorded.");
        describe_counter!(
            "notifications_webhook_errors_total",
            "Automation webhook calls that failed."
        );
        describe_counter!("call_notes_recorded_total", "Call notes written.");
        describe_counter!(
            "call_reports_ignored_total",
            "Voice webhook messages that were not end-of-call reports."
        );

        gauge!("news_cache_max_age_seconds").set(policy.max_age.as_secs_f64());

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

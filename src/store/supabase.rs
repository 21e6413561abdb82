// src/store/supabase.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::store::{AuthUser, CallNote, NotificationRecord, PortalStore, Resident};

const RESIDENT_COLUMNS: &str = "id,first_name,last_name,email,phone";

/// Supabase-compatible store: GoTrue for identity, PostgREST for tables.
/// Table access uses the service role key; token checks use the anon key.
pub struct SupabaseStore {
    client: Client,
    cfg: BackendConfig,
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    message: Option<String>,
}

impl SupabaseStore {
    pub fn new(client: Client, cfg: BackendConfig) -> Self {
        Self { client, cfg }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.cfg.url, table)
    }

    fn service(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.header("apikey", &self.cfg.service_role_key)
            .bearer_auth(&self.cfg.service_role_key)
    }

    async fn insert<T: Serialize + Sync>(&self, table: &str, row: &T) -> Result<()> {
        let resp = self
            .service(self.client.post(self.rest_url(table)))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await
            .with_context(|| format!("{table} insert"))?;
        ensure_ok(resp).await
    }
}

/// Non-2xx → error carrying the PostgREST `message` when there is one.
async fn ensure_ok(resp: Response) -> Result<()> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let text = resp.text().await.unwrap_or_default();
    let msg = serde_json::from_str::<PostgrestError>(&text)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| format!("store returned {status}"));
    Err(anyhow!(msg))
}

#[async_trait]
impl PortalStore for SupabaseStore {
    async fn authenticate(&self, access_token: &str) -> Result<Option<AuthUser>> {
        if access_token.trim().is_empty() {
            return Ok(None);
        }
        let resp = self
            .client
            .get(format!("{}/auth/v1/user", self.cfg.url))
            .header("apikey", &self.cfg.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .context("identity lookup")?;
        match resp.status() {
            s if s.is_success() => {
                let user: AuthUser = resp.json().await.context("identity user json")?;
                Ok(Some(user))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            s => Err(anyhow!("identity provider returned {s}")),
        }
    }

    async fn active_residents(&self) -> Result<Vec<Resident>> {
        let resp = self
            .service(self.client.get(self.rest_url("residents")))
            .query(&[("select", RESIDENT_COLUMNS), ("status", "eq.active")])
            .send()
            .await
            .context("residents select")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("residents select returned {status}"));
        }
        resp.json().await.context("residents json")
    }

    async fn record_notification(&self, rec: &NotificationRecord) -> Result<()> {
        self.insert("notifications", rec).await
    }

    async fn record_call_note(&self, note: &CallNote) -> Result<()> {
        self.insert("call_notes", note).await
    }

    fn name(&self) -> &'static str {
        "supabase"
    }
}

// src/notify/n8n.rs
use anyhow::{Context, Result};
use reqwest::Client;

use super::{AutomationHook, DispatchStats, FanoutPayload};

/// n8n workflow webhook that performs the actual email/SMS delivery.
pub struct N8nWebhook {
    webhook_url: String,
    client: Client,
}

impl N8nWebhook {
    pub fn new(client: Client, webhook_url: String) -> Self {
        Self {
            webhook_url,
            client,
        }
    }

    /// `None` when `N8N_NOTIFICATION_WEBHOOK_URL` is unset.
    pub fn from_url(client: Client, webhook_url: Option<&str>) -> Option<Self> {
        webhook_url.map(|u| Self::new(client, u.to_string()))
    }
}

#[async_trait::async_trait]
impl AutomationHook for N8nWebhook {
    async fn dispatch(&self, payload: &FanoutPayload<'_>) -> Result<DispatchStats> {
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await
            .context("n8n post")?
            .error_for_status()
            .context("n8n non-2xx")?;
        resp.json::<DispatchStats>()
            .await
            .context("n8n response json")
    }

    fn name(&self) -> &'static str {
        "n8n"
    }
}

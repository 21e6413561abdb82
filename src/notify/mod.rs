// src/notify/mod.rs
//! Board notifications: validate the request, look up active residents,
//! hand the fan-out to the automation webhook and record what was sent.

pub mod n8n;

use anyhow::Result;
use metrics::counter;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::ApiError;
use crate::store::{AuthUser, NotificationRecord, PortalStore, Resident};

pub use n8n::N8nWebhook;

/// Delivery channel as the board typed it; the workflow decides what it means
/// (`email`, `sms` and `both` are the ones it knows).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(String);

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Channel {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw body of `POST /api/notifications/send`; every field is checked by hand
/// so a missing one yields the friendly 400 instead of a deserializer error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationRequest {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub channel: Channel,
}

impl NotificationRequest {
    pub fn validate(self) -> Result<Notification, ApiError> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let (Some(subject), Some(body), Some(channel)) =
            (present(self.subject), present(self.body), present(self.channel))
        else {
            return Err(ApiError::BadRequest(
                "Subject, body, and channel are required".to_string(),
            ));
        };
        Ok(Notification {
            subject,
            body,
            channel: Channel(channel),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<&Resident> for Recipient {
    fn from(r: &Resident) -> Self {
        Self {
            name: r.display_name(),
            email: r.email.clone(),
            phone: r.phone.clone(),
        }
    }
}

/// JSON posted to the automation webhook.
#[derive(Debug, Clone, Serialize)]
pub struct FanoutPayload<'a> {
    pub subject: &'a str,
    pub body: &'a str,
    pub channel: &'a Channel,
    pub recipients: Vec<Recipient>,
}

/// Delivery counters reported back by the automation workflow. Missing,
/// `null` or non-numeric counters read as zero; whole floats are accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchStats {
    #[serde(default, deserialize_with = "lenient_count")]
    pub emails_sent: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub emails_failed: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub sms_sent: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub sms_failed: u64,
}

fn lenient_count<'de, D>(de: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(de)?;
    let n = match &v {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        _ => None,
    };
    Ok(n.unwrap_or(0))
}

#[async_trait::async_trait]
pub trait AutomationHook: Send + Sync {
    async fn dispatch(&self, payload: &FanoutPayload<'_>) -> Result<DispatchStats>;
    fn name(&self) -> &'static str;
}

/// Response body of a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOutcome {
    pub success: bool,
    pub recipient_count: usize,
    pub channel: Channel,
    /// Present only when the workflow answered with a 2xx JSON body.
    #[serde(flatten)]
    pub stats: Option<DispatchStats>,
}

/// Fan out to active residents and record the send.
///
/// A failing or absent webhook never fails the request; the notification is
/// still recorded with the resident count.
pub async fn send_notification(
    store: &dyn PortalStore,
    hook: Option<&dyn AutomationHook>,
    user: &AuthUser,
    note: Notification,
) -> Result<SendOutcome, ApiError> {
    let residents = store.active_residents().await.map_err(|e| {
        tracing::error!(error = ?e, store = store.name(), "resident lookup failed");
        ApiError::Internal("Failed to fetch residents".to_string())
    })?;
    let recipients: Vec<Recipient> = residents.iter().map(Recipient::from).collect();
    let recipient_count = recipients.len();

    let stats = match hook {
        Some(hook) => {
            let payload = FanoutPayload {
                subject: &note.subject,
                body: &note.body,
                channel: &note.channel,
                recipients,
            };
            match hook.dispatch(&payload).await {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::warn!(error = ?e, hook = hook.name(), "notification webhook failed");
                    counter!("notifications_webhook_errors_total").increment(1);
                    None
                }
            }
        }
        None => {
            tracing::debug!("automation webhook disabled (no N8N_NOTIFICATION_WEBHOOK_URL)");
            None
        }
    };

    let record = NotificationRecord {
        subject: note.subject,
        body: note.body,
        channel: note.channel.clone(),
        recipient_count,
        sent_by: user.id.clone(),
    };
    store.record_notification(&record).await.map_err(|e| {
        tracing::error!(error = ?e, store = store.name(), "notification insert failed");
        ApiError::Internal("Failed to record notification".to_string())
    })?;

    counter!("notifications_sent_total").increment(1);
    tracing::info!(
        channel = %note.channel,
        recipients = recipient_count,
        webhook_ok = stats.is_some(),
        "notification sent"
    );

    Ok(SendOutcome {
        success: true,
        recipient_count,
        channel: note.channel,
        stats,
    })
}

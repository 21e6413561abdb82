// src/store/mod.rs
//! Seam to the hosted data store and identity provider. Schema and
//! persistence guarantees belong to the hosted service; this side only
//! reads residents and appends notification and call-note rows.

pub mod memory;
pub mod supabase;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::notify::Channel;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

/// Signed-in portal user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resident {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Resident {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Row appended to `notifications` after a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub subject: String,
    pub body: String,
    pub channel: Channel,
    pub recipient_count: usize,
    pub sent_by: String,
}

/// Row appended to `call_notes` for each end-of-call report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallNote {
    pub caller_name: String,
    pub caller_phone: String,
    pub category: String,
    pub summary: String,
    pub transcript: String,
    pub vapi_call_id: String,
    pub status: String,
}

#[async_trait::async_trait]
pub trait PortalStore: Send + Sync {
    /// `Ok(None)` when the token is missing, expired or rejected.
    async fn authenticate(&self, access_token: &str) -> Result<Option<AuthUser>>;
    async fn active_residents(&self) -> Result<Vec<Resident>>;
    async fn record_notification(&self, rec: &NotificationRecord) -> Result<()>;
    async fn record_call_note(&self, note: &CallNote) -> Result<()>;
    fn name(&self) -> &'static str;
}

// src/store/memory.rs
//! In-process store for local runs (`PORTAL_STORE=memory`) and tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::store::{AuthUser, CallNote, NotificationRecord, PortalStore, Resident};

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<String, AuthUser>,
    residents: Vec<(Resident, bool)>,
    notifications: Vec<NotificationRecord>,
    call_notes: Vec<CallNote>,
    fail_reads: bool,
    fail_writes: Option<String>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn with_session(self, token: &str, user_id: &str) -> Self {
        self.lock().sessions.insert(
            token.to_string(),
            AuthUser {
                id: user_id.to_string(),
                email: None,
            },
        );
        self
    }

    pub fn with_resident(self, resident: Resident, active: bool) -> Self {
        self.lock().residents.push((resident, active));
        self
    }

    /// Make `active_residents` fail.
    pub fn failing_reads(self) -> Self {
        self.lock().fail_reads = true;
        self
    }

    /// Make every insert fail with `message`.
    pub fn failing_writes(self, message: &str) -> Self {
        self.lock().fail_writes = Some(message.to_string());
        self
    }

    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.lock().notifications.clone()
    }

    pub fn call_notes(&self) -> Vec<CallNote> {
        self.lock().call_notes.clone()
    }
}

#[async_trait]
impl PortalStore for MemoryStore {
    async fn authenticate(&self, access_token: &str) -> Result<Option<AuthUser>> {
        Ok(self.lock().sessions.get(access_token).cloned())
    }

    async fn active_residents(&self) -> Result<Vec<Resident>> {
        let g = self.lock();
        if g.fail_reads {
            return Err(anyhow!("residents unavailable"));
        }
        Ok(g.residents
            .iter()
            .filter(|(_, active)| *active)
            .map(|(r, _)| r.clone())
            .collect())
    }

    async fn record_notification(&self, rec: &NotificationRecord) -> Result<()> {
        let mut g = self.lock();
        if let Some(msg) = &g.fail_writes {
            return Err(anyhow!("{msg}"));
        }
        g.notifications.push(rec.clone());
        Ok(())
    }

    async fn record_call_note(&self, note: &CallNote) -> Result<()> {
        let mut g = self.lock();
        if let Some(msg) = &g.fail_writes {
            return Err(anyhow!("{msg}"));
        }
        g.call_notes.push(note.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

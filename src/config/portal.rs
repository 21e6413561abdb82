// src/config/portal.rs
//! Deployment settings for the hosted store and the automation webhook.
//!
//! Sources, lowest to highest precedence:
//! 1) `$PORTAL_CONFIG_PATH`, else `config/portal.toml` (optional)
//! 2) environment variables (also picked up from `.env` by `main`)
//!
//! In the file, a value of `"ENV"` means "read the matching env var".
//! News settings are deliberately absent: queries, cap and cache lifetime are constants.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "PORTAL_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/portal.toml";

pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_URL_PUBLIC: &str = "NEXT_PUBLIC_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_SUPABASE_ANON_KEY_PUBLIC: &str = "NEXT_PUBLIC_SUPABASE_ANON_KEY";
pub const ENV_SUPABASE_SERVICE_ROLE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
pub const ENV_N8N_WEBHOOK_URL: &str = "N8N_NOTIFICATION_WEBHOOK_URL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub supabase_url: Option<String>,
    /// Used for identity lookups; falls back to the service role key.
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    #[serde(default)]
    pub supabase_service_role_key: Option<String>,
    /// Notification fan-out is skipped (but still recorded) when unset.
    #[serde(default)]
    pub n8n_webhook_url: Option<String>,
}

/// Resolved connection settings for the hosted store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    pub service_role_key: String,
}

impl PortalConfig {
    /// Load a TOML file and resolve `"ENV"` placeholders.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading portal config from {}", path.display()))?;
        let mut cfg: PortalConfig = toml::from_str(&data)
            .with_context(|| format!("parsing portal config {}", path.display()))?;
        cfg.resolve_placeholders(|k| std::env::var(k).ok())?;
        Ok(cfg.normalized())
    }

    /// File (if any) plus environment overrides.
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else {
            let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
            if fallback.exists() {
                Self::load_from_file(&fallback)?
            } else {
                Self::default()
            }
        };
        Ok(base.with_overrides(|k| std::env::var(k).ok()))
    }

    /// Environment only; no file lookup.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|k| std::env::var(k).ok())
    }

    /// Overlay values found through `lookup` (first listed name wins).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let pick = |names: &[&str]| {
            names
                .iter()
                .filter_map(|&n| lookup(n))
                .find(|v| !v.trim().is_empty())
        };
        if let Some(v) = pick(&[ENV_SUPABASE_URL, ENV_SUPABASE_URL_PUBLIC]) {
            self.supabase_url = Some(v);
        }
        if let Some(v) = pick(&[ENV_SUPABASE_ANON_KEY, ENV_SUPABASE_ANON_KEY_PUBLIC]) {
            self.supabase_anon_key = Some(v);
        }
        if let Some(v) = pick(&[ENV_SUPABASE_SERVICE_ROLE_KEY]) {
            self.supabase_service_role_key = Some(v);
        }
        if let Some(v) = pick(&[ENV_N8N_WEBHOOK_URL]) {
            self.n8n_webhook_url = Some(v);
        }
        self.normalized()
    }

    /// Store settings, if both URL and service role key are known.
    pub fn backend(&self) -> Option<BackendConfig> {
        let url = self.supabase_url.clone()?;
        let service_role_key = self.supabase_service_role_key.clone()?;
        let anon_key = self
            .supabase_anon_key
            .clone()
            .unwrap_or_else(|| service_role_key.clone());
        Some(BackendConfig {
            url,
            anon_key,
            service_role_key,
        })
    }

    fn resolve_placeholders(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let fields: [(&mut Option<String>, &str); 4] = [
            (&mut self.supabase_url, ENV_SUPABASE_URL),
            (&mut self.supabase_anon_key, ENV_SUPABASE_ANON_KEY),
            (&mut self.supabase_service_role_key, ENV_SUPABASE_SERVICE_ROLE_KEY),
            (&mut self.n8n_webhook_url, ENV_N8N_WEBHOOK_URL),
        ];
        for (slot, var) in fields {
            if slot.as_deref().map(str::trim).is_some_and(|v| v.eq_ignore_ascii_case("env")) {
                *slot = Some(lookup(var).ok_or_else(|| anyhow!("Missing {var} env var"))?);
            }
        }
        Ok(())
    }

    fn normalized(mut self) -> Self {
        for slot in [
            &mut self.supabase_url,
            &mut self.supabase_anon_key,
            &mut self.supabase_service_role_key,
            &mut self.n8n_webhook_url,
        ] {
            *slot = slot
                .take()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
        }
        if let Some(url) = self.supabase_url.as_mut() {
            while url.ends_with('/') {
                url.pop();
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn overrides_prefer_server_names_and_trim() {
        let cfg = PortalConfig::default().with_overrides(env_of(&[
            (ENV_SUPABASE_URL_PUBLIC, "https://public.example"),
            (ENV_SUPABASE_URL, " https://server.example/ "),
            (ENV_SUPABASE_SERVICE_ROLE_KEY, "svc"),
        ]));
        assert_eq!(cfg.supabase_url.as_deref(), Some("https://server.example"));
        let b = cfg.backend().expect("backend");
        assert_eq!(b.anon_key, "svc");
    }

    #[test]
    fn blank_values_are_dropped() {
        let cfg = PortalConfig::default()
            .with_overrides(env_of(&[(ENV_N8N_WEBHOOK_URL, "   ")]));
        assert!(cfg.n8n_webhook_url.is_none());
        assert!(cfg.backend().is_none());
    }

    #[test]
    fn env_placeholder_requires_variable() {
        let mut cfg = PortalConfig {
            supabase_service_role_key: Some("ENV".into()),
            ..Default::default()
        };
        assert!(cfg.resolve_placeholders(env_of(&[])).is_err());
        cfg.resolve_placeholders(env_of(&[(ENV_SUPABASE_SERVICE_ROLE_KEY, "k")]))
            .unwrap();
        assert_eq!(cfg.supabase_service_role_key.as_deref(), Some("k"));
    }
}

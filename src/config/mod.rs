// src/config/mod.rs
pub mod portal;

pub use portal::{BackendConfig, PortalConfig};

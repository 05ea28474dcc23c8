use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Service key used for the system resolver in `check_services` payloads.
pub const RESOLVED_SERVICE: &str = "resolved";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    #[serde(default)]
    pub exists: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Download,
    Upload,
    #[serde(other)]
    Unknown,
}

/// Metadata the profile server writes next to each downloaded or uploaded profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMeta {
    #[serde(rename = "type")]
    pub kind: ProfileKind,
    /// Unix seconds.
    pub update_time: i64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub update_interval: Option<u64>,
}

/// Last-known remote status. Rebuilt by refresh calls, never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendInfo {
    pub version: String,
    pub profiles: Vec<String>,
    pub profile_meta: Option<ProfileMeta>,
    pub services: BTreeMap<String, ServiceStatus>,
    pub server_running: bool,
}

impl BackendInfo {
    pub fn service(&self, name: &str) -> ServiceStatus {
        self.services.get(name).copied().unwrap_or_default()
    }

    pub fn service_mut(&mut self, name: &str) -> &mut ServiceStatus {
        self.services.entry(name.to_string()).or_default()
    }
}

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::bridge::{Bridge, BridgeResult};
use crate::model::backend_info::{BackendInfo, ProfileMeta, RESOLVED_SERVICE, ServiceStatus};
use crate::model::settings::{KeyPath, Scalar, Settings, SettingsError};

const SENDER: &str = "backend";

/// Outcome of one settings walk.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncReport {
    /// Leaves visited.
    pub leaves: usize,
    /// Leaves that kept their default because the remote value was unusable.
    pub fallbacks: Vec<KeyPath>,
    /// Leaves whose `set_settings` call failed.
    pub failed: Vec<KeyPath>,
    pub commit_failed: bool,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.fallbacks.is_empty() && self.failed.is_empty() && !self.commit_failed
    }
}

/// Both settings walks of [`Backend::setup`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SetupReport {
    pub load: SyncReport,
    pub save: SyncReport,
}

/// Typed front for every remote function the panel uses. State is always
/// passed in; `Backend` itself only holds the bridge.
pub struct Backend {
    bridge: Bridge,
}

impl Backend {
    pub fn new(bridge: Bridge) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Activation sequence: pull settings, push them back so the store holds
    /// every key, then fetch status.
    pub async fn setup(
        &self,
        settings: &mut Settings,
        info: &mut BackendInfo,
    ) -> Result<SetupReport, SettingsError> {
        let load = self.load_settings(settings).await?;
        let save = self.save_settings(settings).await;
        self.update_info(settings, info).await;
        Ok(SetupReport { load, save })
    }

    /// Refresh everything shown in the panel. Failures, including payloads
    /// that do not decode, are logged by the bridge and leave the matching
    /// field untouched.
    pub async fn update_info(&self, settings: &Settings, info: &mut BackendInfo) {
        let _ = self.get_version(info).await;
        let _ = self.check_services(info).await;
        let _ = self.get_profiles(info).await;
        let _ = self.check_server(info).await;
        if !settings.profile().is_empty() {
            let _ = self.get_profile_meta(settings.profile(), info).await;
        }
    }

    // ── Settings sync ────────────────────────────────────────────

    /// One `get_settings` per leaf of the default tree, in order. Unusable
    /// answers keep the default.
    pub async fn load_settings(&self, settings: &mut Settings) -> Result<SyncReport, SettingsError> {
        let mut report = SyncReport::default();

        for (path, default) in settings.defaults().leaves() {
            report.leaves += 1;
            let result = self
                .bridge
                .call(
                    "get_settings",
                    Some(json!({ "key": path.as_str(), "default": default.to_json() })),
                )
                .await;

            let value = match result {
                Ok(Some(data)) => match Scalar::from_json(&data, default.kind()) {
                    Some(value) => value,
                    None => {
                        tracing::warn!(%path, %data, "stored setting has the wrong kind, using default");
                        report.fallbacks.push(path.clone());
                        default
                    }
                },
                Ok(None) | Err(_) => {
                    report.fallbacks.push(path.clone());
                    default
                }
            };
            settings.assign(&path, value)?;
        }

        tracing::debug!(?report, "settings loaded");
        Ok(report)
    }

    /// One `set_settings` per leaf of the live tree, then one `commit_settings`.
    pub async fn save_settings(&self, settings: &Settings) -> SyncReport {
        let mut report = SyncReport::default();

        for (path, value) in settings.live().leaves() {
            report.leaves += 1;
            let args = json!({ "key": path.as_str(), "value": value.to_json() });
            if self.bridge.call("set_settings", Some(args)).await.is_err() {
                report.failed.push(path);
            }
        }
        report.commit_failed = self.bridge.call("commit_settings", None).await.is_err();

        tracing::debug!(?report, "settings saved");
        report
    }

    // ── Info refresh ─────────────────────────────────────────────

    pub async fn get_version(&self, info: &mut BackendInfo) -> BridgeResult<()> {
        info.version = self.bridge.call_as("get_version", None).await?;
        Ok(())
    }

    pub async fn check_services(&self, info: &mut BackendInfo) -> BridgeResult<()> {
        let services: BTreeMap<String, ServiceStatus> =
            self.bridge.call_as("check_services", None).await?;
        info.services = services;
        Ok(())
    }

    pub async fn get_profiles(&self, info: &mut BackendInfo) -> BridgeResult<()> {
        let mut profiles: Vec<String> = self.bridge.call_as("get_profiles", None).await?;
        profiles.sort();
        profiles.dedup();
        info.profiles = profiles;
        Ok(())
    }

    /// A profile without a meta file is `None`, not an error.
    pub async fn get_profile_meta(
        &self,
        profile_name: &str,
        info: &mut BackendInfo,
    ) -> BridgeResult<()> {
        let data = self
            .bridge
            .call("get_profile_meta", Some(json!({ "profile_name": profile_name })))
            .await?;
        info.profile_meta = match data {
            None | Some(Value::Null) => None,
            Some(data) => Some(
                self.bridge
                    .decode_payload::<ProfileMeta>("get_profile_meta", Some(data))
                    .await?,
            ),
        };
        Ok(())
    }

    pub async fn check_server(&self, info: &mut BackendInfo) -> BridgeResult<()> {
        info.server_running = self.bridge.call_as("check_server", None).await?;
        Ok(())
    }

    pub async fn start_server(&self, info: &mut BackendInfo) -> BridgeResult<()> {
        self.bridge.call("start_server", None).await?;
        info.server_running = true;
        Ok(())
    }

    pub async fn stop_server(&self, info: &mut BackendInfo) -> BridgeResult<()> {
        self.bridge.call("stop_server", None).await?;
        info.server_running = false;
        Ok(())
    }

    pub async fn check_if_service_exists(
        &self,
        service: &str,
        info: &mut BackendInfo,
    ) -> BridgeResult<bool> {
        let exists: bool = self
            .bridge
            .call_as("check_if_service_exists", Some(json!({ "service": service })))
            .await?;
        info.service_mut(service).exists = exists;
        Ok(exists)
    }

    /// `false` when the backend refused because no profile is selected.
    pub async fn install_service(&self) -> BridgeResult<bool> {
        let data = self.bridge.call("install_service", None).await?;
        let installed = !matches!(data, Some(Value::Bool(false)));
        if !installed {
            self.bridge
                .log()
                .log(SENDER, "install_service skipped: no profile selected")
                .await;
        }
        Ok(installed)
    }

    pub async fn uninstall_service(&self) -> BridgeResult<bool> {
        Ok(self
            .bridge
            .call("uninstall_service", None)
            .await?
            .and_then(|data| data.as_bool())
            .unwrap_or(true))
    }

    /// Exit code of `systemctl start`.
    pub async fn start_service(&self, service: &str) -> BridgeResult<i64> {
        self.bridge
            .call_as("start_service", Some(json!({ "service": service })))
            .await
    }

    /// Exit code of `systemctl stop`.
    pub async fn stop_service(&self, service: &str) -> BridgeResult<i64> {
        self.bridge
            .call_as("stop_service", Some(json!({ "service": service })))
            .await
    }

    pub async fn check_resolved(&self, info: &mut BackendInfo) -> BridgeResult<()> {
        let status: ServiceStatus = self.bridge.call_as("check_resolved", None).await?;
        info.services.insert(RESOLVED_SERVICE.to_string(), status);
        Ok(())
    }

    pub async fn restore_resolved(&self) -> BridgeResult<()> {
        self.bridge.call("restore_resolved", None).await?;
        Ok(())
    }

    pub async fn disable_resolved(&self) -> BridgeResult<()> {
        self.bridge.call("disable_resolved", None).await?;
        Ok(())
    }

    /// Rebuild the service config from `profile_name`. The payload is opaque.
    pub async fn update_profile(&self, profile_name: &str) -> BridgeResult<Option<Value>> {
        self.bridge
            .call("update_profile", Some(json!({ "profile_name": profile_name })))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{CallEnvelope, MemoryHost, RemoteLog};
    use crate::model::backend_info::ProfileKind;
    use std::sync::Arc;

    fn backend(host: &Arc<MemoryHost>) -> Backend {
        Backend::new(Bridge::new(host.clone(), RemoteLog::new(host.clone(), false)))
    }

    #[tokio::test]
    async fn version_and_server_flag_are_stored() {
        let host = Arc::new(MemoryHost::new());
        host.respond("get_version", CallEnvelope::ok(json!("0.3.1")));
        host.respond("check_server", CallEnvelope::ok(json!(true)));
        let backend = backend(&host);
        let mut info = BackendInfo::default();

        backend.get_version(&mut info).await.unwrap();
        backend.check_server(&mut info).await.unwrap();

        assert_eq!(info.version, "0.3.1");
        assert!(info.server_running);
    }

    #[tokio::test]
    async fn services_replace_previous_snapshot() {
        let host = Arc::new(MemoryHost::new());
        host.respond(
            "check_services",
            CallEnvelope::ok(json!({
                "tunup": {"exists": true, "active": false, "enabled": true},
                "resolved": {"exists": true, "active": true, "enabled": true},
            })),
        );
        let mut info = BackendInfo::default();
        info.service_mut("stale").exists = true;

        backend(&host).check_services(&mut info).await.unwrap();

        assert_eq!(info.services.len(), 2);
        assert!(info.service("tunup").enabled);
        assert!(!info.service("tunup").active);
        assert!(info.service("resolved").active);
    }

    #[tokio::test]
    async fn profiles_are_sorted_and_unique() {
        let host = Arc::new(MemoryHost::new());
        host.respond("get_profiles", CallEnvelope::ok(json!(["work", "home", "work"])));
        let mut info = BackendInfo::default();

        backend(&host).get_profiles(&mut info).await.unwrap();

        assert_eq!(info.profiles, ["home", "work"]);
    }

    #[tokio::test]
    async fn profile_meta_null_clears_previous() {
        let host = Arc::new(MemoryHost::new());
        host.respond(
            "get_profile_meta",
            CallEnvelope::ok(json!({"type": "upload", "update_time": 42})),
        );
        let backend = backend(&host);
        let mut info = BackendInfo::default();

        backend.get_profile_meta("home", &mut info).await.unwrap();
        assert_eq!(info.profile_meta.as_ref().map(|m| m.kind), Some(ProfileKind::Upload));
        assert_eq!(host.calls_to("get_profile_meta"), [json!({"profile_name": "home"})]);

        host.respond("get_profile_meta", CallEnvelope::ok(Value::Null));
        backend.get_profile_meta("gone", &mut info).await.unwrap();
        assert_eq!(info.profile_meta, None);
    }

    #[tokio::test]
    async fn failed_refresh_leaves_field_untouched() {
        let host = Arc::new(MemoryHost::new());
        host.respond("get_version", CallEnvelope::failed("boom"));
        let mut info = BackendInfo {
            version: "old".to_string(),
            ..Default::default()
        };

        let result = backend(&host).get_version(&mut info).await;

        assert!(result.is_err());
        assert_eq!(info.version, "old");
    }

    #[tokio::test]
    async fn server_start_stop_track_running_flag() {
        let host = Arc::new(MemoryHost::new());
        host.respond("start_server", CallEnvelope::ok(json!(true)));
        host.respond("stop_server", CallEnvelope::ok(json!(true)));
        let backend = backend(&host);
        let mut info = BackendInfo::default();

        backend.start_server(&mut info).await.unwrap();
        backend.start_server(&mut info).await.unwrap();
        assert!(info.server_running);
        assert_eq!(host.count("start_server"), 2);

        backend.stop_server(&mut info).await.unwrap();
        assert!(!info.server_running);
    }

    #[tokio::test]
    async fn service_calls_pass_service_name() {
        let host = Arc::new(MemoryHost::new());
        host.respond("start_service", CallEnvelope::ok(json!(0)));
        host.respond("stop_service", CallEnvelope::ok(json!(5)));
        host.respond("check_if_service_exists", CallEnvelope::ok(json!(true)));
        let backend = backend(&host);
        let mut info = BackendInfo::default();

        assert_eq!(backend.start_service("tunup").await.unwrap(), 0);
        assert_eq!(backend.stop_service("tunup").await.unwrap(), 5);
        assert!(backend.check_if_service_exists("tunup", &mut info).await.unwrap());

        assert_eq!(host.calls_to("start_service"), [json!({"service": "tunup"})]);
        assert!(info.service("tunup").exists);
    }

    #[tokio::test]
    async fn install_without_profile_reports_false() {
        let host = Arc::new(MemoryHost::new());
        host.respond("install_service", CallEnvelope::ok(json!(false)));
        assert!(!backend(&host).install_service().await.unwrap());

        host.respond("install_service", CallEnvelope::ok(json!("('', '', 0)")));
        assert!(backend(&host).install_service().await.unwrap());
    }

    #[tokio::test]
    async fn resolved_status_lands_under_resolved_key() {
        let host = Arc::new(MemoryHost::new());
        host.respond(
            "check_resolved",
            CallEnvelope::ok(json!({"exists": true, "active": false, "enabled": false})),
        );
        let mut info = BackendInfo::default();

        backend(&host).check_resolved(&mut info).await.unwrap();

        assert!(info.service(RESOLVED_SERVICE).exists);
        assert!(!info.service(RESOLVED_SERVICE).active);
    }

    #[tokio::test]
    async fn update_info_skips_meta_without_profile() {
        let host = Arc::new(MemoryHost::new());
        let settings = Settings::default();
        let mut info = BackendInfo::default();

        backend(&host).update_info(&settings, &mut info).await;

        let order: Vec<String> = host.calls().into_iter().map(|c| c.function).collect();
        assert_eq!(
            order,
            ["get_version", "check_services", "get_profiles", "check_server"]
        );
    }

    #[tokio::test]
    async fn update_info_fetches_meta_for_selected_profile() {
        let host = Arc::new(MemoryHost::new());
        host.respond(
            "get_profile_meta",
            CallEnvelope::ok(json!({"type": "download", "update_time": 9, "url": "https://x"})),
        );
        let mut settings = Settings::default();
        settings.set_profile("home").unwrap();
        let mut info = BackendInfo::default();

        backend(&host).update_info(&settings, &mut info).await;

        let order: Vec<String> = host.calls().into_iter().map(|c| c.function).collect();
        assert_eq!(
            order,
            ["get_version", "check_services", "get_profiles", "check_server", "get_profile_meta"]
        );
        assert_eq!(host.calls_to("get_profile_meta"), [json!({"profile_name": "home"})]);
        assert_eq!(info.profile_meta.map(|meta| meta.update_time), Some(9));
    }

    #[tokio::test]
    async fn undecodable_refresh_is_logged_and_keeps_old_value() {
        let host = Arc::new(MemoryHost::new());
        host.respond("get_version", CallEnvelope::ok(json!(5)));
        host.respond("get_profiles", CallEnvelope::empty());
        let bridge = Bridge::new(host.clone(), RemoteLog::new(host.clone(), true));
        let mut info = BackendInfo {
            version: "stale".to_string(),
            profiles: vec!["home".to_string()],
            ..Default::default()
        };

        Backend::new(bridge)
            .update_info(&Settings::default(), &mut info)
            .await;

        assert_eq!(info.version, "stale");
        assert_eq!(info.profiles, ["home"]);
        let errors: Vec<String> = host
            .calls_to("log_err")
            .iter()
            .map(|args| args["message"].as_str().unwrap_or_default().to_string())
            .collect();
        assert!(errors.iter().any(|line| line.contains("get_version payload did not decode")));
        assert!(errors.iter().any(|line| line.contains("get_profiles returned no payload")));
    }
}

use std::collections::VecDeque;

use anyhow::Result;

use crate::backend::{Backend, SyncReport};
use crate::bridge::BridgeResult;
use crate::model::backend_info::BackendInfo;
use crate::model::config::AppConfig;
use crate::model::settings::Settings;
use crate::msg::{DebugTarget, Msg, parse_command};

const MAX_NOTIFICATIONS: usize = 8;

/// Everything the panel renders. Only [`App::update`] mutates it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub settings: Settings,
    pub info: BackendInfo,
}

pub struct App {
    pub config: AppConfig,
    pub session: Session,
    pub should_quit: bool,
    pub notifications: VecDeque<String>,
    backend: Backend,
}

impl App {
    pub fn new(config: AppConfig, backend: Backend) -> Self {
        Self {
            config,
            session: Session::default(),
            should_quit: false,
            notifications: VecDeque::new(),
            backend,
        }
    }

    // ── MVU: Update ──────────────────────────────────────────────

    pub async fn update(&mut self, msg: Msg) -> Result<()> {
        let msg = match msg {
            Msg::Command(raw) => match parse_command(&raw) {
                Ok(msg) => msg,
                Err(err) => {
                    self.push_notification(err);
                    return Ok(());
                }
            },
            msg => msg,
        };
        tracing::debug!(?msg, "update");

        let Session { settings, info } = &mut self.session;
        match msg {
            Msg::Setup => {
                let report = self.backend.setup(settings, info).await?;
                self.report_sync("load", &report.load);
                self.report_sync("save", &report.save);
                let version = self.describe_version().to_string();
                self.push_notification(format!("connected: backend {version}"));
            }
            Msg::RefreshInfo => self.backend.update_info(settings, info).await,
            Msg::RefreshProfiles => {
                let result = self.backend.get_profiles(info).await;
                self.report(result);
            }
            Msg::LoadSettings => {
                let report = self.backend.load_settings(settings).await?;
                self.report_sync("load", &report);
            }
            Msg::SaveSettings => {
                let report = self.backend.save_settings(settings).await;
                self.report_sync("save", &report);
            }
            Msg::SetDebug(target, enabled) => {
                match target {
                    DebugTarget::Frontend => settings.set_debug_frontend(enabled)?,
                    DebugTarget::Backend => settings.set_debug_backend(enabled)?,
                }
                let report = self.backend.save_settings(settings).await;
                self.report_sync("save", &report);
            }
            Msg::SelectProfile(name) => {
                if !info.profiles.is_empty() && !info.profiles.contains(&name) {
                    self.push_notification(format!("unknown profile: {name}"));
                    return Ok(());
                }
                settings.set_profile(name.as_str())?;
                let report = self.backend.save_settings(settings).await;
                let meta = self.backend.get_profile_meta(&name, info).await;
                self.report_sync("save", &report);
                self.report(meta);
            }
            Msg::UpdateProfile => {
                let profile = settings.profile().to_string();
                if profile.is_empty() {
                    self.push_notification("no profile selected".to_string());
                    return Ok(());
                }
                let result = self.backend.update_profile(&profile).await;
                if self.report(result).is_some() {
                    self.push_notification(format!("profile {profile} applied"));
                }
            }
            Msg::StartServer => {
                let result = self.backend.start_server(info).await;
                if self.report(result).is_some() {
                    let hint = self.config.dashboard_hint();
                    self.push_notification(format!("visit {hint} to update profiles"));
                }
            }
            Msg::StopServer => {
                let result = self.backend.stop_server(info).await;
                self.report(result);
            }
            Msg::CheckServer => {
                let result = self.backend.check_server(info).await;
                self.report(result);
            }
            Msg::StartService(name) => {
                let result = self.backend.start_service(&name).await;
                self.report_exit_code("start", &name, result);
                let refresh = self.backend.check_services(&mut self.session.info).await;
                self.report(refresh);
            }
            Msg::StopService(name) => {
                let result = self.backend.stop_service(&name).await;
                self.report_exit_code("stop", &name, result);
                let refresh = self.backend.check_services(&mut self.session.info).await;
                self.report(refresh);
            }
            Msg::CheckServiceExists(name) => {
                let result = self.backend.check_if_service_exists(&name, info).await;
                if let Some(exists) = self.report(result) {
                    let state = if exists { "installed" } else { "not installed" };
                    self.push_notification(format!("{name}: {state}"));
                }
            }
            Msg::InstallService => {
                let result = self.backend.install_service().await;
                if let Some(false) = self.report(result) {
                    self.push_notification("select a profile before installing".to_string());
                }
                let refresh = self.backend.check_services(&mut self.session.info).await;
                self.report(refresh);
            }
            Msg::UninstallService => {
                let result = self.backend.uninstall_service().await;
                self.report(result);
                let refresh = self.backend.check_services(&mut self.session.info).await;
                self.report(refresh);
            }
            Msg::CheckResolved => {
                let result = self.backend.check_resolved(info).await;
                self.report(result);
            }
            Msg::RestoreResolved => {
                let result = self.backend.restore_resolved().await;
                self.report(result);
                let refresh = self.backend.check_resolved(&mut self.session.info).await;
                self.report(refresh);
            }
            Msg::DisableResolved => {
                let result = self.backend.disable_resolved().await;
                self.report(result);
                let refresh = self.backend.check_resolved(&mut self.session.info).await;
                self.report(refresh);
            }
            Msg::Help => {
                for line in HELP {
                    self.push_notification((*line).to_string());
                }
            }
            Msg::Quit => self.should_quit = true,
            Msg::Command(_) => {}
        }
        Ok(())
    }

    /// Bridge errors are already logged; surface them as a notification and
    /// carry on.
    fn report<T>(&mut self, result: BridgeResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.push_notification(format!("{} failed", err.function()));
                None
            }
        }
    }

    fn report_exit_code(&mut self, verb: &str, service: &str, result: BridgeResult<i64>) {
        match self.report(result) {
            Some(0) => self.push_notification(format!("{verb} {service}: ok")),
            Some(code) => self.push_notification(format!("{verb} {service}: exit code {code}")),
            None => {}
        }
    }

    fn report_sync(&mut self, action: &str, report: &SyncReport) {
        if report.is_clean() {
            return;
        }
        let mut message = format!("settings {action}:");
        if !report.fallbacks.is_empty() {
            message.push_str(&format!(" {} kept default", report.fallbacks.len()));
        }
        if !report.failed.is_empty() {
            message.push_str(&format!(" {} not stored", report.failed.len()));
        }
        if report.commit_failed {
            message.push_str(" commit failed");
        }
        self.push_notification(message);
    }

    fn push_notification(&mut self, message: String) {
        self.notifications.push_back(message);
        while self.notifications.len() > MAX_NOTIFICATIONS {
            self.notifications.pop_front();
        }
    }

    fn describe_version(&self) -> &str {
        if self.session.info.version.is_empty() {
            "unknown"
        } else {
            &self.session.info.version
        }
    }

    // ── MVU: View ────────────────────────────────────────────────

    /// Plain-text rendering of the panel sections.
    pub fn view(&self) -> Vec<String> {
        let Session { settings, info } = &self.session;
        let mut lines = vec!["== Profile Download ==".to_string()];
        lines.push(format!(
            "start the server and visit {} to update profiles",
            self.config.dashboard_hint()
        ));
        lines.push(format!(
            "server: {}",
            if info.server_running { "running" } else { "stopped" }
        ));

        lines.push("== Profile ==".to_string());
        let selected = match (settings.profile(), &info.profile_meta) {
            ("", _) => "selected: none".to_string(),
            (name, Some(meta)) => format!(
                "selected: {name} ({:?}, updated {})",
                meta.kind, meta.update_time
            ),
            (name, None) => format!("selected: {name}"),
        };
        lines.push(selected);
        if !info.profiles.is_empty() {
            lines.push(format!("available: {}", info.profiles.join(", ")));
        }

        lines.push("== Service Status ==".to_string());
        for (name, status) in &info.services {
            lines.push(format!(
                "{name}: exists={} active={} enabled={}",
                status.exists, status.active, status.enabled
            ));
        }

        lines.push("== Debug Info ==".to_string());
        lines.push(format!("version: {}", self.describe_version()));
        lines.push(format!("frontend debug: {}", on_off(settings.debug_frontend())));
        lines.push(format!("backend debug: {}", on_off(settings.debug_backend())));

        if !self.notifications.is_empty() {
            lines.push("--".to_string());
            lines.extend(self.notifications.iter().cloned());
        }
        lines
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

const HELP: &[&str] = &[
    "commands:",
    "  refresh | profiles | load | save",
    "  debug frontend|backend on|off",
    "  profile <name> | update-profile",
    "  server start|stop|check",
    "  service start|stop|exists <name> | install | uninstall",
    "  resolved check|restore|disable",
    "  quit",
];

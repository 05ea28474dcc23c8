use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULTS: &str = include_str!("../../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: HostConfig,
    pub bridge: BridgeConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    pub base_url: String,
    pub plugin_name: String,
    pub auth_token: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BridgeConfig {
    pub token_gate: bool,
    pub forward_logs: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DashboardConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub file_name: String,
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config.
    pub fn load() -> Result<Self> {
        let user_path = project_dirs()
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .filter(|path| path.exists());
        Self::load_from(user_path.as_deref())
    }

    /// Same layering as [`AppConfig::load`], with an explicit user file.
    pub fn load_from(user_path: Option<&Path>) -> Result<Self> {
        let mut merged: toml::Table = toml::from_str(DEFAULTS).context("embedded defaults")?;

        if let Some(path) = user_path {
            let user_str = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let user: toml::Table = toml::from_str(&user_str)
                .with_context(|| format!("parsing {}", path.display()))?;
            merge_tables(&mut merged, user);
        }

        let config: AppConfig = toml::Value::Table(merged).try_into()?;
        Ok(config)
    }

    /// URL of the method endpoint for `function` on this plugin.
    pub fn method_url(&self, function: &str) -> String {
        format!(
            "{}/plugins/{}/methods/{function}",
            self.host.base_url.trim_end_matches('/'),
            self.host.plugin_name
        )
    }

    pub fn dashboard_hint(&self) -> String {
        format!("http://[steamdeck_ip]:{}", self.dashboard.port)
    }

    pub fn log_dir() -> PathBuf {
        project_dirs()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("/tmp"))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "tunup")
}

/// Recursively overlay `overlay` onto `base`. Tables merge key by key,
/// every other value replaces.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_parse() {
        let config = AppConfig::load_from(None).unwrap();
        assert_eq!(config.host.base_url, "http://127.0.0.1:1337");
        assert_eq!(config.host.plugin_name, "TunUp");
        assert!(!config.bridge.token_gate);
        assert!(config.bridge.forward_logs);
        assert_eq!(config.dashboard.port, 12345);
    }

    #[test]
    fn partial_user_file_only_overrides_named_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[bridge]\ntoken_gate = true\n\n[dashboard]\nport = 8080").unwrap();

        let config = AppConfig::load_from(Some(file.path())).unwrap();
        assert!(config.bridge.token_gate);
        assert!(config.bridge.forward_logs);
        assert_eq!(config.dashboard.port, 8080);
        assert_eq!(config.host.plugin_name, "TunUp");
    }

    #[test]
    fn malformed_user_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[dashboard]\nport = \"not a port\"").unwrap();

        assert!(AppConfig::load_from(Some(file.path())).is_err());
    }

    #[test]
    fn method_url_joins_plugin_and_function() {
        let mut config = AppConfig::load_from(None).unwrap();
        config.host.base_url = "http://localhost:1337/".to_string();
        assert_eq!(
            config.method_url("get_version"),
            "http://localhost:1337/plugins/TunUp/methods/get_version"
        );
    }
}

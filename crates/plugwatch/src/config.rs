//! Configuration loading and types

use std::path::{Path, PathBuf};
use std::time::Duration;

use plugwatch_core::{Credentials, ProbePolicy, ProvisionSettings};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the provisioner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error), overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Management API connection
    #[serde(default)]
    pub zabbix: ZabbixConfig,
    /// Declared inputs and readiness wait
    #[serde(default)]
    pub provision: ProvisionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            zabbix: ZabbixConfig::default(),
            provision: ProvisionConfig::default(),
        }
    }
}

/// Management API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZabbixConfig {
    /// Frontend root or full `api_jsonrpc.php` URL
    #[serde(default = "default_url")]
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Default for ZabbixConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            user: None,
            password: None,
        }
    }
}

/// Declared inputs and readiness wait
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionConfig {
    #[serde(default = "default_hosts_file")]
    pub hosts_file: PathBuf,
    #[serde(default = "default_template_file")]
    pub template_file: Option<PathBuf>,
    #[serde(default = "default_probe_attempts")]
    pub probe_attempts: u32,
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            hosts_file: default_hosts_file(),
            template_file: default_template_file(),
            probe_attempts: default_probe_attempts(),
            probe_interval_secs: default_probe_interval_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_url() -> String {
    "http://zabbix-web:8080".to_string()
}

fn default_hosts_file() -> PathBuf {
    PathBuf::from("/app/hosts.yaml")
}

#[allow(clippy::unnecessary_wraps)]
fn default_template_file() -> Option<PathBuf> {
    Some(PathBuf::from("/templates/template_kasa.yaml"))
}

fn default_probe_attempts() -> u32 {
    20
}

fn default_probe_interval_secs() -> u64 {
    10
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `PLUGWATCH_CONFIG` or the default paths, or use defaults
    ///
    /// Returns the path that was loaded, if any.
    ///
    /// # Errors
    /// Returns error if a config file exists but cannot be read or parsed
    pub fn load_default() -> eyre::Result<(Self, Option<PathBuf>)> {
        if let Ok(path) = std::env::var("PLUGWATCH_CONFIG") {
            let path = PathBuf::from(path);
            return Ok((Self::load(&path)?, Some(path)));
        }

        let mut paths = vec![
            PathBuf::from("plugwatch.toml"),
            PathBuf::from("/etc/plugwatch/plugwatch.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("plugwatch/plugwatch.toml"));
        }

        for path in paths {
            if path.exists() {
                return Ok((Self::load(&path)?, Some(path)));
            }
        }

        Ok((Config::default(), None))
    }

    /// Apply `ZABBIX_URL`, `ZABBIX_USER` and `ZABBIX_PASSWORD`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ZABBIX_URL") {
            self.zabbix.url = url;
        }
        if let Some(user) = lookup("ZABBIX_USER") {
            self.zabbix.user = Some(user);
        }
        if let Some(password) = lookup("ZABBIX_PASSWORD") {
            self.zabbix.password = Some(password);
        }
    }

    /// Resolve into the settings a provisioning run takes
    ///
    /// # Errors
    /// Returns error if the user or password is missing or empty
    pub fn into_settings(self) -> eyre::Result<ProvisionSettings> {
        let user = self.zabbix.user.filter(|u| !u.is_empty());
        let password = self.zabbix.password.filter(|p| !p.is_empty());
        let (Some(user), Some(password)) = (user, password) else {
            eyre::bail!("ZABBIX_USER and ZABBIX_PASSWORD must be set");
        };

        let mut settings = ProvisionSettings::new(self.zabbix.url, Credentials::new(user, password));
        settings.hosts_file = self.provision.hosts_file;
        settings.template_file = self.provision.template_file;
        settings.probe = ProbePolicy {
            max_attempts: self.provision.probe_attempts,
            interval: Duration::from_secs(self.provision.probe_interval_secs),
        };
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.zabbix.url, "http://zabbix-web:8080");
        assert_eq!(config.provision.probe_attempts, 20);
        assert_eq!(config.log_level, "info");
        assert!(config.zabbix.user.is_none());
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
log_level = "debug"

[zabbix]
url = "http://monitor.lan/zabbix"
user = "provisioner"

[provision]
hosts_file = "hosts.yaml"
probe_attempts = 3
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.zabbix.url, "http://monitor.lan/zabbix");
        assert_eq!(config.zabbix.user.as_deref(), Some("provisioner"));
        assert_eq!(config.provision.hosts_file, PathBuf::from("hosts.yaml"));
        assert_eq!(config.provision.probe_attempts, 3);
        assert_eq!(config.provision.probe_interval_secs, 10);
        assert_eq!(
            config.provision.template_file,
            Some(PathBuf::from("/templates/template_kasa.yaml"))
        );
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::default();
        config.zabbix.user = Some("from-file".to_string());
        config.apply_env(env(&[
            ("ZABBIX_URL", "http://zabbix-server/api_jsonrpc.php"),
            ("ZABBIX_USER", "Admin"),
            ("ZABBIX_PASSWORD", "zabbix"),
        ]));

        let settings = config.into_settings().unwrap();
        assert_eq!(settings.api_url, "http://zabbix-server/api_jsonrpc.php");
        assert_eq!(settings.credentials, Credentials::new("Admin", "zabbix"));
        assert_eq!(settings.probe.interval, Duration::from_secs(10));
    }

    #[test]
    fn test_missing_password_is_fatal() {
        let mut config = Config::default();
        config.apply_env(env(&[("ZABBIX_USER", "Admin")]));
        assert!(config.into_settings().is_err());
    }

    #[test]
    fn test_empty_user_is_fatal() {
        let mut config = Config::default();
        config.apply_env(env(&[("ZABBIX_USER", ""), ("ZABBIX_PASSWORD", "zabbix")]));
        assert!(config.into_settings().is_err());
    }
}

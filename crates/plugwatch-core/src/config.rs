//! Provisioning settings and the declared-hosts file

use std::collections::HashSet;
use std::fmt;
use std::io::ErrorKind;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use plugwatch_api::ImportRules;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ProvisionError;
use crate::probe::ProbePolicy;

/// API credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Everything a provisioning run needs, resolved once at startup
#[derive(Debug, Clone)]
pub struct ProvisionSettings {
    /// Frontend root or JSON-RPC endpoint URL
    pub api_url: String,
    pub credentials: Credentials,
    /// Declared-hosts YAML file
    pub hosts_file: PathBuf,
    /// Template bundle to import before reconciling hosts
    pub template_file: Option<PathBuf>,
    /// Readiness wait budget
    pub probe: ProbePolicy,
    pub import_rules: ImportRules,
}

impl ProvisionSettings {
    pub fn new(api_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            api_url: api_url.into(),
            credentials,
            hosts_file: PathBuf::from("hosts.yaml"),
            template_file: None,
            probe: ProbePolicy::default(),
            import_rules: ImportRules::default(),
        }
    }
}

/// A host that should exist on the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DesiredHost {
    /// Technical name, unique per run
    pub host: String,
    /// Visible name
    pub name: String,
    /// Agent interface address
    pub ip: String,
    /// Host group names
    #[serde(default)]
    pub groups: Vec<String>,
    /// Template names to link
    #[serde(default)]
    pub templates: Vec<String>,
}

/// Top-level layout of the declared-hosts file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HostsFile {
    hosts: Vec<DesiredHost>,
}

/// Load and validate the declared-hosts file
///
/// Returns `Ok(None)` when the file does not exist.
///
/// # Errors
/// Returns [`ProvisionError::Config`] if the file cannot be read, is not valid
/// YAML, or contains an invalid or duplicate host entry.
pub fn load_declared_hosts(path: &Path) -> Result<Option<Vec<DesiredHost>>, ProvisionError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "declared-hosts file not found, nothing to reconcile");
            return Ok(None);
        }
        Err(e) => {
            return Err(ProvisionError::Config(format!(
                "cannot read {}: {e}",
                path.display()
            )));
        }
    };

    let hosts = parse_declared_hosts(&content)
        .map_err(|reason| ProvisionError::Config(format!("{}: {reason}", path.display())))?;

    info!(path = %path.display(), count = hosts.len(), "loaded declared hosts");

    Ok(Some(hosts))
}

/// Parse and validate a declared-hosts document
fn parse_declared_hosts(content: &str) -> Result<Vec<DesiredHost>, String> {
    let file: HostsFile = serde_yaml::from_str(content).map_err(|e| e.to_string())?;

    {
        let mut seen = HashSet::new();
        for (index, entry) in file.hosts.iter().enumerate() {
            validate_host(entry).map_err(|reason| format!("hosts[{index}]: {reason}"))?;
            if !seen.insert(entry.host.as_str()) {
                return Err(format!("hosts[{index}]: duplicate host {:?}", entry.host));
            }
        }
    }

    Ok(file.hosts)
}

fn validate_host(entry: &DesiredHost) -> Result<(), String> {
    if entry.host.trim().is_empty() {
        return Err("`host` must not be empty".to_string());
    }
    if entry.name.trim().is_empty() {
        return Err(format!("{:?}: `name` must not be empty", entry.host));
    }
    entry
        .ip
        .parse::<IpAddr>()
        .map_err(|_| format!("{:?}: `ip` is not an IP address: {:?}", entry.host, entry.ip))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
hosts:
  - host: plug-kitchen
    name: Kitchen Plug
    ip: 192.168.1.50
    groups: [IoT]
    templates: [Kasa P110]
  - host: plug-office
    name: Office Plug
    ip: "fe80::1"
    groups:
      - IoT
      - Office
    templates:
      - Kasa P110
"#;

    #[test]
    fn test_parse_sample() {
        let hosts = parse_declared_hosts(SAMPLE).unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].host, "plug-kitchen");
        assert_eq!(hosts[0].name, "Kitchen Plug");
        assert_eq!(hosts[0].templates, vec!["Kasa P110"]);
        assert_eq!(hosts[1].groups, vec!["IoT", "Office"]);
    }

    #[test]
    fn test_missing_required_field() {
        let err = parse_declared_hosts("hosts:\n  - host: plug\n    ip: 10.0.0.1\n").unwrap_err();
        assert!(err.contains("name"), "{err}");
    }

    #[test]
    fn test_invalid_ip() {
        let doc = "hosts:\n  - host: plug\n    name: Plug\n    ip: kitchen.lan\n";
        let err = parse_declared_hosts(doc).unwrap_err();
        assert!(err.contains("hosts[0]"), "{err}");
        assert!(err.contains("not an IP address"), "{err}");
    }

    #[test]
    fn test_duplicate_host_rejected() {
        let doc = r"
hosts:
  - {host: plug, name: One, ip: 10.0.0.1}
  - {host: plug, name: Two, ip: 10.0.0.2}
";
        let err = parse_declared_hosts(doc).unwrap_err();
        assert!(err.contains("duplicate"), "{err}");
    }

    #[test]
    fn test_groups_and_templates_default_empty() {
        let hosts = parse_declared_hosts("hosts:\n  - {host: p, name: P, ip: 10.0.0.9}\n").unwrap();
        assert!(hosts[0].groups.is_empty());
        assert!(hosts[0].templates.is_empty());
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_declared_hosts(&dir.path().join("hosts.yaml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let hosts = load_declared_hosts(file.path()).unwrap().unwrap();
        assert_eq!(hosts.len(), 2);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hosts: [not, a, mapping").unwrap();

        let err = load_declared_hosts(file.path()).unwrap_err();
        assert!(matches!(err, ProvisionError::Config(_)));
    }

    #[test]
    fn test_credentials_debug_masks_password() {
        let creds = Credentials::new("Admin", "zabbix");
        let debug = format!("{creds:?}");
        assert!(debug.contains("Admin"));
        assert!(!debug.contains("zabbix"));
    }
}

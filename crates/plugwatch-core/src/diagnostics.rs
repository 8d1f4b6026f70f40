//! Read-only environment check
//!
//! Reports whether the declared files are usable and what the configured user
//! can see on the server. Never creates or changes anything remotely.

use std::io::ErrorKind;
use std::path::Path;

use plugwatch_api::{GroupRef, HostRef, TemplateRef};
use plugwatch_client::{ClientError, ManagementApi, SessionHandle};

use crate::config::{ProvisionSettings, load_declared_hosts};
use crate::error::ProvisionError;
use crate::session::{login, logout};

/// State of a local input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Missing,
    Invalid(String),
    Valid(String),
}

/// Objects visible to the configured user
#[derive(Debug, Clone, Default)]
pub struct ServerInventory {
    pub hosts: Vec<HostRef>,
    pub templates: Vec<TemplateRef>,
    pub groups: Vec<GroupRef>,
}

/// Result of [`diagnose`]
#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    pub hosts_file: FileStatus,
    pub template_file: Option<FileStatus>,
    /// API version, or why it could not be fetched
    pub api_version: Result<String, String>,
    /// Inventory, or why login or listing failed
    pub inventory: Result<ServerInventory, String>,
}

impl DiagnosticReport {
    /// True when nothing would stop a provisioning run
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        !matches!(self.hosts_file, FileStatus::Invalid(_))
            && !matches!(self.template_file, Some(FileStatus::Invalid(_)))
            && self.api_version.is_ok()
            && self.inventory.is_ok()
    }
}

/// Check files, API reachability and login without waiting or retrying
pub async fn diagnose(api: &dyn ManagementApi, settings: &ProvisionSettings) -> DiagnosticReport {
    let hosts_file = match load_declared_hosts(&settings.hosts_file) {
        Ok(None) => FileStatus::Missing,
        Ok(Some(hosts)) => FileStatus::Valid(format!("{} hosts declared", hosts.len())),
        Err(ProvisionError::Config(reason)) => FileStatus::Invalid(reason),
        Err(e) => FileStatus::Invalid(e.to_string()),
    };

    let template_file = match &settings.template_file {
        Some(path) => Some(check_template(path).await),
        None => None,
    };

    let api_version = api.api_version().await.map_err(|e| e.to_string());

    let inventory = match login(api, &settings.credentials).await {
        Ok(session) => {
            let inventory = list_inventory(api, &session)
                .await
                .map_err(|e| e.to_string());
            logout(api, &session).await;
            inventory
        }
        Err(e) => Err(e.to_string()),
    };

    DiagnosticReport {
        hosts_file,
        template_file,
        api_version,
        inventory,
    }
}

async fn check_template(path: &Path) -> FileStatus {
    match tokio::fs::read_to_string(path).await {
        Ok(content) if content.trim().is_empty() => FileStatus::Invalid("file is empty".to_string()),
        Ok(content) => FileStatus::Valid(format!("{} characters", content.chars().count())),
        Err(e) if e.kind() == ErrorKind::NotFound => FileStatus::Missing,
        Err(e) => FileStatus::Invalid(e.to_string()),
    }
}

async fn list_inventory(
    api: &dyn ManagementApi,
    session: &SessionHandle,
) -> Result<ServerInventory, ClientError> {
    Ok(ServerInventory {
        hosts: api.get_hosts(session, None).await?,
        templates: api.get_templates(session, None).await?,
        groups: api.get_host_groups(session, None).await?,
    })
}

//! Response types for the management API

use serde::{Deserialize, Serialize};

/// Existing host as returned by `host.get`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostRef {
    pub hostid: String,
    pub host: String,
}

/// Host group as returned by `hostgroup.get`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupRef {
    pub groupid: String,
    pub name: String,
}

/// Template as returned by `template.get`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateRef {
    pub templateid: String,
    pub name: String,
}

/// Result of `host.create`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedHosts {
    pub hostids: Vec<String>,
}

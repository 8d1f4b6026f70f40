//! Request types for the management API

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Port the Zabbix agent listens on
pub const AGENT_PORT: &str = "10050";

/// Interface type code for a Zabbix agent
pub const INTERFACE_TYPE_AGENT: u8 = 1;

/// Parameters for `user.login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Parameters for the `*.get` methods
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ObjectQuery {
    pub output: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<BTreeMap<String, Vec<String>>>,
}

impl ObjectQuery {
    /// Query returning the given output fields
    pub fn new<S: AsRef<str>>(output: &[S]) -> Self {
        Self {
            output: output.iter().map(|s| s.as_ref().to_string()).collect(),
            filter: None,
        }
    }

    /// Restrict results to objects whose `field` exactly matches one of `values`
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, values: &[String]) -> Self {
        self.filter
            .get_or_insert_with(BTreeMap::new)
            .insert(field.into(), values.to_vec());
        self
    }
}

/// Group reference inside `host.create`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupId {
    pub groupid: String,
}

/// Template reference inside `host.create`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateId {
    pub templateid: String,
}

/// Host interface descriptor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostInterface {
    #[serde(rename = "type")]
    pub kind: u8,
    pub main: u8,
    pub useip: u8,
    pub ip: String,
    pub dns: String,
    pub port: String,
}

impl HostInterface {
    /// Primary agent interface addressed by IP on the default agent port
    pub fn agent(ip: impl Into<String>) -> Self {
        Self {
            kind: INTERFACE_TYPE_AGENT,
            main: 1,
            useip: 1,
            ip: ip.into(),
            dns: String::new(),
            port: AGENT_PORT.to_string(),
        }
    }
}

/// Parameters for `host.create`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostCreate {
    /// Technical name
    pub host: String,
    /// Visible name
    pub name: String,
    pub interfaces: Vec<HostInterface>,
    pub groups: Vec<GroupId>,
    pub templates: Vec<TemplateId>,
}

/// Serialization format of a configuration bundle
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    #[default]
    Yaml,
    Xml,
    Json,
}

impl ImportFormat {
    /// Guess the format from a file extension, falling back to YAML
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("xml") => ImportFormat::Xml,
            Some("json") => ImportFormat::Json,
            _ => ImportFormat::Yaml,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Create/update flags for one kind of imported object
///
/// `updateExisting` is omitted when false; the server rejects it for
/// template linkage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportRule {
    pub create_missing: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub update_existing: bool,
}

impl ImportRule {
    pub const CREATE_AND_UPDATE: Self = Self {
        create_missing: true,
        update_existing: true,
    };

    pub const CREATE_ONLY: Self = Self {
        create_missing: true,
        update_existing: false,
    };
}

/// Import rules for `configuration.import`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportRules {
    pub templates: ImportRule,
    pub template_linkage: ImportRule,
    pub items: ImportRule,
    pub triggers: ImportRule,
    pub discovery_rules: ImportRule,
}

impl Default for ImportRules {
    /// Merge policy: create and update everything, link templates without unlinking
    fn default() -> Self {
        Self {
            templates: ImportRule::CREATE_AND_UPDATE,
            template_linkage: ImportRule::CREATE_ONLY,
            items: ImportRule::CREATE_AND_UPDATE,
            triggers: ImportRule::CREATE_AND_UPDATE,
            discovery_rules: ImportRule::CREATE_AND_UPDATE,
        }
    }
}

/// Parameters for `configuration.import`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigurationImport {
    pub format: ImportFormat,
    pub source: String,
    pub rules: ImportRules,
}

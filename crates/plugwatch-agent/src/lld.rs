//! Zabbix low-level discovery document

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::Serialize;

use crate::device::DeviceInfo;

/// One discovered plug, keyed by LLD macro name
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LldEntry {
    #[serde(rename = "{#PLUGIP}")]
    pub ip: String,
    #[serde(rename = "{#PLUGALIAS}")]
    pub alias: String,
}

/// `{"data": [...]}` as expected by Zabbix LLD rules
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct LldDocument {
    pub data: Vec<LldEntry>,
}

impl LldDocument {
    /// Entries for every plug with an energy meter, ordered by address
    pub fn from_devices(devices: &BTreeMap<IpAddr, DeviceInfo>) -> Self {
        let data = devices
            .iter()
            .filter(|(_, info)| info.has_emeter)
            .map(|(ip, info)| LldEntry {
                ip: ip.to_string(),
                alias: info.alias.clone(),
            })
            .collect();
        Self { data }
    }
}

//! plugwatch-api: Zabbix management API wire types
//!
//! Contains the JSON-RPC envelope plus the request and response shapes used by
//! the client and the provisioning core.

pub mod requests;
pub mod responses;
pub mod rpc;

pub use requests::{
    ConfigurationImport, GroupId, HostCreate, HostInterface, ImportFormat, ImportRule,
    ImportRules, LoginRequest, ObjectQuery, TemplateId,
};
pub use responses::{CreatedHosts, GroupRef, HostRef, TemplateRef};
pub use rpc::{RpcError, RpcRequest, RpcResponse};

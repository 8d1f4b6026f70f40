//! plugwatch-core: Provisioning reconciler
//!
//! Waits for the Zabbix API to come up, logs in, imports the template bundle
//! and creates the declared hosts that do not exist yet. Existing hosts are
//! never touched.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod import;
pub mod orchestrator;
pub mod outcome;
pub mod probe;
pub mod reconcile;
pub mod session;
pub mod state;

pub use config::{Credentials, DesiredHost, ProvisionSettings, load_declared_hosts};
pub use diagnostics::{DiagnosticReport, FileStatus, ServerInventory, diagnose};
pub use error::ProvisionError;
pub use import::{TemplateBundle, import_template};
pub use orchestrator::Provisioner;
pub use outcome::{HostOutcome, HostReport, ImportOutcome, RunSummary};
pub use probe::{ProbePolicy, ProbeStatus, probe_api, wait_until_ready};
pub use reconcile::reconcile;
pub use session::{login, logout};
pub use state::ProvisionState;

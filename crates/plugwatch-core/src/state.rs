//! Provisioning run state machine

use std::fmt;

/// Phases of a provisioning run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionState {
    LoadConfig,
    WaitApi,
    Authenticate,
    ImportTemplates,
    ReconcileHosts,
    Logout,
    Success,
    Failure,
}

impl ProvisionState {
    /// Check whether `next` may follow this state
    ///
    /// Only config loading, the readiness wait and login can fail the run.
    #[must_use]
    pub fn can_transition_to(self, next: ProvisionState) -> bool {
        use ProvisionState::*;

        matches!(
            (self, next),
            (LoadConfig, WaitApi | Failure)
                | (WaitApi, Authenticate | Failure)
                | (Authenticate, ImportTemplates | Failure)
                | (ImportTemplates, ReconcileHosts)
                | (ReconcileHosts, Logout)
                | (Logout, Success)
        )
    }

    /// Terminal states end the run
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, ProvisionState::Success | ProvisionState::Failure)
    }
}

impl fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisionState::LoadConfig => "load_config",
            ProvisionState::WaitApi => "wait_api",
            ProvisionState::Authenticate => "authenticate",
            ProvisionState::ImportTemplates => "import_templates",
            ProvisionState::ReconcileHosts => "reconcile_hosts",
            ProvisionState::Logout => "logout",
            ProvisionState::Success => "success",
            ProvisionState::Failure => "failure",
        };
        f.write_str(name)
    }
}

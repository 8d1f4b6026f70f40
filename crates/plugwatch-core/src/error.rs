//! Core error types for plugwatch-core

use thiserror::Error;

use crate::state::ProvisionState;

/// Errors that abort a provisioning run
///
/// Everything else (template import, per-host failures) is recorded as an
/// outcome and the run carries on.
#[derive(Error, Debug, Clone)]
pub enum ProvisionError {
    /// Declared configuration is missing or invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// API never became ready within the attempt budget
    #[error("management API not available after {attempts} attempts")]
    ApiUnavailable {
        /// Number of probes issued
        attempts: u32,
    },

    /// Login was rejected or the endpoint could not be reached
    #[error("authentication failed for {username}: {reason}")]
    Authentication {
        /// User that tried to log in
        username: String,
        /// Error reported by the client
        reason: String,
    },
}

impl ProvisionError {
    /// Phase the run was in when it failed
    #[must_use]
    pub fn phase(&self) -> ProvisionState {
        match self {
            ProvisionError::Config(_) => ProvisionState::LoadConfig,
            ProvisionError::ApiUnavailable { .. } => ProvisionState::WaitApi,
            ProvisionError::Authentication { .. } => ProvisionState::Authenticate,
        }
    }
}

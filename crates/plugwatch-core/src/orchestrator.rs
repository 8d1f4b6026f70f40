//! `Provisioner`: sequences a full provisioning run
//!
//! `LoadConfig → WaitApi → Authenticate → ImportTemplates → ReconcileHosts →
//! Logout → Success`. Only the first three phases can end the run in
//! `Failure`; import and host failures are recorded in the summary.

use std::sync::Arc;

use chrono::Utc;
use plugwatch_client::ManagementApi;
use tracing::{debug, error, info};

use crate::config::{ProvisionSettings, load_declared_hosts};
use crate::error::ProvisionError;
use crate::import::import_template;
use crate::outcome::RunSummary;
use crate::probe::{probe_api, wait_until_ready};
use crate::reconcile::reconcile;
use crate::session::{login, logout};
use crate::state::ProvisionState;

/// Drives one provisioning run against a management API
pub struct Provisioner {
    api: Arc<dyn ManagementApi>,
    settings: ProvisionSettings,
    state: ProvisionState,
}

impl Provisioner {
    pub fn new(api: Arc<dyn ManagementApi>, settings: ProvisionSettings) -> Self {
        Self {
            api,
            settings,
            state: ProvisionState::LoadConfig,
        }
    }

    /// Current phase
    #[must_use]
    pub fn state(&self) -> ProvisionState {
        self.state
    }

    fn enter(&mut self, next: ProvisionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {next}",
            self.state
        );
        debug!(from = %self.state, to = %next, "provisioning phase");
        self.state = next;
    }

    fn fail(&mut self, err: ProvisionError) -> ProvisionError {
        error!(phase = %self.state, error = %err, "provisioning failed");
        self.enter(ProvisionState::Failure);
        err
    }

    /// Run every phase to completion
    ///
    /// # Errors
    /// Returns an error if the declared-hosts file is malformed, the API never
    /// becomes ready, or login is rejected. No remote calls are made after
    /// such an error, and logout is not attempted.
    pub async fn run(&mut self) -> Result<RunSummary, ProvisionError> {
        let started_at = Utc::now();
        self.state = ProvisionState::LoadConfig;

        let hosts = match load_declared_hosts(&self.settings.hosts_file) {
            Ok(hosts) => hosts.unwrap_or_default(),
            Err(e) => return Err(self.fail(e)),
        };

        self.enter(ProvisionState::WaitApi);
        let api = Arc::clone(&self.api);
        let policy = self.settings.probe;
        info!(url = %self.settings.api_url, max_attempts = policy.max_attempts, "waiting for management API");
        if !wait_until_ready(&policy, || probe_api(api.as_ref())).await {
            return Err(self.fail(ProvisionError::ApiUnavailable {
                attempts: policy.max_attempts,
            }));
        }

        self.enter(ProvisionState::Authenticate);
        let session = match login(api.as_ref(), &self.settings.credentials).await {
            Ok(session) => session,
            Err(e) => return Err(self.fail(e)),
        };

        self.enter(ProvisionState::ImportTemplates);
        let template = import_template(
            api.as_ref(),
            &session,
            self.settings.template_file.as_deref(),
            &self.settings.import_rules,
        )
        .await;

        self.enter(ProvisionState::ReconcileHosts);
        let reports = reconcile(api.as_ref(), &session, &hosts).await;

        self.enter(ProvisionState::Logout);
        logout(api.as_ref(), &session).await;

        self.enter(ProvisionState::Success);
        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            template,
            hosts: reports,
        };
        info!(summary = %summary, "provisioning finished");

        Ok(summary)
    }
}

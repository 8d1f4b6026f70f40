//! Management API trait

use std::fmt;

use async_trait::async_trait;
use plugwatch_api::{ConfigurationImport, GroupRef, HostCreate, HostRef, TemplateRef};

use crate::error::Result;

/// Authenticated session token
///
/// `Debug` output is redacted so the token never reaches the logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value
    #[must_use]
    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionHandle(***)")
    }
}

/// Operations the provisioner needs from the monitoring server
///
/// `names = None` lists every object visible to the session; `Some` restricts
/// the result to exact name matches.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Unauthenticated version check, used as the readiness probe
    async fn api_version(&self) -> Result<String>;

    async fn login(&self, username: &str, password: &str) -> Result<SessionHandle>;

    async fn logout(&self, session: &SessionHandle) -> Result<()>;

    /// Hosts filtered by technical name
    async fn get_hosts(
        &self,
        session: &SessionHandle,
        names: Option<&[String]>,
    ) -> Result<Vec<HostRef>>;

    async fn get_host_groups(
        &self,
        session: &SessionHandle,
        names: Option<&[String]>,
    ) -> Result<Vec<GroupRef>>;

    async fn get_templates(
        &self,
        session: &SessionHandle,
        names: Option<&[String]>,
    ) -> Result<Vec<TemplateRef>>;

    /// Create a host and return its id
    async fn create_host(&self, session: &SessionHandle, host: &HostCreate) -> Result<String>;

    async fn import_configuration(
        &self,
        session: &SessionHandle,
        import: &ConfigurationImport,
    ) -> Result<()>;
}

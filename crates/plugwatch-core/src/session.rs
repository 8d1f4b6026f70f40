//! Session login and best-effort logout

use plugwatch_client::{ManagementApi, SessionHandle};
use tracing::{debug, info, warn};

use crate::config::Credentials;
use crate::error::ProvisionError;

/// Log in once
///
/// # Errors
/// Any failure is [`ProvisionError::Authentication`]. By the time this runs
/// the API has answered the readiness probe, so a failure here is treated as
/// a configuration problem and not retried.
pub async fn login(
    api: &dyn ManagementApi,
    credentials: &Credentials,
) -> Result<SessionHandle, ProvisionError> {
    match api
        .login(&credentials.username, &credentials.password)
        .await
    {
        Ok(session) => {
            info!(username = %credentials.username, "logged in");
            Ok(session)
        }
        Err(e) => Err(ProvisionError::Authentication {
            username: credentials.username.clone(),
            reason: e.to_string(),
        }),
    }
}

/// Log out, logging failures without propagating them
pub async fn logout(api: &dyn ManagementApi, session: &SessionHandle) {
    match api.logout(session).await {
        Ok(()) => debug!("logged out"),
        Err(e) => warn!(error = %e, "logout failed"),
    }
}

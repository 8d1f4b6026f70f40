//! Host reconciliation
//!
//! Creates declared hosts that are missing on the server. Existence is decided
//! by technical name alone; a host that exists is never read further or
//! changed, even when its declared groups or templates differ.

use plugwatch_api::{GroupId, HostCreate, HostInterface, TemplateId};
use plugwatch_client::{ClientError, ManagementApi, SessionHandle};
use tracing::{error, info, instrument, warn};

use crate::config::DesiredHost;
use crate::outcome::{HostOutcome, HostReport};

/// Reconcile every declared host, in order
///
/// A failure on one host is recorded in its report and the next host is
/// processed as usual.
#[instrument(skip_all, fields(count = hosts.len()))]
pub async fn reconcile(
    api: &dyn ManagementApi,
    session: &SessionHandle,
    hosts: &[DesiredHost],
) -> Vec<HostReport> {
    let mut reports = Vec::with_capacity(hosts.len());

    for desired in hosts {
        let outcome = match reconcile_host(api, session, desired).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(host = %desired.host, error = %e, "failed to provision host");
                HostOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        reports.push(HostReport {
            host: desired.host.clone(),
            outcome,
        });
    }

    reports
}

async fn reconcile_host(
    api: &dyn ManagementApi,
    session: &SessionHandle,
    desired: &DesiredHost,
) -> Result<HostOutcome, ClientError> {
    let existing = api
        .get_hosts(session, Some(std::slice::from_ref(&desired.host)))
        .await?;
    if existing.iter().any(|h| h.host == desired.host) {
        info!(host = %desired.host, "host already exists, skipping");
        return Ok(HostOutcome::Exists);
    }

    let groups = resolve_groups(api, session, desired).await?;
    if groups.is_empty() {
        warn!(host = %desired.host, groups = ?desired.groups, "no host group resolved, skipping host");
        return Ok(HostOutcome::Skipped {
            reason: format!("no host group found for {}", desired.host),
        });
    }

    let templates = resolve_templates(api, session, desired).await?;
    if templates.is_empty() {
        warn!(host = %desired.host, templates = ?desired.templates, "no template resolved, skipping host");
        return Ok(HostOutcome::Skipped {
            reason: format!("no template found for {}", desired.host),
        });
    }

    let request = HostCreate {
        host: desired.host.clone(),
        name: desired.name.clone(),
        interfaces: vec![HostInterface::agent(&desired.ip)],
        groups,
        templates,
    };

    let hostid = api.create_host(session, &request).await?;
    info!(host = %desired.host, hostid = %hostid, "host created");

    Ok(HostOutcome::Created { hostid })
}

/// Resolve declared group names to ids
///
/// An empty declaration resolves to nothing without asking the server, since
/// an unfiltered lookup would match every group.
async fn resolve_groups(
    api: &dyn ManagementApi,
    session: &SessionHandle,
    desired: &DesiredHost,
) -> Result<Vec<GroupId>, ClientError> {
    if desired.groups.is_empty() {
        return Ok(Vec::new());
    }

    let found = api.get_host_groups(session, Some(&desired.groups)).await?;
    warn_unresolved(
        &desired.host,
        "group",
        &desired.groups,
        found.iter().map(|g| g.name.as_str()),
    );

    Ok(found
        .into_iter()
        .map(|g| GroupId { groupid: g.groupid })
        .collect())
}

async fn resolve_templates(
    api: &dyn ManagementApi,
    session: &SessionHandle,
    desired: &DesiredHost,
) -> Result<Vec<TemplateId>, ClientError> {
    if desired.templates.is_empty() {
        return Ok(Vec::new());
    }

    let found = api.get_templates(session, Some(&desired.templates)).await?;
    warn_unresolved(
        &desired.host,
        "template",
        &desired.templates,
        found.iter().map(|t| t.name.as_str()),
    );

    Ok(found
        .into_iter()
        .map(|t| TemplateId {
            templateid: t.templateid,
        })
        .collect())
}

/// Warn about declared names the server did not return
fn warn_unresolved<'a>(
    host: &str,
    kind: &str,
    declared: &[String],
    found: impl Iterator<Item = &'a str> + Clone,
) {
    let missing = missing_names(declared, found);
    if !missing.is_empty() && missing.len() < declared.len() {
        warn!(host = %host, kind, missing = ?missing, "some declared names did not resolve");
    }
}

fn missing_names<'a, 'b>(
    declared: &'a [String],
    found: impl Iterator<Item = &'b str> + Clone,
) -> Vec<&'a str> {
    declared
        .iter()
        .map(String::as_str)
        .filter(|name| !found.clone().any(|f| f == *name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_names() {
        let declared = vec!["IoT".to_string(), "Office".to_string(), "IoT".to_string()];
        let found = ["IoT"];
        assert_eq!(missing_names(&declared, found.iter().copied()), vec!["Office"]);
    }

    #[test]
    fn test_missing_names_exact_match() {
        let declared = vec!["iot".to_string()];
        let found = ["IoT"];
        assert_eq!(missing_names(&declared, found.iter().copied()), vec!["iot"]);
    }
}

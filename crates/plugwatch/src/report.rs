//! Console output for run summaries and diagnostics

use plugwatch_core::{
    DiagnosticReport, FileStatus, HostOutcome, ImportOutcome, ProvisionSettings, RunSummary,
};

use crate::config::Config;

/// Show only the length of a secret
fn mask(secret: &str) -> String {
    "*".repeat(secret.chars().count())
}

pub fn print_summary(summary: &RunSummary) {
    for report in &summary.hosts {
        match &report.outcome {
            HostOutcome::Created { hostid } => println!("+ {} (id {hostid})", report.host),
            HostOutcome::Exists => println!("= {}", report.host),
            HostOutcome::Skipped { reason } => println!("~ {}: {reason}", report.host),
            HostOutcome::Failed { reason } => println!("✗ {}: {reason}", report.host),
        }
    }
    if let ImportOutcome::Failed { template, reason } = &summary.template {
        println!("✗ template {}: {reason}", template.display());
    }

    let elapsed = summary.finished_at - summary.started_at;
    println!("{summary} elapsed={}s", elapsed.num_seconds());
}

pub fn print_environment(config: &Config) {
    println!("Environment");
    println!("  url:      {}", config.zabbix.url);
    println!(
        "  user:     {}",
        config.zabbix.user.as_deref().unwrap_or("<not set>")
    );
    println!(
        "  password: {}",
        config
            .zabbix
            .password
            .as_deref()
            .map_or_else(|| "<not set>".to_string(), mask)
    );
}

fn file_line(label: &str, path: &std::path::Path, status: &FileStatus) {
    match status {
        FileStatus::Missing => println!("  ✗ {label} {} does not exist", path.display()),
        FileStatus::Invalid(reason) => println!("  ✗ {label} {}: {reason}", path.display()),
        FileStatus::Valid(detail) => println!("  ✓ {label} {} ({detail})", path.display()),
    }
}

pub fn print_diagnostics(settings: &ProvisionSettings, report: &DiagnosticReport) {
    println!("Files");
    file_line("hosts", &settings.hosts_file, &report.hosts_file);
    if let (Some(path), Some(status)) = (&settings.template_file, &report.template_file) {
        file_line("template", path, status);
    }

    println!("API");
    match &report.api_version {
        Ok(version) => println!("  ✓ version {version}"),
        Err(e) => println!("  ✗ {e}"),
    }

    match &report.inventory {
        Ok(inventory) => {
            println!("  ✓ login as {}", settings.credentials.username);
            println!("  hosts: {}", inventory.hosts.len());
            for host in &inventory.hosts {
                println!("    - {} (id {})", host.host, host.hostid);
            }
            println!("  templates: {}", inventory.templates.len());
            for template in inventory.templates.iter().take(5) {
                println!("    - {}", template.name);
            }
            println!("  groups: {}", inventory.groups.len());
            for group in &inventory.groups {
                println!("    - {} (id {})", group.name, group.groupid);
            }
        }
        Err(e) => println!("  ✗ {e}"),
    }
}

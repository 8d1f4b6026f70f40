//! plugwatch provisioner
//!
//! Waits for the Zabbix API, imports the template bundle and creates the
//! declared hosts that are missing. Safe to run repeatedly; run one instance
//! at a time per server.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use plugwatch_client::ZabbixClient;
use plugwatch_core::{Provisioner, diagnose};

mod config;
mod report;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "plugwatch", version)]
#[command(about = "Provision Zabbix templates and hosts from a declared inventory", long_about = None)]
struct Cli {
    /// Configuration file (defaults to $PLUGWATCH_CONFIG or plugwatch.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Declared-hosts YAML file
    #[arg(long)]
    hosts: Option<PathBuf>,

    /// Template bundle to import
    #[arg(long, conflicts_with = "no_template")]
    template: Option<PathBuf>,

    /// Skip the template import
    #[arg(long)]
    no_template: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Commands {
    /// Wait for the API, import templates and create missing hosts (default)
    Provision,
    /// Check configuration, files and API access without changing anything
    Check,
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let (mut config, source) = match &cli.config {
        Some(path) => (Config::load(path)?, Some(path.clone())),
        None => Config::load_default()?,
    };
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(hosts) = cli.hosts {
        config.provision.hosts_file = hosts;
    }
    if let Some(template) = cli.template {
        config.provision.template_file = Some(template);
    }
    if cli.no_template {
        config.provision.template_file = None;
    }

    init_tracing(&config.log_level, cli.log_json);
    match &source {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => info!("no config file found, using defaults"),
    }

    match cli.command.unwrap_or(Commands::Provision) {
        Commands::Provision => provision(config).await,
        Commands::Check => check(config).await,
    }
}

async fn provision(config: Config) -> Result<ExitCode> {
    let settings = config.into_settings()?;
    let client = ZabbixClient::new(&settings.api_url)?;
    info!(endpoint = %client.endpoint(), "starting provisioning");

    let mut provisioner = Provisioner::new(Arc::new(client), settings);
    match provisioner.run().await {
        Ok(summary) => {
            report::print_summary(&summary);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(phase = %e.phase(), error = %e, "provisioning aborted");
            eprintln!("provisioning failed: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn check(config: Config) -> Result<ExitCode> {
    report::print_environment(&config);

    let settings = match config.into_settings() {
        Ok(settings) => settings,
        Err(e) => {
            println!("✗ {e}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let client = ZabbixClient::new(&settings.api_url)?;

    let diagnostics = diagnose(&client, &settings).await;
    report::print_diagnostics(&settings, &diagnostics);

    if diagnostics.is_healthy() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

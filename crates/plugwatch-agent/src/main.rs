//! plugwatch agent
//!
//! Zabbix agent helpers for smart plugs: low-level discovery of plugs with an
//! energy meter, and a live power reading for one plug. Power readings try the
//! authenticated protocol first and fall back to the legacy one. Results go to
//! stdout; logs go to stderr.

use std::net::{IpAddr, Ipv4Addr};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod device;
mod error;
mod klap;
mod lld;
mod protocol;

use config::Credentials;
use device::{DeviceQuery, DeviceScanner, SmartHomeTransport, read_power_any};
use error::DeviceError;
use klap::KlapTransport;
use lld::LldDocument;

/// plugwatch agent helpers
#[derive(Parser, Debug)]
#[command(name = "plugwatch-agent", version, about)]
struct Args {
    /// Port of the legacy protocol
    #[arg(long, global = true, default_value_t = protocol::PORT)]
    port: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print plugs with an energy meter as a Zabbix LLD document
    Discover {
        /// Seconds to wait for replies
        #[arg(long, default_value = "5")]
        timeout: u64,

        /// Broadcast address to probe
        #[arg(long, default_value_t = Ipv4Addr::BROADCAST)]
        broadcast: Ipv4Addr,
    },
    /// Print the current power draw of one plug in watts
    ///
    /// Requires KASA_USERNAME and KASA_PASSWORD.
    Power {
        /// Plug address
        ip: IpAddr,

        /// Seconds to wait for the plug
        #[arg(long, default_value = "15")]
        timeout: u64,

        /// Port of the authenticated protocol
        #[arg(long, default_value_t = klap::PORT)]
        http_port: u16,
    },
}

/// Scan and build the LLD document, reporting nothing on failure
async fn discover(scanner: &dyn DeviceScanner, wait: Duration) -> LldDocument {
    match scanner.discover(wait).await {
        Ok(devices) => {
            debug!(count = devices.len(), "discovery finished");
            LldDocument::from_devices(&devices)
        }
        Err(e) => {
            warn!(error = %e, "discovery failed");
            LldDocument::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Discover { timeout, broadcast } => {
            let wait = Duration::from_secs(timeout);
            let transport = SmartHomeTransport::new(wait)
                .with_port(args.port)
                .with_broadcast(broadcast);
            let doc = discover(&transport, wait).await;
            println!("{}", serde_json::to_string(&doc)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Power {
            ip,
            timeout,
            http_port,
        } => {
            let credentials = Credentials::from_env(|key| std::env::var(key).ok())?;
            debug!(username = %credentials.username, "plug account configured");

            let wait = Duration::from_secs(timeout);
            let klap = KlapTransport::new(credentials, wait).with_port(http_port);
            let legacy = SmartHomeTransport::new(wait).with_port(args.port);
            match power(&[&klap, &legacy], ip, wait).await {
                Ok(watts) => {
                    println!("{watts}");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("ERROR: {ip}: {e}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

/// Read power within one overall deadline
async fn power(
    queries: &[&dyn DeviceQuery],
    addr: IpAddr,
    wait: Duration,
) -> Result<f64, DeviceError> {
    tokio::time::timeout(wait, read_power_any(queries, addr))
        .await
        .map_err(|_| DeviceError::Timeout {
            addr,
            timeout: wait,
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use device::DeviceInfo;

    struct FailingScanner;

    #[async_trait]
    impl DeviceScanner for FailingScanner {
        async fn discover(
            &self,
            _wait: Duration,
        ) -> Result<BTreeMap<IpAddr, DeviceInfo>, DeviceError> {
            Err(DeviceError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "broadcast not permitted",
            )))
        }
    }

    struct OnePlug;

    #[async_trait]
    impl DeviceScanner for OnePlug {
        async fn discover(
            &self,
            _wait: Duration,
        ) -> Result<BTreeMap<IpAddr, DeviceInfo>, DeviceError> {
            let mut devices = BTreeMap::new();
            devices.insert(
                "192.168.1.50".parse().unwrap(),
                DeviceInfo {
                    alias: "Kitchen".into(),
                    model: "KP115(EU)".into(),
                    has_emeter: true,
                },
            );
            Ok(devices)
        }
    }

    #[tokio::test]
    async fn test_discover_failure_yields_empty_document() {
        let doc = discover(&FailingScanner, Duration::from_millis(10)).await;
        assert!(doc.data.is_empty());
    }

    #[tokio::test]
    async fn test_discover_lists_plug() {
        let doc = discover(&OnePlug, Duration::from_millis(10)).await;
        assert_eq!(doc.data.len(), 1);
        assert_eq!(doc.data[0].ip, "192.168.1.50");
        assert_eq!(doc.data[0].alias, "Kitchen");
    }

    #[test]
    fn test_cli_parses_power() {
        let args = Args::try_parse_from(["plugwatch-agent", "power", "192.168.1.50"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Power {
                timeout: 15,
                http_port: 80,
                ..
            }
        ));
        assert_eq!(args.port, 9999);
    }

    struct SlowPlug;

    #[async_trait]
    impl DeviceQuery for SlowPlug {
        async fn sysinfo(&self, _addr: IpAddr) -> Result<DeviceInfo, DeviceError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(DeviceInfo {
                alias: "Kitchen".into(),
                model: "P110".into(),
                has_emeter: true,
            })
        }

        async fn realtime_power(&self, _addr: IpAddr) -> Result<f64, DeviceError> {
            Ok(12.5)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_power_respects_overall_deadline() {
        let addr: IpAddr = "192.168.1.50".parse().unwrap();
        let err = power(&[&SlowPlug], addr, Duration::from_secs(15))
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Timeout { .. }));
    }
}

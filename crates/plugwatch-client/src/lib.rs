//! plugwatch-client: Zabbix JSON-RPC client
//!
//! Provides the [`ManagementApi`] trait the provisioning core is written
//! against, and [`ZabbixClient`], its HTTP implementation.
//!
//! # Example
//!
//! ```no_run
//! use plugwatch_client::{ManagementApi, ZabbixClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ZabbixClient::new("http://zabbix-web:8080")?;
//! println!("API {}", client.api_version().await?);
//!
//! let session = client.login("Admin", "zabbix").await?;
//! let hosts = client.get_hosts(&session, None).await?;
//! println!("{} hosts", hosts.len());
//! client.logout(&session).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod traits;

pub use error::{ClientError, Result};
pub use http::ZabbixClient;
pub use traits::{ManagementApi, SessionHandle};

//! Plug discovery and queries

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, instrument};

use crate::error::DeviceError;
use crate::protocol::{self, GET_REALTIME, GET_SYSINFO};

/// Largest reply accepted over TCP
const MAX_REPLY_LEN: usize = 64 * 1024;

/// What a plug reports about itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Name given to the plug in the vendor app
    pub alias: String,
    pub model: String,
    pub has_emeter: bool,
}

/// Finds plugs on the local network
#[async_trait]
pub trait DeviceScanner: Send + Sync {
    /// Collect every plug that answers within `wait`
    async fn discover(&self, wait: Duration) -> Result<BTreeMap<IpAddr, DeviceInfo>, DeviceError>;
}

/// Talks to a single plug
#[async_trait]
pub trait DeviceQuery: Send + Sync {
    async fn sysinfo(&self, addr: IpAddr) -> Result<DeviceInfo, DeviceError>;

    /// Current draw in watts
    async fn realtime_power(&self, addr: IpAddr) -> Result<f64, DeviceError>;
}

/// Read the power of a plug, refusing devices without an energy meter
///
/// # Errors
/// Returns [`DeviceError::NoEnergyMeter`] for plain switches, or the query error.
pub async fn read_power(query: &dyn DeviceQuery, addr: IpAddr) -> Result<f64, DeviceError> {
    let info = query.sysinfo(addr).await?;
    if !info.has_emeter {
        return Err(DeviceError::NoEnergyMeter(addr));
    }
    query.realtime_power(addr).await
}

/// Read power through the first protocol the device answers on
///
/// Transport failures move on to the next query. An answer from the device
/// itself, such as a missing energy meter or rejected credentials, ends the
/// search.
///
/// # Errors
/// Returns the final error, or the last transport error if no query succeeded.
pub async fn read_power_any(
    queries: &[&dyn DeviceQuery],
    addr: IpAddr,
) -> Result<f64, DeviceError> {
    let mut last = DeviceError::Config("no device protocol configured".to_string());
    for query in queries {
        match read_power(*query, addr).await {
            Ok(watts) => return Ok(watts),
            Err(e) if e.is_final() => return Err(e),
            Err(e) => {
                debug!(addr = %addr, error = %e, "protocol unavailable, trying next");
                last = e;
            }
        }
    }
    Err(last)
}

#[derive(Deserialize)]
struct SysinfoReply {
    system: SystemSection,
}

#[derive(Deserialize)]
struct SystemSection {
    get_sysinfo: Sysinfo,
}

#[derive(Deserialize)]
struct Sysinfo {
    #[serde(default)]
    alias: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    feature: String,
    #[serde(default)]
    err_code: i64,
    #[serde(default)]
    err_msg: String,
}

#[derive(Deserialize)]
struct RealtimeReply {
    emeter: EmeterSection,
}

#[derive(Deserialize)]
struct EmeterSection {
    get_realtime: Realtime,
}

#[derive(Deserialize)]
struct Realtime {
    power: Option<f64>,
    power_mw: Option<f64>,
    #[serde(default)]
    err_code: i64,
    #[serde(default)]
    err_msg: String,
}

pub(crate) fn invalid(addr: IpAddr, reason: impl ToString) -> DeviceError {
    DeviceError::InvalidReply {
        addr,
        reason: reason.to_string(),
    }
}

/// Decode a `get_sysinfo` reply
pub fn parse_sysinfo(addr: IpAddr, body: &[u8]) -> Result<DeviceInfo, DeviceError> {
    let reply: SysinfoReply = serde_json::from_slice(body).map_err(|e| invalid(addr, e))?;
    let info = reply.system.get_sysinfo;
    if info.err_code != 0 {
        return Err(DeviceError::Device {
            addr,
            code: info.err_code,
            message: info.err_msg,
        });
    }

    Ok(DeviceInfo {
        has_emeter: info.feature.split(':').any(|f| f == "ENE"),
        alias: info.alias,
        model: info.model,
    })
}

/// Decode a `get_realtime` reply into watts
///
/// Older firmware reports `power` in W, newer firmware `power_mw` in mW.
pub fn parse_realtime(addr: IpAddr, body: &[u8]) -> Result<f64, DeviceError> {
    let reply: RealtimeReply = serde_json::from_slice(body).map_err(|e| invalid(addr, e))?;
    let realtime = reply.emeter.get_realtime;
    if realtime.err_code != 0 {
        return Err(DeviceError::Device {
            addr,
            code: realtime.err_code,
            message: realtime.err_msg,
        });
    }

    match (realtime.power, realtime.power_mw) {
        (Some(watts), _) => Ok(watts),
        (None, Some(milliwatts)) => Ok(milliwatts / 1000.0),
        (None, None) => Err(invalid(addr, "reply carries no power field")),
    }
}

/// Local-network transport speaking the smart-home protocol
#[derive(Debug, Clone)]
pub struct SmartHomeTransport {
    port: u16,
    timeout: Duration,
    broadcast: Ipv4Addr,
}

impl SmartHomeTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            port: protocol::PORT,
            timeout,
            broadcast: Ipv4Addr::BROADCAST,
        }
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Send discovery to a directed broadcast address instead of 255.255.255.255
    #[must_use]
    pub fn with_broadcast(mut self, broadcast: Ipv4Addr) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// One request/reply exchange over TCP
    async fn exchange(&self, addr: IpAddr, request: &str) -> Result<Vec<u8>, DeviceError> {
        let io = async {
            let mut stream = TcpStream::connect(SocketAddr::new(addr, self.port)).await?;
            stream.write_all(&protocol::frame(request.as_bytes())).await?;

            let mut len = [0u8; 4];
            stream.read_exact(&mut len).await?;
            let len = u32::from_be_bytes(len) as usize;
            if len > MAX_REPLY_LEN {
                return Err(invalid(addr, format!("reply length {len} too large")));
            }

            let mut payload = vec![0u8; len];
            stream.read_exact(&mut payload).await?;
            Ok::<_, DeviceError>(protocol::decrypt(&payload))
        };

        timeout(self.timeout, io)
            .await
            .map_err(|_| DeviceError::Timeout {
                addr,
                timeout: self.timeout,
            })?
    }
}

#[async_trait]
impl DeviceQuery for SmartHomeTransport {
    #[instrument(skip(self))]
    async fn sysinfo(&self, addr: IpAddr) -> Result<DeviceInfo, DeviceError> {
        let body = self.exchange(addr, GET_SYSINFO).await?;
        parse_sysinfo(addr, &body)
    }

    #[instrument(skip(self))]
    async fn realtime_power(&self, addr: IpAddr) -> Result<f64, DeviceError> {
        let body = self.exchange(addr, GET_REALTIME).await?;
        parse_realtime(addr, &body)
    }
}

#[async_trait]
impl DeviceScanner for SmartHomeTransport {
    #[instrument(skip(self))]
    async fn discover(&self, wait: Duration) -> Result<BTreeMap<IpAddr, DeviceInfo>, DeviceError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.set_broadcast(true)?;
        socket
            .send_to(
                &protocol::encrypt(GET_SYSINFO.as_bytes()),
                (self.broadcast, self.port),
            )
            .await?;

        let deadline = Instant::now() + wait;
        let mut devices = BTreeMap::new();
        let mut buf = vec![0u8; MAX_REPLY_LEN];

        while let Ok(received) = timeout_at(deadline, socket.recv_from(&mut buf)).await {
            let (len, from) = received?;
            let body = protocol::decrypt(&buf[..len]);
            match parse_sysinfo(from.ip(), &body) {
                Ok(info) => {
                    debug!(addr = %from.ip(), alias = %info.alias, model = %info.model, "plug answered");
                    devices.insert(from.ip(), info);
                }
                Err(e) => debug!(addr = %from.ip(), error = %e, "ignoring reply"),
            }
        }

        Ok(devices)
    }
}

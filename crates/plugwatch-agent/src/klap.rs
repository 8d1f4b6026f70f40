//! Authenticated local protocol used by newer plug firmware
//!
//! Two HTTP handshakes agree on a session from a pair of random seeds and a
//! hash of the account credentials. Every request is then AES-128-CBC
//! encrypted under a per-request sequence number and prefixed with a SHA-256
//! signature. Request bodies use the `{"method": ...}` JSON dialect.

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::config::Credentials;
use crate::device::{DeviceInfo, DeviceQuery, invalid};
use crate::error::DeviceError;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// HTTP port the authenticated protocol listens on
pub const PORT: u16 = 80;

const SEED_LEN: usize = 16;
const SIGNATURE_LEN: usize = 32;

fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(*part);
    }
    hasher.finalize().into()
}

/// Hash of the account credentials, as the device stores it
pub fn auth_hash(credentials: &Credentials) -> [u8; 32] {
    let username: [u8; 20] = Sha1::digest(credentials.username.as_bytes()).into();
    let password: [u8; 20] = Sha1::digest(credentials.password.as_bytes()).into();
    sha256(&[&username, &password])
}

/// Session keys agreed during the handshake
#[derive(Clone)]
pub struct KlapCipher {
    key: [u8; 16],
    iv: [u8; 12],
    signature: [u8; 28],
    seq: i32,
}

impl KlapCipher {
    pub fn new(local_seed: &[u8], remote_seed: &[u8], auth_hash: &[u8]) -> Self {
        let derive = |label: &[u8]| sha256(&[label, local_seed, remote_seed, auth_hash]);
        let key = derive(b"lsk");
        let iv = derive(b"iv");
        let signature = derive(b"ldk");

        let mut cipher = Self {
            key: [0; 16],
            iv: [0; 12],
            signature: [0; 28],
            seq: i32::from_be_bytes([iv[28], iv[29], iv[30], iv[31]]),
        };
        cipher.key.copy_from_slice(&key[..16]);
        cipher.iv.copy_from_slice(&iv[..12]);
        cipher.signature.copy_from_slice(&signature[..28]);
        cipher
    }

    fn block_iv(&self, seq: i32) -> [u8; 16] {
        let mut iv = [0u8; 16];
        iv[..12].copy_from_slice(&self.iv);
        iv[12..].copy_from_slice(&seq.to_be_bytes());
        iv
    }

    /// Seal the next request, returning its sequence number and payload
    pub fn encrypt(&mut self, plaintext: &[u8]) -> (i32, Vec<u8>) {
        self.seq = self.seq.wrapping_add(1);
        (self.seq, self.seal(self.seq, plaintext))
    }

    /// Signature followed by the ciphertext of `plaintext` under `seq`
    pub fn seal(&self, seq: i32, plaintext: &[u8]) -> Vec<u8> {
        let ciphertext = Aes128CbcEnc::new(&self.key.into(), &self.block_iv(seq).into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
        let signature = sha256(&[&self.signature, &seq.to_be_bytes(), &ciphertext]);

        let mut payload = Vec::with_capacity(SIGNATURE_LEN + ciphertext.len());
        payload.extend_from_slice(&signature);
        payload.extend_from_slice(&ciphertext);
        payload
    }

    /// Decrypt a payload sealed under `seq`
    pub fn open(&self, seq: i32, payload: &[u8]) -> Option<Vec<u8>> {
        let ciphertext = payload.get(SIGNATURE_LEN..)?;
        Aes128CbcDec::new(&self.key.into(), &self.block_iv(seq).into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .ok()
    }
}

#[derive(Deserialize)]
struct Reply {
    error_code: i64,
    #[serde(default)]
    result: Value,
}

#[derive(Deserialize)]
struct SmartDeviceInfo {
    #[serde(default)]
    nickname: String,
    #[serde(default)]
    model: String,
}

#[derive(Deserialize)]
struct Components {
    component_list: Vec<Component>,
}

#[derive(Deserialize)]
struct Component {
    id: String,
}

#[derive(Deserialize)]
struct EnergyUsage {
    current_power: Option<f64>,
}

/// Build a [`DeviceInfo`] from `get_device_info` and `component_nego` results
///
/// Nicknames arrive base64 encoded; anything that does not decode is kept as is.
pub fn parse_device_info(
    addr: IpAddr,
    info: Value,
    components: Value,
) -> Result<DeviceInfo, DeviceError> {
    let info: SmartDeviceInfo = serde_json::from_value(info).map_err(|e| invalid(addr, e))?;
    let components: Components =
        serde_json::from_value(components).map_err(|e| invalid(addr, e))?;

    let alias = STANDARD
        .decode(&info.nickname)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or(info.nickname);

    Ok(DeviceInfo {
        alias,
        model: info.model,
        has_emeter: components
            .component_list
            .iter()
            .any(|c| c.id == "energy_monitoring"),
    })
}

/// Watts from a `get_energy_usage` result, which reports milliwatts
pub fn parse_energy_usage(addr: IpAddr, usage: Value) -> Result<f64, DeviceError> {
    let usage: EnergyUsage = serde_json::from_value(usage).map_err(|e| invalid(addr, e))?;
    usage
        .current_power
        .map(|milliwatts| milliwatts / 1000.0)
        .ok_or_else(|| invalid(addr, "reply carries no current_power field"))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() * 1000 + u64::from(d.subsec_millis()))
        .unwrap_or_default()
}

fn http_error(addr: IpAddr, timeout: Duration, e: reqwest::Error) -> DeviceError {
    if e.is_timeout() {
        DeviceError::Timeout { addr, timeout }
    } else {
        DeviceError::Http(e)
    }
}

/// Transport for plugs that require an authenticated session
#[derive(Debug, Clone)]
pub struct KlapTransport {
    credentials: Credentials,
    port: u16,
    timeout: Duration,
}

impl KlapTransport {
    pub fn new(credentials: Credentials, timeout: Duration) -> Self {
        Self {
            credentials,
            port: PORT,
            timeout,
        }
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    async fn read_body(&self, addr: IpAddr, response: Response) -> Result<Vec<u8>, DeviceError> {
        let status = response.status();
        if !status.is_success() {
            return Err(invalid(addr, format!("HTTP status {status}")));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| http_error(addr, self.timeout, e))?;
        Ok(body.to_vec())
    }

    /// Run both handshakes and return an open session
    #[instrument(skip(self))]
    async fn handshake(&self, addr: IpAddr) -> Result<KlapSession, DeviceError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(self.timeout)
            .build()?;
        let base = format!("http://{}/app", SocketAddr::new(addr, self.port));
        let auth = auth_hash(&self.credentials);
        let local_seed: [u8; SEED_LEN] = rand::random();

        let response = client
            .post(format!("{base}/handshake1"))
            .body(local_seed.to_vec())
            .send()
            .await
            .map_err(|e| http_error(addr, self.timeout, e))?;
        let body = self.read_body(addr, response).await?;
        if body.len() != SEED_LEN + 32 {
            return Err(invalid(
                addr,
                format!("handshake reply of {} bytes", body.len()),
            ));
        }

        let (remote_seed, server_hash) = body.split_at(SEED_LEN);
        if server_hash != sha256(&[&local_seed, remote_seed, &auth]).as_slice() {
            return Err(DeviceError::Authentication { addr });
        }

        let response = client
            .post(format!("{base}/handshake2"))
            .body(sha256(&[remote_seed, &local_seed, &auth]).to_vec())
            .send()
            .await
            .map_err(|e| http_error(addr, self.timeout, e))?;
        if !response.status().is_success() {
            return Err(DeviceError::Authentication { addr });
        }

        debug!(addr = %addr, "session established");
        Ok(KlapSession {
            client,
            base,
            addr,
            timeout: self.timeout,
            cipher: KlapCipher::new(&local_seed, remote_seed, &auth),
        })
    }
}

struct KlapSession {
    client: Client,
    base: String,
    addr: IpAddr,
    timeout: Duration,
    cipher: KlapCipher,
}

impl KlapSession {
    /// Send one request and return its `result`
    async fn call(&mut self, method: &str) -> Result<Value, DeviceError> {
        let addr = self.addr;
        let request = json!({ "method": method, "request_time_milis": now_millis() });
        let (seq, payload) = self.cipher.encrypt(request.to_string().as_bytes());

        let response = self
            .client
            .post(format!("{}/request?seq={seq}", self.base))
            .body(payload)
            .send()
            .await
            .map_err(|e| http_error(addr, self.timeout, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(invalid(addr, format!("{method}: HTTP status {status}")));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| http_error(addr, self.timeout, e))?;

        let plaintext = self
            .cipher
            .open(seq, &body)
            .ok_or_else(|| invalid(addr, format!("{method}: reply did not decrypt")))?;
        let reply: Reply = serde_json::from_slice(&plaintext).map_err(|e| invalid(addr, e))?;
        if reply.error_code != 0 {
            return Err(DeviceError::Device {
                addr,
                code: reply.error_code,
                message: format!("{method} failed"),
            });
        }
        Ok(reply.result)
    }
}

#[async_trait]
impl DeviceQuery for KlapTransport {
    #[instrument(skip(self))]
    async fn sysinfo(&self, addr: IpAddr) -> Result<DeviceInfo, DeviceError> {
        let mut session = self.handshake(addr).await?;
        let info = session.call("get_device_info").await?;
        let components = session.call("component_nego").await?;
        parse_device_info(addr, info, components)
    }

    #[instrument(skip(self))]
    async fn realtime_power(&self, addr: IpAddr) -> Result<f64, DeviceError> {
        let mut session = self.handshake(addr).await?;
        let usage = session.call("get_energy_usage").await?;
        parse_energy_usage(addr, usage)
    }
}

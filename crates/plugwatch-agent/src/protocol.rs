//! TP-Link smart-home local protocol
//!
//! JSON payloads obfuscated with an XOR autokey cipher. TCP messages carry a
//! 4-byte big-endian length prefix; UDP datagrams do not.

/// Port the plugs listen on, for both UDP and TCP
pub const PORT: u16 = 9999;

const INITIAL_KEY: u8 = 171;

/// Request for device information
pub const GET_SYSINFO: &str = r#"{"system":{"get_sysinfo":{}}}"#;

/// Request for the current energy meter reading
pub const GET_REALTIME: &str = r#"{"emeter":{"get_realtime":{}}}"#;

pub fn encrypt(plain: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    plain
        .iter()
        .map(|b| {
            key ^= b;
            key
        })
        .collect()
}

pub fn decrypt(cipher: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    cipher
        .iter()
        .map(|&c| {
            let plain = key ^ c;
            key = c;
            plain
        })
        .collect()
}

/// Encrypt and length-prefix a TCP message
pub fn frame(plain: &[u8]) -> Vec<u8> {
    let payload = encrypt(plain);
    let len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
    let mut out = Vec::with_capacity(4 + payload.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&payload);
    out
}

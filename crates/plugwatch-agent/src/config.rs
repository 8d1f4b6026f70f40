//! Plug account settings

use std::fmt;

use crate::error::DeviceError;

/// TP-Link cloud account used by plugs that require an authenticated session
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read `KASA_USERNAME` and `KASA_PASSWORD`
    ///
    /// # Errors
    /// Returns [`DeviceError::Config`] if either is unset or empty.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DeviceError> {
        let username = lookup("KASA_USERNAME").filter(|v| !v.is_empty());
        let password = lookup("KASA_PASSWORD").filter(|v| !v.is_empty());
        match (username, password) {
            (Some(username), Some(password)) => Ok(Self::new(username, password)),
            _ => Err(DeviceError::Config(
                "KASA_USERNAME and KASA_PASSWORD must be set".to_string(),
            )),
        }
    }
}

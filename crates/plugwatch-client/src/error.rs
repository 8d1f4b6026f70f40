//! Error types for the management API client

use plugwatch_api::RpcError;
use thiserror::Error;

/// Errors that can occur when talking to the management API
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Server answered with a non-success HTTP status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Server answered with a JSON-RPC error object
    #[error("{method} failed: {error}")]
    Rpc {
        /// Method that was called
        method: String,
        /// Error returned by the server
        error: RpcError,
    },

    /// Response could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Check if the server answered with something that is not a JSON-RPC reply
    ///
    /// Everything else (refused connections, gateway errors, RPC errors) is
    /// what a server that is still starting up looks like.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        match self {
            ClientError::InvalidResponse(_) | ClientError::Json(_) => true,
            ClientError::Http(e) => e.is_decode(),
            _ => false,
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_classification() {
        assert!(ClientError::InvalidResponse("not json".into()).is_malformed());
        assert!(
            !ClientError::Api {
                status: 502,
                message: "Bad Gateway".into()
            }
            .is_malformed()
        );
        assert!(
            !ClientError::Rpc {
                method: "apiinfo.version".into(),
                error: RpcError {
                    code: -32500,
                    message: "Application error.".into(),
                    data: None,
                },
            }
            .is_malformed()
        );
    }

    #[test]
    fn test_rpc_error_display() {
        let err = ClientError::Rpc {
            method: "host.create".into(),
            error: RpcError {
                code: -32602,
                message: "Invalid params.".into(),
                data: Some("Host with the same name \"plug\" already exists.".into()),
            },
        };
        assert!(err.to_string().starts_with("host.create failed: Invalid params."));
    }
}

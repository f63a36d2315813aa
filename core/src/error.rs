//! Error types for the vault API client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the note does not exist" from "the server returned an unexpected
//! status." A rejected bearer token is the other status callers act on, so it
//! gets `Unauthorized`. All other non-2xx responses land in `HttpError` with
//! the raw status code and body for debugging.
//!
//! `Transport` covers everything that prevented a response from arriving at
//! all (connect, TLS handshake, socket I/O). `InvalidConfig` is raised before
//! any request is sent.

use thiserror::Error;

/// Errors returned by `VaultApi` parse methods, transports and `VaultClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404: the note, directory or command does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server rejected the bearer token (401 or 403).
    #[error("unauthorized (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The server returned a non-success status other than 401/403/404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The client configuration is unusable (bad base URL, unreadable PEM).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound => Some(404),
            ApiError::Unauthorized { status } | ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

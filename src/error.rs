//! Error types for mcp-authkit
//!
//! This module defines all error types used throughout the crate, using
//! `thiserror` for ergonomic error handling. The variants follow the
//! OAuth 2.1 failure taxonomy: discovery, registration, authorization,
//! token lifecycle, and callback correlation each have their own kinds so
//! callers can react to them individually.

use thiserror::Error;

/// Main error type for mcp-authkit operations
///
/// This enum encompasses all possible errors that can occur during
/// authorization server discovery, dynamic client registration, the
/// authorization code flow, token refresh, callback correlation, and
/// bearer-token validation at the resource server.
#[derive(Error, Debug)]
pub enum AuthKitError {
    /// Configuration-related errors (invalid URLs, missing fields)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authorization server metadata could not be fetched (non-2xx or I/O)
    #[error("Metadata fetch failed: {0}")]
    MetadataFetch(String),

    /// Authorization server metadata was fetched but is not a usable
    /// metadata document (missing endpoints, malformed JSON)
    #[error("Metadata parse failed: {0}")]
    MetadataParse(String),

    /// The authorization server does not offer a registration endpoint
    #[error("Dynamic client registration not supported by authorization server")]
    RegistrationUnsupported,

    /// The registration endpoint rejected the registration request
    #[error("Client registration rejected with status {status}: {body}")]
    Registration {
        /// HTTP status returned by the registration endpoint
        status: u16,
        /// Response body returned by the registration endpoint
        body: String,
    },

    /// The `state` returned in the callback does not match the one issued
    /// for this authorization attempt. Fatal to the attempt; never retried.
    #[error("CSRF state mismatch: expected {expected}, received {received}")]
    CsrfMismatch {
        /// The state value issued at authorization start
        expected: String,
        /// The state value delivered in the callback
        received: String,
    },

    /// The authorization server redirected back with an error (user denial,
    /// server policy rejection)
    #[error("Authorization denied: {error}{}", .description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    AuthorizationDenied {
        /// OAuth error code from the callback query string
        error: String,
        /// Optional human-readable `error_description`
        description: Option<String>,
    },

    /// The callback request is missing `code` or `state`
    #[error("Malformed authorization callback: {0}")]
    MalformedCallback(String),

    /// No pending session is associated with the callback `state`. Occurs
    /// when the session was already consumed, expired, or belongs to a
    /// different process.
    #[error("Unknown or expired authorization session for the received state")]
    UnknownSession,

    /// The token endpoint rejected the authorization code exchange
    #[error("Token exchange failed: {error}{}", .description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    TokenExchange {
        /// OAuth error code from the token endpoint response body
        error: String,
        /// Optional `error_description` from the response body
        description: Option<String>,
    },

    /// The token endpoint rejected the refresh request. Previously stored
    /// tokens are left untouched when this is returned.
    #[error("Token refresh failed: {error}{}", .description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    TokenRefresh {
        /// OAuth error code from the token endpoint response body
        error: String,
        /// Optional `error_description` from the response body
        description: Option<String>,
    },

    /// A refresh was requested but no refresh token is held
    #[error("No refresh token available")]
    NoRefreshToken,

    /// A valid access token was requested but no token has ever been stored
    #[error("Not authenticated: no access token available")]
    NotAuthenticated,

    /// The interactive authorization flow did not complete within the
    /// configured wait window
    #[error("Authorization timed out after {0} seconds")]
    AuthorizationTimeout(u64),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type alias for mcp-authkit operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

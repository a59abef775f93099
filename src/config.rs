//! Configuration management for mcp-authkit
//!
//! This module handles loading, parsing, and validating configuration for
//! both sides of the authorization layer: the OAuth client and the
//! resource server. Values arrive from YAML files, environment variables,
//! or direct construction by the embedding application.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AuthKitError, Result};

/// OAuth client configuration
///
/// Holds everything one [`OAuthClient`](crate::auth::client::OAuthClient)
/// instance needs to run the authorization code flow against a single
/// authorization server. Immutable once the client is constructed.
///
/// # Examples
///
/// ```
/// use mcp_authkit::config::OAuthConfig;
///
/// let yaml = r#"
/// authorization_server: "http://localhost:9000"
/// client_id: "agentic_ai"
/// redirect_uri: "http://localhost:3001/callback"
/// scope: "read write"
/// resource: "http://localhost:3000"
/// "#;
/// let config: OAuthConfig = serde_yaml::from_str(yaml).unwrap();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Base URL of the authorization server (metadata is discovered under
    /// its `/.well-known/oauth-authorization-server` path)
    pub authorization_server: Url,

    /// Pre-configured OAuth client identifier. When `None`, the client must
    /// obtain one via dynamic registration before starting a flow.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Optional client secret for confidential clients. Sent via HTTP Basic
    /// authentication on token requests when present.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Redirect URI registered for this client; the callback receiver must
    /// be listening at this exact address
    pub redirect_uri: Url,

    /// Space-delimited scope string requested during authorization
    #[serde(default)]
    pub scope: String,

    /// Canonical URI of the protected resource this client wants tokens
    /// for; sent as the `resource` indicator on every authorization and
    /// token request (RFC 8707)
    pub resource: Url,

    /// Human-readable client name sent during dynamic registration
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Optional client homepage URI sent during dynamic registration
    #[serde(default)]
    pub client_uri: Option<String>,
}

fn default_client_name() -> String {
    "mcp-authkit".to_string()
}

impl OAuthConfig {
    /// Loads an `OAuthConfig` from a YAML file and applies environment
    /// variable overrides.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::Config`] if the file cannot be read or
    /// parsed, or if the resulting configuration fails [`validate`].
    ///
    /// [`validate`]: Self::validate
    pub fn load(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AuthKitError::Config(format!("Failed to read config file: {}", e)))?;
        let mut config: Self = serde_yaml::from_str(&contents)
            .map_err(|e| AuthKitError::Config(format!("Failed to parse config: {}", e)))?;
        config.apply_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// Applies `MCP_AUTHKIT_*` environment variable overrides.
    fn apply_env_vars(&mut self) {
        if let Ok(client_id) = std::env::var("MCP_AUTHKIT_CLIENT_ID") {
            self.client_id = Some(client_id);
        }
        if let Ok(client_secret) = std::env::var("MCP_AUTHKIT_CLIENT_SECRET") {
            self.client_secret = Some(client_secret);
        }
        if let Ok(scope) = std::env::var("MCP_AUTHKIT_SCOPE") {
            self.scope = scope;
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::Config`] when the redirect URI has no host,
    /// or when a client secret is configured without a client id.
    pub fn validate(&self) -> Result<()> {
        if self.redirect_uri.host_str().is_none() {
            return Err(
                AuthKitError::Config("redirect_uri must include a host".to_string()).into(),
            );
        }
        if self.client_secret.is_some() && self.client_id.is_none() {
            return Err(AuthKitError::Config(
                "client_secret configured without client_id".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

/// Resource server configuration
///
/// Describes the protected resource this process serves: its canonical URI
/// (the audience tokens must be bound to), the authorization servers it
/// trusts, and the scopes it understands. Feeds both the bearer guard and
/// the protected-resource metadata document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceServerConfig {
    /// Canonical URI of this resource server. Token audiences are compared
    /// against this exact value.
    pub resource: Url,

    /// Issuer URIs of the authorization servers trusted by this resource
    pub authorization_servers: Vec<Url>,

    /// Scopes this resource supports, advertised in the metadata document
    #[serde(default)]
    pub scopes_supported: Vec<String>,

    /// Token-endpoint auth methods advertised in the metadata document
    #[serde(default = "default_token_auth_methods")]
    pub token_endpoint_auth_methods_supported: Vec<String>,
}

fn default_token_auth_methods() -> Vec<String> {
    vec!["none".to_string(), "client_secret_basic".to_string()]
}

impl ResourceServerConfig {
    /// Loads a `ResourceServerConfig` from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::Config`] if the file cannot be read or
    /// parsed, or if validation fails.
    pub fn load(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AuthKitError::Config(format!("Failed to read config file: {}", e)))?;
        let config: Self = serde_yaml::from_str(&contents)
            .map_err(|e| AuthKitError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::Config`] when no trusted authorization
    /// server is configured.
    pub fn validate(&self) -> Result<()> {
        if self.authorization_servers.is_empty() {
            return Err(AuthKitError::Config(
                "at least one trusted authorization server is required".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

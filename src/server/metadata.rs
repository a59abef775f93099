//! Protected resource metadata document
//!
//! Static document describing this resource server to clients: its
//! canonical URI, the authorization servers it trusts, and the scopes it
//! understands. Served read-only at the well-known path; constructed once
//! from configuration.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ResourceServerConfig;
use crate::server::bearer::ResourceServerContext;

/// Path the metadata document is served from.
pub const WELL_KNOWN_RESOURCE_PATH: &str = "/.well-known/oauth-protected-resource";

/// Metadata document describing a protected resource.
///
/// # Examples
///
/// ```
/// use mcp_authkit::server::metadata::ProtectedResourceMetadata;
///
/// let json = r#"{
///     "resource": "http://localhost:3000/",
///     "authorization_servers": ["http://localhost:9000/"],
///     "scopes_supported": ["read", "write"],
///     "token_endpoint_auth_methods_supported": ["none"]
/// }"#;
/// let meta: ProtectedResourceMetadata = serde_json::from_str(json).unwrap();
/// assert_eq!(meta.authorization_servers.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    /// Canonical URI of this resource server.
    pub resource: String,

    /// Issuer URIs of the authorization servers that protect this
    /// resource.
    pub authorization_servers: Vec<String>,

    /// Scopes this resource supports.
    #[serde(default)]
    pub scopes_supported: Vec<String>,

    /// Token-endpoint auth methods the trusted authorization servers
    /// offer.
    #[serde(default)]
    pub token_endpoint_auth_methods_supported: Vec<String>,
}

impl ProtectedResourceMetadata {
    /// Builds the document from resource server configuration.
    pub fn from_config(config: &ResourceServerConfig) -> Self {
        Self {
            resource: config.resource.to_string(),
            authorization_servers: config
                .authorization_servers
                .iter()
                .map(|url| url.to_string())
                .collect(),
            scopes_supported: config.scopes_supported.clone(),
            token_endpoint_auth_methods_supported: config
                .token_endpoint_auth_methods_supported
                .clone(),
        }
    }
}

/// Axum handler serving the metadata document.
pub async fn metadata_handler(
    State(ctx): State<Arc<ResourceServerContext>>,
) -> Json<ProtectedResourceMetadata> {
    Json(ctx.metadata().clone())
}

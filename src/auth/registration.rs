//! Dynamic client registration (RFC 7591)
//!
//! Registers an OAuth client with an authorization server at runtime when
//! no client identifier was pre-configured. Registration is optional: a
//! server that does not advertise a `registration_endpoint` causes
//! [`AuthKitError::RegistrationUnsupported`], and the caller falls back to
//! whatever credentials it already has.
//!
//! # References
//!
//! - RFC 7591 <https://www.rfc-editor.org/rfc/rfc7591>

use serde::Deserialize;

use crate::auth::discovery::AuthorizationServerMetadata;
use crate::config::OAuthConfig;
use crate::error::{AuthKitError, Result};

/// Credentials returned by a successful registration.
///
/// The OAuth client decides whether to adopt these or keep its
/// pre-configured identifiers.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredClient {
    /// Client identifier issued by the authorization server.
    pub client_id: String,

    /// Client secret, present only when the server registered this client
    /// as confidential.
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Registers a client with the authorization server's registration
/// endpoint.
///
/// The request body carries the client name, optional client URI, the
/// exact redirect URI from the configuration, `grant_types`
/// `["authorization_code"]`, `response_types` `["code"]`, and the
/// requested scope.
///
/// # Errors
///
/// - [`AuthKitError::RegistrationUnsupported`] when the metadata has no
///   `registration_endpoint`.
/// - [`AuthKitError::Registration`] with the upstream status and body when
///   the endpoint rejects the request.
pub async fn register_client(
    http: &reqwest::Client,
    metadata: &AuthorizationServerMetadata,
    config: &OAuthConfig,
) -> Result<RegisteredClient> {
    let endpoint = metadata
        .registration_endpoint
        .as_deref()
        .ok_or(AuthKitError::RegistrationUnsupported)?;

    let mut body = serde_json::json!({
        "client_name": config.client_name,
        "redirect_uris": [config.redirect_uri.as_str()],
        "grant_types": ["authorization_code"],
        "response_types": ["code"],
        "scope": config.scope,
    });
    if let Some(ref client_uri) = config.client_uri {
        body["client_uri"] = serde_json::Value::String(client_uri.clone());
    }

    tracing::debug!(endpoint, client_name = %config.client_name, "registering OAuth client");

    let resp = http
        .post(endpoint)
        .json(&body)
        .send()
        .await
        .map_err(AuthKitError::Http)?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(AuthKitError::Registration {
            status: status.as_u16(),
            body,
        }
        .into());
    }

    let registered: RegisteredClient = resp.json().await.map_err(|e| {
        AuthKitError::Registration {
            status: status.as_u16(),
            body: format!("failed to parse registration response: {e}"),
        }
    })?;

    tracing::debug!(client_id = %registered.client_id, "client registered");
    Ok(registered)
}

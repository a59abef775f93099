//! Authorization server metadata discovery (RFC 8414)
//!
//! Resolves an authorization server's OAuth endpoints from its well-known
//! metadata document before any flow step that needs them. The document is
//! fetched lazily and never persisted across process restarts; a short
//! in-process cache avoids refetching on every flow step, but callers must
//! tolerate a fresh fetch per call.
//!
//! # References
//!
//! - RFC 8414 <https://www.rfc-editor.org/rfc/rfc8414>

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AuthKitError, Result};

/// Default time-to-live for the in-process metadata cache.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Metadata document describing an OAuth 2.1 authorization server.
///
/// Retrieved from `{base}/.well-known/oauth-authorization-server` by
/// [`MetadataResolver::fetch`].
///
/// # Examples
///
/// ```
/// use mcp_authkit::auth::discovery::AuthorizationServerMetadata;
///
/// let json = r#"{
///     "issuer": "https://auth.example.com",
///     "authorization_endpoint": "https://auth.example.com/authorize",
///     "token_endpoint": "https://auth.example.com/token",
///     "response_types_supported": ["code"]
/// }"#;
///
/// let meta: AuthorizationServerMetadata = serde_json::from_str(json).unwrap();
/// assert_eq!(meta.issuer, "https://auth.example.com");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuthorizationServerMetadata {
    /// The issuer identifier URI for this authorization server.
    pub issuer: String,

    /// The URL of the authorization endpoint (RFC 6749 section 3.1).
    pub authorization_endpoint: String,

    /// The URL of the token endpoint (RFC 6749 section 3.2).
    pub token_endpoint: String,

    /// Optional URL of the Dynamic Client Registration endpoint (RFC 7591).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,

    /// URL of the server's JSON Web Key Set document, when published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,

    /// List of OAuth scopes the server supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,

    /// List of `response_type` values the server supports (e.g. `["code"]`).
    #[serde(default)]
    pub response_types_supported: Vec<String>,

    /// List of `grant_type` values the server supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_types_supported: Option<Vec<String>>,

    /// Token endpoint authentication methods the server supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_methods_supported: Option<Vec<String>>,

    /// PKCE challenge methods the server supports (e.g. `["S256"]`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_methods_supported: Option<Vec<String>>,

    /// Additional server metadata fields not explicitly modelled above.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Builds the RFC 8414 well-known metadata URL for an authorization server
/// base URL.
///
/// Query and fragment components of the base are discarded.
pub fn well_known_url(base: &Url) -> Url {
    let mut url = base.clone();
    url.set_path("/.well-known/oauth-authorization-server");
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// Fetches and caches an authorization server's metadata document.
///
/// One resolver is owned by each [`OAuthClient`](crate::auth::client::OAuthClient)
/// instance. Fetches go through the shared HTTP client (which carries the
/// crate-wide request timeout); results are cached for
/// [`DEFAULT_CACHE_TTL`] unless caching is disabled.
///
/// # Examples
///
/// ```no_run
/// use mcp_authkit::auth::discovery::MetadataResolver;
///
/// # async fn example() -> mcp_authkit::error::Result<()> {
/// let http = reqwest::Client::new();
/// let base = url::Url::parse("https://auth.example.com")?;
/// let resolver = MetadataResolver::new(http, base);
/// let meta = resolver.fetch().await?;
/// println!("token endpoint: {}", meta.token_endpoint);
/// # Ok(())
/// # }
/// ```
pub struct MetadataResolver {
    http: reqwest::Client,
    base: Url,
    cache_ttl: Option<Duration>,
    cached: tokio::sync::Mutex<Option<(Instant, AuthorizationServerMetadata)>>,
}

impl MetadataResolver {
    /// Creates a resolver for the given authorization server base URL with
    /// the default cache TTL.
    pub fn new(http: reqwest::Client, base: Url) -> Self {
        Self {
            http,
            base,
            cache_ttl: Some(DEFAULT_CACHE_TTL),
            cached: tokio::sync::Mutex::new(None),
        }
    }

    /// Creates a resolver that never caches; every [`fetch`](Self::fetch)
    /// issues a network request.
    pub fn without_cache(http: reqwest::Client, base: Url) -> Self {
        Self {
            http,
            base,
            cache_ttl: None,
            cached: tokio::sync::Mutex::new(None),
        }
    }

    /// Returns the authorization server base URL this resolver targets.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Fetches the authorization server metadata document.
    ///
    /// Issues a GET to `{base}/.well-known/oauth-authorization-server` and
    /// parses the body. A cached copy younger than the configured TTL is
    /// returned without a network round-trip.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::MetadataFetch`] when the request fails or
    /// the server responds with a non-2xx status, and
    /// [`AuthKitError::MetadataParse`] when the body is not a well-formed
    /// metadata document (missing `authorization_endpoint` or
    /// `token_endpoint`, or not JSON at all).
    pub async fn fetch(&self) -> Result<AuthorizationServerMetadata> {
        if self.cache_ttl.is_some() {
            let cached = self.cached.lock().await;
            if let Some((fetched_at, ref meta)) = *cached {
                if fetched_at.elapsed() < self.cache_ttl.unwrap_or_default() {
                    return Ok(meta.clone());
                }
            }
        }

        let url = well_known_url(&self.base);
        tracing::debug!(%url, "fetching authorization server metadata");

        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AuthKitError::MetadataFetch(format!("request to {url} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AuthKitError::MetadataFetch(format!(
                "{url} returned status {}",
                resp.status()
            ))
            .into());
        }

        let body = resp
            .text()
            .await
            .map_err(|e| AuthKitError::MetadataFetch(format!("failed to read body: {e}")))?;

        let meta: AuthorizationServerMetadata = serde_json::from_str(&body)
            .map_err(|e| AuthKitError::MetadataParse(format!("invalid metadata document: {e}")))?;

        if meta.authorization_endpoint.is_empty() || meta.token_endpoint.is_empty() {
            return Err(AuthKitError::MetadataParse(
                "metadata document has empty authorization_endpoint or token_endpoint".to_string(),
            )
            .into());
        }

        if self.cache_ttl.is_some() {
            let mut cached = self.cached.lock().await;
            *cached = Some((Instant::now(), meta.clone()));
        }

        Ok(meta)
    }
}

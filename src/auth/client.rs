//! OAuth 2.1 client and token lifecycle
//!
//! This module drives one authorization attempt end to end and owns the
//! resulting token state. The attempt walks a fixed sequence: resolve
//! metadata, settle on a client identifier (pre-configured or dynamically
//! registered), generate PKCE and state, hand out the authorization URL,
//! then exchange the callback's code for tokens. Failures at any step
//! terminate the attempt; the token state survives independently and is
//! mutated only by a successful exchange, a successful refresh, or an
//! explicit [`OAuthClient::clear_tokens`].
//!
//! Token mutations are serialized through a per-instance async mutex, so
//! concurrent refresh attempts cannot lose a rotated refresh token.
//!
//! # References
//!
//! - OAuth 2.1 draft <https://datatracker.ietf.org/doc/draft-ietf-oauth-v2-1/>
//! - RFC 8707 Resource Indicators <https://www.rfc-editor.org/rfc/rfc8707>

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

use crate::auth::discovery::MetadataResolver;
use crate::auth::pkce::{self, PkceChallenge};
use crate::auth::registration::{self, RegisteredClient};
use crate::auth::token_store::TokenSet;
use crate::config::OAuthConfig;
use crate::error::{AuthKitError, Result};

/// Seconds before the recorded expiry at which an access token is treated
/// as stale and refreshed before use.
pub const REFRESH_SKEW_SECONDS: i64 = 30;

/// Timeout applied to every outbound request made by a client built with
/// [`OAuthClient::new`].
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a caller needs to hold on to after starting an authorization
/// attempt: the URL to open in a browser, and the state/verifier pair that
/// must be correlated with the redirect when it arrives.
///
/// In interactive flows that correlation job is delegated to the
/// [`SessionCorrelator`](crate::auth::session::SessionCorrelator).
#[derive(Debug, Clone)]
pub struct StartedAuthorization {
    /// Fully constructed authorization endpoint URL.
    pub auth_url: String,

    /// CSRF state bound to this attempt.
    pub state: String,

    /// PKCE code verifier for this attempt; secret until token exchange.
    pub code_verifier: String,
}

/// Raw JSON response from an OAuth token endpoint.
///
/// Returned verbatim to callers of
/// [`OAuthClient::exchange_code_for_tokens`] and
/// [`OAuthClient::refresh_access_token`] after the client has updated its
/// own token state from it.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The issued access token.
    pub access_token: String,

    /// Token type, typically `"Bearer"`.
    #[serde(default)]
    pub token_type: Option<String>,

    /// Lifetime of the access token in seconds, when the server reports one.
    #[serde(default)]
    pub expires_in: Option<u64>,

    /// Refresh token, when issued.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Space-separated granted scopes, when reported.
    #[serde(default)]
    pub scope: Option<String>,
}

/// OAuth error object returned by token endpoints on non-2xx responses.
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Token state owned by one client instance.
#[derive(Debug, Default)]
struct TokenState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    /// True when the access token should be refreshed before use.
    fn needs_refresh(&self) -> bool {
        match self.expires_at {
            None => false,
            Some(expires_at) => {
                Utc::now() > expires_at - chrono::Duration::seconds(REFRESH_SKEW_SECONDS)
            }
        }
    }
}

/// OAuth 2.1 client for one authorization server / resource pair.
///
/// An `OAuthClient` is constructed from an immutable [`OAuthConfig`] and
/// owns its token state exclusively; tokens are never shared across
/// instances. The instance is safe to share behind an `Arc`: all interior
/// state is guarded by async mutexes.
///
/// # Examples
///
/// ```no_run
/// use mcp_authkit::auth::client::OAuthClient;
/// use mcp_authkit::config::OAuthConfig;
///
/// # async fn example() -> mcp_authkit::error::Result<()> {
/// let config: OAuthConfig = serde_yaml::from_str(r#"
/// authorization_server: "http://localhost:9000"
/// client_id: "agentic_ai"
/// redirect_uri: "http://localhost:3001/callback"
/// scope: "read write"
/// resource: "http://localhost:3000"
/// "#)?;
///
/// let client = OAuthClient::new(config)?;
/// let started = client.start_authorization().await?;
/// println!("open {} in a browser", started.auth_url);
/// # Ok(())
/// # }
/// ```
pub struct OAuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
    resolver: MetadataResolver,

    /// Credentials adopted from dynamic registration, when performed.
    registered: tokio::sync::Mutex<Option<RegisteredClient>>,

    /// Token state; the mutex serializes exchange/refresh/clear.
    tokens: tokio::sync::Mutex<TokenState>,
}

impl OAuthClient {
    /// Creates a client with a default HTTP client (30 s request timeout).
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying HTTP client cannot be built.
    pub fn new(config: OAuthConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(AuthKitError::Http)?;
        Ok(Self::with_http_client(config, http))
    }

    /// Creates a client that issues requests through the supplied
    /// `reqwest::Client`. The caller is responsible for configuring a
    /// request timeout on it.
    pub fn with_http_client(config: OAuthConfig, http: reqwest::Client) -> Self {
        let resolver = MetadataResolver::new(http.clone(), config.authorization_server.clone());
        Self {
            config,
            http,
            resolver,
            registered: tokio::sync::Mutex::new(None),
            tokens: tokio::sync::Mutex::new(TokenState::default()),
        }
    }

    /// Returns the configuration this client was built from.
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Performs dynamic client registration and adopts the returned
    /// credentials for subsequent requests.
    ///
    /// Pre-configured credentials always take priority over adopted ones;
    /// registering is useful only when the configuration has no
    /// `client_id`. Registration failure leaves any previously adopted
    /// credentials untouched, so callers can treat it as non-fatal and
    /// fall back (see the error taxonomy in [`crate::error`]).
    ///
    /// # Errors
    ///
    /// Propagates [`AuthKitError::RegistrationUnsupported`] and
    /// [`AuthKitError::Registration`] from the registrar, and metadata
    /// errors from discovery.
    pub async fn register(&self) -> Result<RegisteredClient> {
        let metadata = self.resolver.fetch().await?;
        let client = registration::register_client(&self.http, &metadata, &self.config).await?;
        let mut registered = self.registered.lock().await;
        *registered = Some(client.clone());
        Ok(client)
    }

    /// Resolves the client id and secret to use for requests.
    ///
    /// Priority: pre-configured credentials, then credentials adopted from
    /// dynamic registration.
    async fn effective_credentials(&self) -> Result<(String, Option<String>)> {
        if let Some(ref client_id) = self.config.client_id {
            return Ok((client_id.clone(), self.config.client_secret.clone()));
        }
        let registered = self.registered.lock().await;
        if let Some(ref client) = *registered {
            return Ok((client.client_id.clone(), client.client_secret.clone()));
        }
        Err(AuthKitError::Config(
            "no client_id configured; set one or call register() first".to_string(),
        )
        .into())
    }

    /// Starts a new authorization attempt.
    ///
    /// Resolves metadata, verifies PKCE S256 support, generates a fresh
    /// PKCE pair and state, and constructs the authorization URL with the
    /// `resource` indicator bound to the configured canonical resource URI.
    ///
    /// The returned [`StartedAuthorization`] is the caller's to correlate
    /// until the redirect arrives.
    ///
    /// # Errors
    ///
    /// Returns metadata errors from discovery, a configuration error when
    /// no client id is available, or a parse error when the advertised
    /// authorization endpoint is not a valid URL.
    pub async fn start_authorization(&self) -> Result<StartedAuthorization> {
        let metadata = self.resolver.fetch().await?;
        pkce::verify_s256_support(&metadata)?;

        let (client_id, _) = self.effective_credentials().await?;
        let challenge = pkce::generate()?;
        let state = pkce::generate_state()?;

        let auth_url =
            self.build_authorization_url(&metadata.authorization_endpoint, &client_id, &challenge, &state)?;

        tracing::debug!(%state, "authorization attempt started");

        Ok(StartedAuthorization {
            auth_url,
            state,
            code_verifier: challenge.verifier,
        })
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// The CSRF check runs first, before any network traffic: when
    /// `received_state` differs from `expected_state` the attempt fails
    /// with [`AuthKitError::CsrfMismatch`] and nothing is sent to the
    /// token endpoint.
    ///
    /// On success the client stores the access token, the refresh token
    /// (when issued), and an absolute expiry computed from `expires_in`;
    /// a response without `expires_in` leaves the token non-expiring.
    ///
    /// # Errors
    ///
    /// [`AuthKitError::CsrfMismatch`], metadata errors, or
    /// [`AuthKitError::TokenExchange`] carrying the upstream OAuth error.
    pub async fn exchange_code_for_tokens(
        &self,
        code: &str,
        code_verifier: &str,
        received_state: &str,
        expected_state: &str,
    ) -> Result<TokenResponse> {
        if received_state != expected_state {
            tracing::warn!(
                expected = %expected_state,
                received = %received_state,
                "CSRF state mismatch in authorization callback"
            );
            return Err(AuthKitError::CsrfMismatch {
                expected: expected_state.to_string(),
                received: received_state.to_string(),
            }
            .into());
        }

        let metadata = self.resolver.fetch().await?;
        let (client_id, client_secret) = self.effective_credentials().await?;

        let redirect_uri = self.config.redirect_uri.to_string();
        let resource = self.config.resource.to_string();
        let mut params: HashMap<&str, &str> = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("client_id", &client_id);
        params.insert("code", code);
        params.insert("redirect_uri", &redirect_uri);
        params.insert("code_verifier", code_verifier);
        params.insert("resource", &resource);

        let mut req = self.http.post(&metadata.token_endpoint).form(&params);
        if let Some(ref secret) = client_secret {
            req = req.basic_auth(&client_id, Some(secret));
        }

        let resp = req.send().await.map_err(AuthKitError::Http)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let (error, description) = parse_oauth_error(status.as_u16(), &body);
            return Err(AuthKitError::TokenExchange { error, description }.into());
        }

        let token: TokenResponse = resp.json().await.map_err(AuthKitError::Http)?;

        let mut state = self.tokens.lock().await;
        state.access_token = Some(token.access_token.clone());
        state.refresh_token = token.refresh_token.clone();
        state.expires_at = token
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));

        tracing::debug!(expires_in = ?token.expires_in, "authorization code exchanged for tokens");
        Ok(token)
    }

    /// Exchanges the stored refresh token for a new access token.
    ///
    /// On success the access token and expiry are replaced; the refresh
    /// token is replaced only when the server rotated it, otherwise the
    /// prior one is retained. On failure the stored tokens are left
    /// untouched so the caller can decide whether to restart the full
    /// authorization flow.
    ///
    /// # Errors
    ///
    /// [`AuthKitError::NoRefreshToken`] when no refresh token is held,
    /// metadata errors, or [`AuthKitError::TokenRefresh`] on upstream
    /// rejection.
    pub async fn refresh_access_token(&self) -> Result<TokenResponse> {
        let mut state = self.tokens.lock().await;
        self.refresh_locked(&mut state).await
    }

    /// Refresh implementation; the caller holds the token-state mutex,
    /// which is what serializes concurrent refreshes per instance.
    async fn refresh_locked(&self, state: &mut TokenState) -> Result<TokenResponse> {
        let refresh_token = state
            .refresh_token
            .clone()
            .ok_or(AuthKitError::NoRefreshToken)?;

        let metadata = self.resolver.fetch().await?;
        let (client_id, client_secret) = self.effective_credentials().await?;

        let resource = self.config.resource.to_string();
        let mut params: HashMap<&str, &str> = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("client_id", &client_id);
        params.insert("refresh_token", &refresh_token);
        params.insert("resource", &resource);

        let mut req = self.http.post(&metadata.token_endpoint).form(&params);
        if let Some(ref secret) = client_secret {
            req = req.basic_auth(&client_id, Some(secret));
        }

        let resp = req.send().await.map_err(AuthKitError::Http)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let (error, description) = parse_oauth_error(status.as_u16(), &body);
            tracing::warn!(%error, "token refresh rejected; stored tokens retained");
            return Err(AuthKitError::TokenRefresh { error, description }.into());
        }

        let token: TokenResponse = resp.json().await.map_err(AuthKitError::Http)?;

        state.access_token = Some(token.access_token.clone());
        if let Some(ref rotated) = token.refresh_token {
            state.refresh_token = Some(rotated.clone());
        }
        state.expires_at = token
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));

        tracing::debug!(rotated = token.refresh_token.is_some(), "access token refreshed");
        Ok(token)
    }

    /// Returns a currently valid access token, refreshing transparently
    /// when the stored one is within [`REFRESH_SKEW_SECONDS`] of expiry.
    ///
    /// # Errors
    ///
    /// [`AuthKitError::NotAuthenticated`] when no token has ever been
    /// stored, plus any refresh error when a refresh was required and
    /// failed.
    pub async fn get_valid_access_token(&self) -> Result<String> {
        let mut state = self.tokens.lock().await;

        if state.access_token.is_none() {
            return Err(AuthKitError::NotAuthenticated.into());
        }

        if state.needs_refresh() {
            self.refresh_locked(&mut state).await?;
        }

        state
            .access_token
            .clone()
            .ok_or_else(|| AuthKitError::NotAuthenticated.into())
    }

    /// True when an access token is stored and its recorded expiry (if
    /// any) lies in the future. Pure predicate: never triggers a refresh.
    pub async fn has_valid_token(&self) -> bool {
        let state = self.tokens.lock().await;
        state.access_token.is_some()
            && state.expires_at.map_or(true, |expires_at| expires_at > Utc::now())
    }

    /// Clears all token state; used for logout.
    pub async fn clear_tokens(&self) {
        let mut state = self.tokens.lock().await;
        *state = TokenState::default();
        tracing::debug!("token state cleared");
    }

    /// Exports the current token state for persistence (see
    /// [`TokenStore`](crate::auth::token_store::TokenStore)). Returns
    /// `None` when not authenticated.
    pub async fn export_tokens(&self) -> Option<TokenSet> {
        let state = self.tokens.lock().await;
        state.access_token.as_ref().map(|access_token| TokenSet {
            access_token: access_token.clone(),
            refresh_token: state.refresh_token.clone(),
            expires_at: state.expires_at,
            scope: None,
        })
    }

    /// Replaces the token state with a previously exported set, e.g. one
    /// loaded from the keyring on startup.
    pub async fn import_tokens(&self, tokens: TokenSet) {
        let mut state = self.tokens.lock().await;
        state.access_token = Some(tokens.access_token);
        state.refresh_token = tokens.refresh_token;
        state.expires_at = tokens.expires_at;
    }

    /// Builds the authorization URL for this attempt.
    fn build_authorization_url(
        &self,
        authorization_endpoint: &str,
        client_id: &str,
        challenge: &PkceChallenge,
        state: &str,
    ) -> Result<String> {
        let mut url = Url::parse(authorization_endpoint).map_err(|e| {
            AuthKitError::MetadataParse(format!("invalid authorization endpoint URL: {e}"))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("response_type", "code");
            query.append_pair("client_id", client_id);
            query.append_pair("redirect_uri", self.config.redirect_uri.as_str());
            if !self.config.scope.is_empty() {
                query.append_pair("scope", &self.config.scope);
            }
            query.append_pair("state", state);
            query.append_pair("code_challenge", &challenge.challenge);
            query.append_pair("code_challenge_method", &challenge.method);
            query.append_pair("resource", self.config.resource.as_str());
        }

        Ok(url.to_string())
    }
}

/// Interprets a non-2xx token endpoint body as an OAuth error object.
///
/// Bodies that do not parse fall back to a synthetic `http_<status>` error
/// code with the raw body as the description.
fn parse_oauth_error(status: u16, body: &str) -> (String, Option<String>) {
    match serde_json::from_str::<OAuthErrorBody>(body) {
        Ok(parsed) => (parsed.error, parsed.error_description),
        Err(_) => {
            let description = if body.is_empty() {
                None
            } else {
                Some(body.to_string())
            };
            (format!("http_{status}"), description)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config() -> OAuthConfig {
        serde_yaml::from_str(
            r#"
authorization_server: "http://127.0.0.1:1"
client_id: "agentic_ai"
redirect_uri: "http://localhost:3001/callback"
scope: "read write"
resource: "http://localhost:3000"
"#,
        )
        .expect("valid config")
    }

    fn make_client() -> OAuthClient {
        OAuthClient::new(make_config()).expect("client builds")
    }

    // -----------------------------------------------------------------------
    // build_authorization_url
    // -----------------------------------------------------------------------

    #[test]
    fn test_build_authorization_url_contains_required_params() {
        let client = make_client();
        let challenge = PkceChallenge {
            verifier: "test_verifier".to_string(),
            challenge: "test_challenge".to_string(),
            method: "S256".to_string(),
        };

        let url = client
            .build_authorization_url(
                "http://localhost:9000/authorize",
                "agentic_ai",
                &challenge,
                "test_state",
            )
            .unwrap();

        assert!(url.contains("response_type=code"), "missing response_type: {url}");
        assert!(url.contains("client_id=agentic_ai"), "missing client_id: {url}");
        assert!(url.contains("redirect_uri="), "missing redirect_uri: {url}");
        assert!(url.contains("scope=read+write"), "missing scope: {url}");
        assert!(url.contains("state=test_state"), "missing state: {url}");
        assert!(
            url.contains("code_challenge=test_challenge"),
            "missing code_challenge: {url}"
        );
        assert!(
            url.contains("code_challenge_method=S256"),
            "missing method: {url}"
        );
        assert!(
            url.contains("resource=http%3A%2F%2Flocalhost%3A3000%2F"),
            "missing resource indicator: {url}"
        );
    }

    #[test]
    fn test_build_authorization_url_omits_empty_scope() {
        let mut config = make_config();
        config.scope = String::new();
        let client = OAuthClient::new(config).unwrap();
        let challenge = PkceChallenge {
            verifier: "v".to_string(),
            challenge: "c".to_string(),
            method: "S256".to_string(),
        };

        let url = client
            .build_authorization_url("http://localhost:9000/authorize", "id", &challenge, "s")
            .unwrap();
        assert!(!url.contains("scope="), "scope must be omitted when empty: {url}");
    }

    #[test]
    fn test_build_authorization_url_rejects_invalid_endpoint() {
        let client = make_client();
        let challenge = PkceChallenge {
            verifier: "v".to_string(),
            challenge: "c".to_string(),
            method: "S256".to_string(),
        };
        let result =
            client.build_authorization_url("not a url", "id", &challenge, "s");
        assert!(result.is_err());
    }

    // -----------------------------------------------------------------------
    // CSRF enforcement
    // -----------------------------------------------------------------------

    /// The CSRF check must run before any network call: with an unreachable
    /// authorization server, a state mismatch still fails with the CSRF
    /// error rather than a metadata fetch error.
    #[tokio::test]
    async fn test_exchange_rejects_state_mismatch_before_network() {
        let client = make_client();
        let err = client
            .exchange_code_for_tokens("code", "verifier", "S1", "S2")
            .await
            .unwrap_err();

        let msg = err.to_string();
        assert!(
            msg.contains("CSRF state mismatch"),
            "expected CSRF error, got: {msg}"
        );
    }

    // -----------------------------------------------------------------------
    // Token-state predicates
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_has_valid_token_false_when_empty() {
        let client = make_client();
        assert!(!client.has_valid_token().await);
    }

    #[tokio::test]
    async fn test_has_valid_token_true_without_expiry() {
        let client = make_client();
        client.tokens.lock().await.access_token = Some("tok".to_string());
        assert!(client.has_valid_token().await);
    }

    #[tokio::test]
    async fn test_has_valid_token_false_when_expired() {
        let client = make_client();
        {
            let mut state = client.tokens.lock().await;
            state.access_token = Some("tok".to_string());
            state.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        }
        assert!(!client.has_valid_token().await);
    }

    /// Within the 30-second refresh skew the token still counts as valid
    /// for the pure predicate; only `get_valid_access_token` refreshes.
    #[tokio::test]
    async fn test_has_valid_token_true_within_skew() {
        let client = make_client();
        {
            let mut state = client.tokens.lock().await;
            state.access_token = Some("tok".to_string());
            state.expires_at = Some(Utc::now() + chrono::Duration::seconds(10));
        }
        assert!(client.has_valid_token().await);
    }

    #[tokio::test]
    async fn test_get_valid_access_token_fails_when_never_authenticated() {
        let client = make_client();
        let err = client.get_valid_access_token().await.unwrap_err();
        assert!(err.to_string().contains("Not authenticated"));
    }

    #[tokio::test]
    async fn test_get_valid_access_token_returns_fresh_token_without_refresh() {
        let client = make_client();
        {
            let mut state = client.tokens.lock().await;
            state.access_token = Some("tok".to_string());
            state.expires_at = Some(Utc::now() + chrono::Duration::seconds(3600));
        }
        let token = client.get_valid_access_token().await.unwrap();
        assert_eq!(token, "tok");
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_fails() {
        let client = make_client();
        {
            let mut state = client.tokens.lock().await;
            state.access_token = Some("tok".to_string());
        }
        let err = client.refresh_access_token().await.unwrap_err();
        assert!(err.to_string().contains("No refresh token"));
    }

    #[tokio::test]
    async fn test_clear_tokens_resets_state() {
        let client = make_client();
        {
            let mut state = client.tokens.lock().await;
            state.access_token = Some("tok".to_string());
            state.refresh_token = Some("refresh".to_string());
            state.expires_at = Some(Utc::now() + chrono::Duration::seconds(3600));
        }
        client.clear_tokens().await;
        assert!(!client.has_valid_token().await);
        let err = client.get_valid_access_token().await.unwrap_err();
        assert!(err.to_string().contains("Not authenticated"));
    }

    // -----------------------------------------------------------------------
    // export/import
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_export_tokens_none_when_unauthenticated() {
        let client = make_client();
        assert!(client.export_tokens().await.is_none());
    }

    #[tokio::test]
    async fn test_import_then_export_roundtrip() {
        let client = make_client();
        let expires_at = Utc::now() + chrono::Duration::seconds(3600);
        client
            .import_tokens(TokenSet {
                access_token: "access".to_string(),
                refresh_token: Some("refresh".to_string()),
                expires_at: Some(expires_at),
                scope: None,
            })
            .await;

        assert!(client.has_valid_token().await);
        let exported = client.export_tokens().await.expect("tokens present");
        assert_eq!(exported.access_token, "access");
        assert_eq!(exported.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(exported.expires_at, Some(expires_at));
    }

    // -----------------------------------------------------------------------
    // needs_refresh
    // -----------------------------------------------------------------------

    #[test]
    fn test_needs_refresh_false_without_expiry() {
        let state = TokenState {
            access_token: Some("tok".to_string()),
            refresh_token: None,
            expires_at: None,
        };
        assert!(!state.needs_refresh());
    }

    #[test]
    fn test_needs_refresh_true_within_skew_window() {
        let state = TokenState {
            access_token: Some("tok".to_string()),
            refresh_token: None,
            expires_at: Some(Utc::now() + chrono::Duration::seconds(REFRESH_SKEW_SECONDS - 5)),
        };
        assert!(state.needs_refresh());
    }

    #[test]
    fn test_needs_refresh_false_outside_skew_window() {
        let state = TokenState {
            access_token: Some("tok".to_string()),
            refresh_token: None,
            expires_at: Some(Utc::now() + chrono::Duration::seconds(REFRESH_SKEW_SECONDS + 60)),
        };
        assert!(!state.needs_refresh());
    }

    // -----------------------------------------------------------------------
    // parse_oauth_error
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_oauth_error_reads_error_object() {
        let (error, description) = parse_oauth_error(
            400,
            r#"{"error": "invalid_grant", "error_description": "code expired"}"#,
        );
        assert_eq!(error, "invalid_grant");
        assert_eq!(description.as_deref(), Some("code expired"));
    }

    #[test]
    fn test_parse_oauth_error_without_description() {
        let (error, description) = parse_oauth_error(400, r#"{"error": "invalid_client"}"#);
        assert_eq!(error, "invalid_client");
        assert!(description.is_none());
    }

    #[test]
    fn test_parse_oauth_error_falls_back_on_unparseable_body() {
        let (error, description) = parse_oauth_error(502, "Bad Gateway");
        assert_eq!(error, "http_502");
        assert_eq!(description.as_deref(), Some("Bad Gateway"));
    }

    #[test]
    fn test_parse_oauth_error_empty_body() {
        let (error, description) = parse_oauth_error(500, "");
        assert_eq!(error, "http_500");
        assert!(description.is_none());
    }
}

//! Session correlation between authorization redirects and pending flows
//!
//! An authorization redirect arrives out-of-band, carrying only `code` and
//! `state`. This module maps that `state` back to the in-memory flow that
//! issued it: the PKCE verifier and the owning [`OAuthClient`] instance.
//!
//! Storage sits behind the [`SessionStore`] trait so a deployment can swap
//! the in-memory map for a durable cross-process store without touching
//! the correlation logic. The bundled [`MemorySessionStore`] ties session
//! lifetime to the process: a callback landing in a different process than
//! the one that started the flow observes an unknown session.
//!
//! Sessions are strictly single-use. A callback delivery claims the
//! session atomically; when two deliveries race for the same `state`,
//! exactly one observes it and the other sees "not found".

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use crate::auth::client::{OAuthClient, TokenResponse};
use crate::error::{AuthKitError, Result};

/// Default time-to-live for stored sessions. Authorization attempts are
/// human-interaction bound; anything older than this is abandoned.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(600);

/// A pending authorization attempt awaiting its redirect.
#[derive(Clone)]
pub struct AuthSession {
    /// CSRF state bound to the attempt; also the storage key.
    pub state: String,

    /// PKCE code verifier generated at flow start.
    pub code_verifier: String,

    /// The client instance that started the attempt and will perform the
    /// token exchange.
    pub client: Arc<OAuthClient>,

    /// When the session was stored; used for TTL eviction.
    pub created_at: Instant,
}

/// Storage interface for pending authorization sessions, keyed by `state`.
///
/// `remove` must be atomic with respect to concurrent callers: for a given
/// key, at most one caller receives the stored session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a session, silently overwriting any existing entry for the
    /// same state.
    async fn put(&self, session: AuthSession);

    /// Returns a copy of the session for `state`, if present and not
    /// expired.
    async fn get(&self, state: &str) -> Option<AuthSession>;

    /// Removes and returns the session for `state`, if present and not
    /// expired.
    async fn remove(&self, state: &str) -> Option<AuthSession>;
}

/// In-memory, process-local session store with TTL eviction.
///
/// Expired entries are pruned opportunistically on every write and never
/// returned from reads, so an abandoned attempt cannot be redeemed after
/// the TTL even if its entry has not been swept yet.
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: tokio::sync::RwLock<HashMap<String, AuthSession>>,
}

impl MemorySessionStore {
    /// Creates a store with [`DEFAULT_SESSION_TTL`].
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }

    /// Creates a store with a custom session TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: tokio::sync::RwLock::new(HashMap::new()),
        }
    }

    fn is_live(&self, session: &AuthSession) -> bool {
        session.created_at.elapsed() < self.ttl
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, session: AuthSession) {
        let mut sessions = self.sessions.write().await;
        let ttl = self.ttl;
        sessions.retain(|_, s| s.created_at.elapsed() < ttl);
        sessions.insert(session.state.clone(), session);
    }

    async fn get(&self, state: &str) -> Option<AuthSession> {
        let sessions = self.sessions.read().await;
        sessions
            .get(state)
            .filter(|s| self.is_live(s))
            .cloned()
    }

    async fn remove(&self, state: &str) -> Option<AuthSession> {
        let mut sessions = self.sessions.write().await;
        sessions
            .remove(state)
            .filter(|s| self.is_live(s))
    }
}

/// Query parameters delivered to the callback endpoint.
///
/// All fields are optional at the wire level; [`SessionCorrelator::handle_callback`]
/// decides which combinations are acceptable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code, present on success.
    pub code: Option<String>,

    /// CSRF state round-tripped through the redirect.
    pub state: Option<String>,

    /// OAuth error code, present when the user or server denied the
    /// request.
    pub error: Option<String>,

    /// Optional human-readable denial description.
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Convenience constructor for a successful redirect.
    pub fn success(code: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            state: Some(state.into()),
            error: None,
            error_description: None,
        }
    }
}

/// Bridges asynchronous authorization redirects back to the flow that
/// issued them.
///
/// One correlator serves any number of [`OAuthClient`] instances; each
/// stored session carries its owning client. The correlator and the
/// clients it references must live in the same process when backed by
/// [`MemorySessionStore`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use mcp_authkit::auth::client::OAuthClient;
/// use mcp_authkit::auth::session::{CallbackParams, SessionCorrelator};
/// # async fn example(client: Arc<OAuthClient>) -> mcp_authkit::error::Result<()> {
/// let correlator = SessionCorrelator::new();
///
/// let started = correlator.begin_authorization(Arc::clone(&client)).await?;
/// // ...user authorizes in a browser, redirect arrives...
/// let tokens = correlator
///     .handle_callback(CallbackParams::success("abc123", started.state))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionCorrelator {
    store: Arc<dyn SessionStore>,
}

impl SessionCorrelator {
    /// Creates a correlator backed by a fresh [`MemorySessionStore`].
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemorySessionStore::new()),
        }
    }

    /// Creates a correlator backed by the given store.
    pub fn with_store(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Starts an authorization attempt on `client` and stores the session
    /// for later correlation. Returns the started attempt so the caller
    /// can surface the authorization URL.
    pub async fn begin_authorization(
        &self,
        client: Arc<OAuthClient>,
    ) -> Result<crate::auth::client::StartedAuthorization> {
        let started = client.start_authorization().await?;
        self.store_session(&started.state, &started.code_verifier, client)
            .await;
        Ok(started)
    }

    /// Stores a pending session keyed by `state`. A colliding state is
    /// silently overwritten; with the entropy in
    /// [`generate_state`](crate::auth::pkce::generate_state) collisions
    /// are negligible.
    pub async fn store_session(
        &self,
        state: &str,
        code_verifier: &str,
        client: Arc<OAuthClient>,
    ) {
        self.store
            .put(AuthSession {
                state: state.to_string(),
                code_verifier: code_verifier.to_string(),
                client,
                created_at: Instant::now(),
            })
            .await;
    }

    /// Looks up the pending session for `state` without consuming it.
    ///
    /// Absence is a legitimate outcome (expired, foreign, or already
    /// consumed state), not an error.
    pub async fn get_session(&self, state: &str) -> Option<AuthSession> {
        self.store.get(state).await
    }

    /// Processes a callback delivery.
    ///
    /// Denials short-circuit before any session lookup. A deliverable
    /// callback claims its session atomically (single-use) and runs the
    /// owning client's token exchange; the session is gone afterwards
    /// regardless of the exchange outcome, so a state value can never be
    /// replayed.
    ///
    /// # Errors
    ///
    /// - [`AuthKitError::AuthorizationDenied`] when `error` is present.
    /// - [`AuthKitError::MalformedCallback`] when `code` or `state` is
    ///   missing.
    /// - [`AuthKitError::UnknownSession`] when no live session matches the
    ///   state.
    /// - Any error from the owning client's
    ///   [`exchange_code_for_tokens`](OAuthClient::exchange_code_for_tokens).
    pub async fn handle_callback(&self, params: CallbackParams) -> Result<TokenResponse> {
        if let Some(error) = params.error {
            return Err(AuthKitError::AuthorizationDenied {
                error,
                description: params.error_description,
            }
            .into());
        }

        let code = params
            .code
            .ok_or_else(|| AuthKitError::MalformedCallback("missing code parameter".to_string()))?;
        let state = params
            .state
            .ok_or_else(|| AuthKitError::MalformedCallback("missing state parameter".to_string()))?;

        let session = match self.store.remove(&state).await {
            Some(session) => session,
            None => {
                tracing::warn!(%state, "callback for unknown or consumed session");
                return Err(AuthKitError::UnknownSession.into());
            }
        };

        session
            .client
            .exchange_code_for_tokens(&code, &session.code_verifier, &state, &session.state)
            .await
    }
}

impl Default for SessionCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

//! HTTP callback receiver for interactive authorization flows
//!
//! Serves the redirect endpoint that the authorization server sends the
//! user's browser back to. Each [`CallbackServer`] is explicitly
//! constructed and explicitly owned by whichever component starts the
//! interactive flow; there is no process-wide instance.
//!
//! The handler feeds every delivery through the
//! [`SessionCorrelator`](crate::auth::session::SessionCorrelator), renders
//! a human-readable page for the browser, and forwards the outcome to the
//! task blocked in [`CallbackServer::wait_for_authorization`].

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::sync::mpsc;

use crate::auth::client::TokenResponse;
use crate::auth::session::{CallbackParams, SessionCorrelator};
use crate::error::{AuthKitError, Result};

/// Default wait window for the human side of the authorization flow.
pub const DEFAULT_AUTHORIZATION_TIMEOUT: Duration = Duration::from_secs(300);

/// State shared with the axum handler.
struct CallbackShared {
    correlator: Arc<SessionCorrelator>,
    outcome_tx: mpsc::Sender<Result<TokenResponse>>,
}

/// Redirect endpoint server for one or more interactive flows.
///
/// Binds a local TCP listener, serves `GET /callback`, and hands each
/// delivery to the correlator. Dropping the server stops it.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use mcp_authkit::auth::callback::CallbackServer;
/// use mcp_authkit::auth::session::SessionCorrelator;
///
/// # async fn example(client: Arc<mcp_authkit::auth::client::OAuthClient>) -> mcp_authkit::error::Result<()> {
/// let correlator = Arc::new(SessionCorrelator::new());
/// let server = CallbackServer::bind("127.0.0.1:3001".parse()?, Arc::clone(&correlator)).await?;
///
/// let started = correlator.begin_authorization(client).await?;
/// println!("Open the following URL in your browser:\n{}", started.auth_url);
///
/// let tokens = server
///     .wait_for_authorization(Duration::from_secs(300))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct CallbackServer {
    local_addr: SocketAddr,
    outcome_rx: tokio::sync::Mutex<mpsc::Receiver<Result<TokenResponse>>>,
    server: tokio::task::JoinHandle<()>,
}

impl CallbackServer {
    /// Binds the callback listener and starts serving.
    ///
    /// Pass port `0` to let the OS pick a free port; the chosen address is
    /// available from [`local_addr`](Self::local_addr) for building the
    /// redirect URI.
    ///
    /// # Errors
    ///
    /// Returns an error when the listener cannot be bound.
    pub async fn bind(addr: SocketAddr, correlator: Arc<SessionCorrelator>) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(AuthKitError::Io)?;
        let local_addr = listener.local_addr().map_err(AuthKitError::Io)?;

        let (outcome_tx, outcome_rx) = mpsc::channel(8);
        let shared = Arc::new(CallbackShared {
            correlator,
            outcome_tx,
        });

        let app = Router::new()
            .route("/callback", get(handle_callback))
            .with_state(shared);

        tracing::debug!(%local_addr, "callback server listening");
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).into_future().await {
                tracing::warn!("callback server stopped: {e}");
            }
        });

        Ok(Self {
            local_addr,
            outcome_rx: tokio::sync::Mutex::new(outcome_rx),
            server,
        })
    }

    /// The address the server is actually listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the next callback delivery and returns its outcome.
    ///
    /// The wait window is caller-configurable;
    /// [`DEFAULT_AUTHORIZATION_TIMEOUT`] is a reasonable choice for
    /// browser-based flows.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::AuthorizationTimeout`] when no callback
    /// arrives within `timeout`, or the delivery's own error (denial,
    /// unknown session, failed exchange).
    pub async fn wait_for_authorization(&self, timeout: Duration) -> Result<TokenResponse> {
        let mut rx = self.outcome_rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Err(_) => Err(AuthKitError::AuthorizationTimeout(timeout.as_secs()).into()),
            Ok(None) => Err(anyhow::anyhow!(
                "callback server stopped before a callback arrived"
            )),
            Ok(Some(outcome)) => outcome,
        }
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Axum handler for `GET /callback`.
async fn handle_callback(
    State(shared): State<Arc<CallbackShared>>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, String) {
    let outcome = shared.correlator.handle_callback(params).await;
    let page = render_outcome(&outcome);

    // A full channel or absent waiter must not hang the browser request.
    let _ = shared.outcome_tx.try_send(outcome);

    page
}

/// Renders the browser-facing page for a callback outcome.
fn render_outcome(outcome: &Result<TokenResponse>) -> (StatusCode, String) {
    match outcome {
        Ok(_) => (
            StatusCode::OK,
            "Authorization successful. You may close this tab.".to_string(),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            format!("Authorization failed: {e}\n\nReturn to the application and restart the flow."),
        ),
    }
}

/// Attempts to open the authorization URL in the user's default browser.
///
/// Errors are intentionally ignored; if the browser does not open, the
/// user can copy the URL the caller printed.
pub fn try_open_browser(url: &str) {
    #[cfg(target_os = "macos")]
    {
        let _ = std::process::Command::new("open").arg(url).spawn();
    }
    #[cfg(target_os = "linux")]
    {
        let _ = std::process::Command::new("xdg-open").arg(url).spawn();
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = url;
    }
}

//! mcp-authkit - OAuth 2.1 authorization layer for MCP
//!
//! This library provides the three cooperating roles that put OAuth 2.1 in
//! front of a Model Context Protocol deployment: an OAuth client that
//! obtains and refreshes bearer tokens via the Authorization Code grant
//! with PKCE, a callback receiver that completes the code exchange and
//! hands tokens back to the owning client, and a resource-server guard
//! that validates the bearer token on every inbound MCP request.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: client-side authorization (PKCE, discovery, registration,
//!   token lifecycle, session correlation, callback endpoint)
//! - `server`: resource-server bearer guard and protected-resource
//!   metadata
//! - `config`: configuration loading and validation
//! - `error`: error types and result aliases
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use mcp_authkit::auth::callback::CallbackServer;
//! use mcp_authkit::auth::client::OAuthClient;
//! use mcp_authkit::auth::session::SessionCorrelator;
//! use mcp_authkit::config::OAuthConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = OAuthConfig::load("oauth.yaml")?;
//!     let client = Arc::new(OAuthClient::new(config)?);
//!
//!     let correlator = Arc::new(SessionCorrelator::new());
//!     let server =
//!         CallbackServer::bind("127.0.0.1:3001".parse()?, Arc::clone(&correlator)).await?;
//!
//!     let started = correlator.begin_authorization(Arc::clone(&client)).await?;
//!     println!("Open this URL to authorize:\n{}", started.auth_url);
//!
//!     server.wait_for_authorization(Duration::from_secs(300)).await?;
//!     let token = client.get_valid_access_token().await?;
//!     println!("access token: {token}");
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod server;

// Re-export commonly used types
pub use auth::callback::CallbackServer;
pub use auth::client::{OAuthClient, StartedAuthorization, TokenResponse};
pub use auth::session::{CallbackParams, SessionCorrelator, SessionStore};
pub use auth::token_store::{TokenSet, TokenStore};
pub use config::{OAuthConfig, ResourceServerConfig};
pub use error::{AuthKitError, Result};
pub use server::bearer::{protect, ResourceServerContext};
pub use server::validator::{TokenValidator, TokenVerdict};

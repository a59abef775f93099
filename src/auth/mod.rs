//! OAuth 2.1 client-side authorization
//!
//! Everything the client role needs to obtain and maintain bearer tokens
//! via the Authorization Code grant with PKCE, including the callback
//! receiver that completes the exchange.
//!
//! # Module Layout
//!
//! - [`pkce`]         -- PKCE `S256` challenge and CSRF state generation
//! - [`discovery`]    -- RFC 8414 authorization server metadata resolution
//! - [`registration`] -- RFC 7591 dynamic client registration
//! - [`client`]       -- Authorization code flow and token lifecycle
//! - [`session`]      -- State-keyed correlation of redirects to flows
//! - [`callback`]     -- HTTP redirect endpoint for interactive flows
//! - [`token_store`]  -- Optional token persistence via OS keyring

pub mod callback;
pub mod client;
pub mod discovery;
pub mod pkce;
pub mod registration;
pub mod session;
pub mod token_store;

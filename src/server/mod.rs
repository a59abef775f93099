//! Resource-server side of the authorization layer
//!
//! Validates the bearer tokens attached to inbound MCP requests and
//! serves the protected-resource metadata document. JSON-RPC dispatch is
//! the embedding application's concern; this module only decides whether
//! a request may reach it.
//!
//! # Module Layout
//!
//! - [`validator`] -- Injectable token-validation capability
//! - [`bearer`]    -- Axum guard enforcing bearer auth and audience binding
//! - [`metadata`]  -- Protected-resource metadata document and endpoint

pub mod bearer;
pub mod metadata;
pub mod validator;

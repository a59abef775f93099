//! Pluggable bearer-token validation
//!
//! The resource server never hard-codes trust in a token format. Real
//! deployments verify a JWT signature against the issuing authorization
//! server's published keys and check the temporal claims; that capability
//! is injected through the [`TokenValidator`] trait so the
//! request-handling contract in [`bearer`](crate::server::bearer) stays
//! fixed while the verification strategy varies.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

/// Outcome of validating a bearer token.
#[derive(Debug, Clone, Default)]
pub struct TokenVerdict {
    /// Whether the token is authentic and temporally valid.
    pub valid: bool,

    /// The audience the token was issued for, when the validator can
    /// determine one. Compared against the resource server's canonical
    /// URI by the bearer guard.
    pub audience: Option<String>,

    /// Space-separated scopes granted to the token, when known.
    pub scope: Option<String>,
}

impl TokenVerdict {
    /// A verdict rejecting the token.
    pub fn invalid() -> Self {
        Self::default()
    }

    /// A verdict accepting the token for the given audience.
    pub fn valid_for(audience: impl Into<String>) -> Self {
        Self {
            valid: true,
            audience: Some(audience.into()),
            scope: None,
        }
    }
}

/// Capability that decides whether a bearer token is authentic.
///
/// Implementations typically decode the token, verify its signature
/// against the issuer's JWKS, and check `exp`/`nbf`; none of that logic
/// lives in this crate. Validation runs on every inbound MCP request, so
/// implementations should cache whatever key material they need.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Validates `token` and reports audience and scope when determinable.
    ///
    /// # Errors
    ///
    /// Implementations may fail on infrastructure problems (e.g. a key
    /// fetch); the bearer guard maps any error to a 401, never a 500.
    async fn validate(&self, token: &str) -> Result<TokenVerdict>;
}

/// Table-driven validator for tests and local development.
///
/// Knows a fixed set of tokens and their verdicts; everything else is
/// invalid. This is the injectable stand-in for a real JWT/JWKS verifier.
///
/// # Examples
///
/// ```
/// use mcp_authkit::server::validator::{StaticTokenValidator, TokenVerdict};
///
/// let validator = StaticTokenValidator::new()
///     .with_token("demo_token", TokenVerdict::valid_for("http://localhost:3000"));
/// ```
#[derive(Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, TokenVerdict>,
}

impl StaticTokenValidator {
    /// Creates a validator that rejects every token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token with its verdict.
    pub fn with_token(mut self, token: impl Into<String>, verdict: TokenVerdict) -> Self {
        self.tokens.insert(token.into(), verdict);
        self
    }
}

#[async_trait]
impl TokenValidator for StaticTokenValidator {
    async fn validate(&self, token: &str) -> Result<TokenVerdict> {
        Ok(self
            .tokens
            .get(token)
            .cloned()
            .unwrap_or_else(TokenVerdict::invalid))
    }
}

/// Cheap structural pre-check applied before the validator runs.
///
/// Empty tokens, very short strings, and strings containing whitespace or
/// control characters are rejected outright; no token format in use looks
/// like that, and rejecting early keeps garbage away from the validator.
pub fn plausible_token(token: &str) -> bool {
    token.len() >= 16
        && token
            .chars()
            .all(|c| c.is_ascii_graphic())
}

//! PKCE S256 challenge and CSRF state generation
//!
//! Implements the Proof Key for Code Exchange extension (RFC 7636) with the
//! `S256` method mandated by OAuth 2.1, plus the random `state` token that
//! binds an authorization redirect to the attempt that issued it.
//!
//! The verifier is generated once per authorization attempt and kept local
//! until token-exchange time; only the derived challenge travels with the
//! authorization request. The state value doubles as the correlation key in
//! the session correlator's map.
//!
//! # References
//!
//! - RFC 7636 <https://www.rfc-editor.org/rfc/rfc7636>
//! - OAuth 2.1 draft <https://datatracker.ietf.org/doc/draft-ietf-oauth-v2-1/>

use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::auth::discovery::AuthorizationServerMetadata;
use crate::error::{AuthKitError, Result};

/// A PKCE S256 challenge pair consisting of a verifier and its derived
/// challenge value.
///
/// Created by [`generate`] and consumed by
/// [`OAuthClient`](crate::auth::client::OAuthClient) when constructing the
/// authorization URL and exchanging the authorization code.
///
/// # Examples
///
/// ```
/// use mcp_authkit::auth::pkce;
///
/// let challenge = pkce::generate().expect("PKCE generation must not fail");
/// assert_eq!(challenge.method, "S256");
/// assert_eq!(challenge.verifier.len(), 43);
/// ```
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// The code verifier: a base64url-encoded (no padding) random string of
    /// exactly 43 characters derived from 32 random bytes.
    ///
    /// Sent to the token endpoint in the `code_verifier` parameter during
    /// the authorization code exchange, and nowhere else.
    pub verifier: String,

    /// The code challenge: the base64url-encoded (no padding) SHA-256
    /// digest of the UTF-8 representation of [`Self::verifier`].
    pub challenge: String,

    /// The challenge method. Always `"S256"` for challenges produced by
    /// this module.
    pub method: String,
}

/// Generates a fresh PKCE S256 challenge.
///
/// The verifier is 32 cryptographically random bytes encoded as a base64url
/// string without padding (43 characters). The challenge is the
/// base64url-encoded SHA-256 digest of the verifier string's UTF-8 bytes,
/// as specified in RFC 7636 section 4.2.
///
/// # Errors
///
/// This function is infallible in practice; it returns a `Result` so that
/// callers can use `?` uniformly. An error would only arise if the
/// operating system's random source failed, which is fatal and not
/// recoverable locally.
pub fn generate() -> Result<PkceChallenge> {
    use rand::RngCore as _;

    let mut random_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut random_bytes);

    let verifier = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes);

    // RFC 7636 section 4.2: ASCII(BASE64URL(SHA256(ASCII(code_verifier))))
    let digest = Sha256::digest(verifier.as_bytes());
    let challenge = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice());

    Ok(PkceChallenge {
        verifier,
        challenge,
        method: "S256".to_string(),
    })
}

/// Generates a cryptographically random CSRF `state` token.
///
/// 16 random bytes encoded as base64url without padding (22 characters).
/// Each value is bound to exactly one authorization attempt; the session
/// correlator uses it as the lookup key for the pending flow.
///
/// # Errors
///
/// Same failure mode as [`generate`]: only an entropy-source failure, which
/// is fatal.
pub fn generate_state() -> Result<String> {
    use rand::RngCore as _;

    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Verifies that the authorization server supports the PKCE `S256` method.
///
/// If the server's metadata does not advertise
/// `code_challenge_methods_supported` at all, or the list does not contain
/// `"S256"`, this function returns an error. OAuth 2.1 mandates PKCE for
/// public clients, so a flow never starts against a server without it.
///
/// # Errors
///
/// Returns [`AuthKitError::MetadataParse`] when `S256` is absent from the
/// advertised methods or the field is missing entirely.
pub fn verify_s256_support(metadata: &AuthorizationServerMetadata) -> Result<()> {
    let supported = metadata
        .code_challenge_methods_supported
        .as_deref()
        .unwrap_or(&[]);

    if supported.iter().any(|m| m == "S256") {
        Ok(())
    } else {
        Err(AuthKitError::MetadataParse(
            "PKCE S256 not supported by authorization server".to_string(),
        )
        .into())
    }
}

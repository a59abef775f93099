//! Token persistence via OS keyring
//!
//! Optional storage for a [`TokenSet`] in the operating system's native
//! credential store (Keychain on macOS, Secret Service on Linux, Windows
//! Credential Manager on Windows). The OAuth client itself keeps tokens in
//! memory only; callers that want tokens to survive a restart export them
//! here and import them on startup.
//!
//! Token sets are serialized to JSON before storage and deserialized on
//! load. The keyring is stateless; [`TokenStore`] is a zero-field struct
//! that acts as a namespaced accessor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::client::REFRESH_SKEW_SECONDS;
use crate::error::{AuthKitError, Result};

/// A complete token set as held by one OAuth client instance.
///
/// `expires_at` is an absolute UTC timestamp computed from the token
/// endpoint's `expires_in` at issuance time, so expiry can be determined
/// after a restart without a server round-trip.
///
/// # Examples
///
/// ```
/// use mcp_authkit::auth::token_store::TokenSet;
///
/// let tokens = TokenSet {
///     access_token: "my_access_token".to_string(),
///     refresh_token: None,
///     expires_at: None,
///     scope: None,
/// };
///
/// // A token set with no expiry is never considered stale.
/// assert!(!tokens.is_stale());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// The access token string issued by the authorization server.
    pub access_token: String,

    /// Refresh token usable to obtain a new access token without
    /// re-running the full authorization flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// UTC timestamp at which the access token expires. `None` means the
    /// server reported no lifetime and the token is treated as
    /// non-expiring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Space-separated scopes granted by the authorization server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenSet {
    /// Returns `true` when the access token is expired or inside the
    /// refresh skew window, meaning it should be refreshed before use.
    pub fn is_stale(&self) -> bool {
        match self.expires_at {
            None => false,
            Some(expires_at) => {
                Utc::now() >= expires_at - chrono::Duration::seconds(REFRESH_SKEW_SECONDS)
            }
        }
    }
}

/// Stateless accessor for the OS native keyring.
///
/// Each profile's token set is stored under a unique service name derived
/// from the profile identifier, preventing collisions between resources.
///
/// # Examples
///
/// ```no_run
/// use mcp_authkit::auth::token_store::{TokenSet, TokenStore};
///
/// # fn example() -> mcp_authkit::error::Result<()> {
/// let store = TokenStore;
/// let tokens = TokenSet {
///     access_token: "my_token".to_string(),
///     refresh_token: None,
///     expires_at: None,
///     scope: None,
/// };
/// store.save("my_resource", &tokens)?;
/// assert!(store.load("my_resource")?.is_some());
/// # Ok(())
/// # }
/// ```
pub struct TokenStore;

impl TokenStore {
    /// Builds the keyring service name for the given profile identifier.
    fn service_name(profile: &str) -> String {
        format!("mcp-authkit-{}", profile)
    }

    /// Persists a [`TokenSet`] under the named profile.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::Serialization`] if JSON serialization fails
    /// or [`AuthKitError::Keyring`] if the OS credential store rejects the
    /// write.
    pub fn save(&self, profile: &str, tokens: &TokenSet) -> Result<()> {
        let json_str = serde_json::to_string(tokens).map_err(AuthKitError::Serialization)?;
        let service = Self::service_name(profile);
        let entry = keyring::Entry::new(&service, profile).map_err(AuthKitError::Keyring)?;
        entry
            .set_password(&json_str)
            .map_err(AuthKitError::Keyring)?;
        Ok(())
    }

    /// Loads the stored [`TokenSet`] for the named profile.
    ///
    /// Returns `Ok(None)` when nothing has been saved, letting callers
    /// distinguish "not authenticated yet" from a genuine keyring error.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::Keyring`] on unexpected credential-store
    /// errors, or [`AuthKitError::Serialization`] if the stored JSON is
    /// malformed.
    pub fn load(&self, profile: &str) -> Result<Option<TokenSet>> {
        let service = Self::service_name(profile);
        let entry = keyring::Entry::new(&service, profile).map_err(AuthKitError::Keyring)?;

        match entry.get_password() {
            Ok(json_str) => {
                let tokens: TokenSet =
                    serde_json::from_str(&json_str).map_err(AuthKitError::Serialization)?;
                Ok(Some(tokens))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AuthKitError::Keyring(e).into()),
        }
    }

    /// Deletes the stored token set for the named profile.
    ///
    /// A no-op when nothing is stored, so it is safe to call on logout
    /// without checking first.
    ///
    /// # Errors
    ///
    /// Returns [`AuthKitError::Keyring`] on unexpected credential-store
    /// errors.
    pub fn delete(&self, profile: &str) -> Result<()> {
        let service = Self::service_name(profile);
        let entry = keyring::Entry::new(&service, profile).map_err(AuthKitError::Keyring)?;

        match entry.delete_password() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AuthKitError::Keyring(e).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    // -----------------------------------------------------------------------
    // TokenSet::is_stale
    // -----------------------------------------------------------------------

    #[test]
    fn test_token_set_stale_when_past_expiry() {
        let tokens = TokenSet {
            access_token: "tok".to_string(),
            refresh_token: None,
            expires_at: Some(Utc::now() - Duration::seconds(1)),
            scope: None,
        };
        assert!(tokens.is_stale());
    }

    #[test]
    fn test_token_set_stale_within_skew_window() {
        let tokens = TokenSet {
            access_token: "tok".to_string(),
            refresh_token: None,
            expires_at: Some(Utc::now() + Duration::seconds(REFRESH_SKEW_SECONDS - 10)),
            scope: None,
        };
        assert!(tokens.is_stale());
    }

    #[test]
    fn test_token_set_fresh_outside_skew_window() {
        let tokens = TokenSet {
            access_token: "tok".to_string(),
            refresh_token: None,
            expires_at: Some(Utc::now() + Duration::hours(1)),
            scope: None,
        };
        assert!(!tokens.is_stale());
    }

    #[test]
    fn test_token_set_fresh_without_expiry() {
        let tokens = TokenSet {
            access_token: "tok".to_string(),
            refresh_token: None,
            expires_at: None,
            scope: None,
        };
        assert!(!tokens.is_stale());
    }

    // -----------------------------------------------------------------------
    // JSON round-trip
    // -----------------------------------------------------------------------

    #[test]
    fn test_token_set_roundtrip_through_json() {
        let original = TokenSet {
            access_token: "access_abc".to_string(),
            refresh_token: Some("refresh_xyz".to_string()),
            // Fixed timestamp avoids sub-second precision issues.
            expires_at: Some(DateTime::from_timestamp(1_800_000_000, 0).expect("valid timestamp")),
            scope: Some("read write".to_string()),
        };

        let json = serde_json::to_string(&original).expect("serialize");
        let restored: TokenSet = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(restored.access_token, original.access_token);
        assert_eq!(restored.refresh_token, original.refresh_token);
        assert_eq!(restored.expires_at, original.expires_at);
        assert_eq!(restored.scope, original.scope);
    }

    #[test]
    fn test_token_set_roundtrip_no_optional_fields() {
        let original = TokenSet {
            access_token: "tok".to_string(),
            refresh_token: None,
            expires_at: None,
            scope: None,
        };

        let json = serde_json::to_string(&original).expect("serialize");
        assert!(!json.contains("refresh_token"));
        let restored: TokenSet = serde_json::from_str(&json).expect("deserialize");
        assert!(restored.refresh_token.is_none());
        assert!(restored.expires_at.is_none());
    }

    // -----------------------------------------------------------------------
    // service_name helper
    // -----------------------------------------------------------------------

    #[test]
    fn test_service_name_has_crate_prefix() {
        assert_eq!(
            TokenStore::service_name("my_resource"),
            "mcp-authkit-my_resource"
        );
    }

    #[test]
    fn test_service_name_is_unique_per_profile() {
        assert_ne!(
            TokenStore::service_name("resource_a"),
            TokenStore::service_name("resource_b")
        );
    }

    // -----------------------------------------------------------------------
    // Keyring integration tests (require system keyring; skipped in CI)
    // -----------------------------------------------------------------------

    #[test]
    #[ignore = "requires system keyring"]
    fn test_save_and_load_roundtrip_via_keyring() {
        let store = TokenStore;
        let profile = "mcp_authkit_integration_test";

        let tokens = TokenSet {
            access_token: "integration_access".to_string(),
            refresh_token: Some("integration_refresh".to_string()),
            expires_at: Some(Utc::now() + Duration::hours(1)),
            scope: Some("read write".to_string()),
        };

        store.save(profile, &tokens).expect("save");
        let loaded = store.load(profile).expect("load").expect("present");
        assert_eq!(loaded.access_token, tokens.access_token);
        assert_eq!(loaded.refresh_token, tokens.refresh_token);

        store.delete(profile).expect("delete");
        assert!(store.load(profile).expect("load after delete").is_none());
    }

    #[test]
    #[ignore = "requires system keyring"]
    fn test_delete_is_idempotent() {
        let store = TokenStore;
        let profile = "mcp_authkit_idempotent_delete_test";
        store.delete(profile).expect("first delete");
        store.delete(profile).expect("second delete is no-op");
    }
}

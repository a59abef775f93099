//! Bearer-token guard for inbound MCP requests
//!
//! Axum middleware enforcing the resource-server side of the contract:
//! every inbound request must present `Authorization: Bearer <token>`, the
//! token must pass the injected [`TokenValidator`], and its audience must
//! equal this server's canonical resource URI. Rejections are always 401
//! or 403 with a structured JSON body; validation problems never surface
//! as 500.
//!
//! The guard does not look at the JSON-RPC payload; MCP dispatch happens
//! in whatever inner router [`protect`] wraps.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use url::Url;

use crate::config::ResourceServerConfig;
use crate::server::metadata::{
    metadata_handler, ProtectedResourceMetadata, WELL_KNOWN_RESOURCE_PATH,
};
use crate::server::validator::{plausible_token, TokenValidator};

/// Shared state for the guard and the metadata endpoint.
pub struct ResourceServerContext {
    config: ResourceServerConfig,
    validator: Arc<dyn TokenValidator>,
    metadata: ProtectedResourceMetadata,
}

impl ResourceServerContext {
    /// Creates the context from configuration and an injected validator.
    pub fn new(config: ResourceServerConfig, validator: Arc<dyn TokenValidator>) -> Self {
        let metadata = ProtectedResourceMetadata::from_config(&config);
        Self {
            config,
            validator,
            metadata,
        }
    }

    /// The canonical resource URI tokens must be bound to.
    pub fn resource(&self) -> &Url {
        &self.config.resource
    }

    /// The protected-resource metadata document served at the well-known
    /// path.
    pub fn metadata(&self) -> &ProtectedResourceMetadata {
        &self.metadata
    }

    /// The `WWW-Authenticate` challenge value sent on 401 responses.
    fn challenge_header(&self) -> String {
        let resource = self.config.resource.as_str();
        format!(r#"Bearer realm="{resource}", resource="{resource}""#)
    }
}

/// Wraps `inner` with the bearer guard and mounts the metadata endpoint.
///
/// The metadata document stays public; everything in `inner` requires a
/// valid, audience-bound bearer token.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::routing::post;
/// use axum::Router;
/// use mcp_authkit::config::ResourceServerConfig;
/// use mcp_authkit::server::bearer::{protect, ResourceServerContext};
/// use mcp_authkit::server::validator::StaticTokenValidator;
///
/// # fn example(config: ResourceServerConfig) {
/// let ctx = Arc::new(ResourceServerContext::new(
///     config,
///     Arc::new(StaticTokenValidator::new()),
/// ));
/// let mcp = Router::new().route("/mcp", post(|| async { "dispatched" }));
/// let app = protect(mcp, ctx);
/// # let _ = app;
/// # }
/// ```
pub fn protect(inner: Router, ctx: Arc<ResourceServerContext>) -> Router {
    let guarded = inner.layer(middleware::from_fn_with_state(
        Arc::clone(&ctx),
        require_bearer,
    ));
    let well_known = Router::new()
        .route(WELL_KNOWN_RESOURCE_PATH, get(metadata_handler))
        .with_state(ctx);
    guarded.merge(well_known)
}

/// Middleware enforcing bearer authentication and audience binding.
pub async fn require_bearer(
    State(ctx): State<Arc<ResourceServerContext>>,
    req: Request,
    next: Next,
) -> Response {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match header_value.and_then(extract_bearer_token) {
        Some(token) => token.to_string(),
        None => {
            return reject(
                &ctx,
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing or malformed Authorization header",
            );
        }
    };

    if !plausible_token(&token) {
        return reject(
            &ctx,
            StatusCode::UNAUTHORIZED,
            "invalid_token",
            "Bearer token is empty or malformed",
        );
    }

    let verdict = match ctx.validator.validate(&token).await {
        Ok(verdict) => verdict,
        Err(e) => {
            // Validator infrastructure failures are still a client-visible
            // 401, never a 500.
            tracing::warn!("token validator error: {e}");
            return reject(
                &ctx,
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Token could not be validated",
            );
        }
    };

    if !verdict.valid {
        return reject(
            &ctx,
            StatusCode::UNAUTHORIZED,
            "invalid_token",
            "Token is invalid or expired",
        );
    }

    let audience_ok = verdict
        .audience
        .as_deref()
        .is_some_and(|aud| audience_matches(aud, ctx.resource()));
    if !audience_ok {
        tracing::warn!(
            audience = verdict.audience.as_deref().unwrap_or("<none>"),
            resource = %ctx.resource(),
            "rejecting token bound to a different resource"
        );
        return reject(
            &ctx,
            StatusCode::FORBIDDEN,
            "insufficient_scope",
            "Token audience does not match this resource",
        );
    }

    next.run(req).await
}

/// Extracts the token from a `Bearer <token>` header value.
///
/// The scheme comparison is case-insensitive per RFC 7235; the token
/// itself is returned verbatim.
fn extract_bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Compares a token audience against the canonical resource URI.
///
/// URL-normalized comparison: `http://localhost:3000` and
/// `http://localhost:3000/` refer to the same resource.
fn audience_matches(audience: &str, resource: &Url) -> bool {
    match Url::parse(audience) {
        Ok(audience_url) => audience_url == *resource,
        Err(_) => audience.trim_end_matches('/') == resource.as_str().trim_end_matches('/'),
    }
}

/// Builds a structured rejection response. 401 responses carry the
/// `WWW-Authenticate` challenge naming this resource.
fn reject(
    ctx: &ResourceServerContext,
    status: StatusCode,
    error: &str,
    description: &str,
) -> Response {
    let body = Json(serde_json::json!({
        "error": error,
        "error_description": description,
    }));

    if status == StatusCode::UNAUTHORIZED {
        (
            status,
            [(header::WWW_AUTHENTICATE, ctx.challenge_header())],
            body,
        )
            .into_response()
    } else {
        (status, body).into_response()
    }
}

//! Axum guard and extractors for authenticated routes.

use crate::auth::{
    AuthRequest, BearerVerifier, Principal, ReplayCache, RequestVerifier, SignatureVerifier,
};
use crate::config::Config;
use crate::error::{AppError, AuthError};
use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub replay_cache: Arc<ReplayCache>,
    /// Guard for the signature-authenticated service surface.
    pub service_guard: AuthGuard,
    /// Guard for the bearer-authenticated orchestrator surface.
    pub bearer_guard: AuthGuard,
}

impl AppState {
    /// Build state with a fresh replay cache.
    pub fn new(config: Config) -> Self {
        Self::with_replay_cache(config, Arc::new(ReplayCache::new()))
    }

    /// Build state around an existing replay cache.
    pub fn with_replay_cache(config: Config, replay_cache: Arc<ReplayCache>) -> Self {
        let signature = SignatureVerifier::new(
            config.service_secret_env.clone(),
            config.service_secret.clone().map(String::into_bytes),
            Arc::clone(&replay_cache),
        )
        .with_clock_skew(config.clock_skew_secs)
        .with_replay_window(config.replay_window_secs);

        let bearer = BearerVerifier::new(
            crate::config::BEARER_TOKEN_VAR,
            config.bearer_token.clone(),
        );

        Self {
            service_guard: AuthGuard::new(Arc::new(signature), config.max_body_bytes),
            bearer_guard: AuthGuard::new(Arc::new(bearer), config.max_body_bytes),
            config: Arc::new(config),
            replay_cache,
        }
    }
}

/// One verifier bound to a set of routes.
#[derive(Clone)]
pub struct AuthGuard {
    verifier: Arc<dyn RequestVerifier>,
    max_body_bytes: usize,
}

impl AuthGuard {
    pub fn new(verifier: Arc<dyn RequestVerifier>, max_body_bytes: usize) -> Self {
        Self {
            verifier,
            max_body_bytes,
        }
    }

    fn check(&self, parts: &Parts, body: &[u8]) -> Result<Principal, AuthError> {
        let request = AuthRequest::new(&parts.method, parts.uri.path(), &parts.headers, body);

        match self.verifier.verify(&request) {
            Ok(principal) => Ok(principal),
            Err(err) => {
                // Misconfiguration is logged at error level by the response conversion.
                if !err.is_misconfiguration() {
                    tracing::warn!(
                        code = err.code(),
                        method = %parts.method,
                        path = %parts.uri.path(),
                        "Request rejected"
                    );
                }
                Err(err)
            }
        }
    }
}

/// Middleware running the guard's verifier before the handler.
///
/// On success the [`Principal`] is inserted into request extensions and the
/// body (if it had to be buffered) is handed on unchanged. On failure the
/// handler never runs.
///
/// # Usage
///
/// ```rust,no_run
/// use axum::{middleware, routing::post, Router};
/// use svcauth::auth::middleware::{require_auth, AuthGuard};
///
/// fn protect(router: Router, guard: AuthGuard) -> Router {
///     router.route_layer(middleware::from_fn_with_state(guard, require_auth))
/// }
/// ```
pub async fn require_auth(
    State(guard): State<AuthGuard>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();

    let (body, principal) = if guard.verifier.requires_body() {
        let bytes = axum::body::to_bytes(body, guard.max_body_bytes)
            .await
            .map_err(|_| AppError::PayloadTooLarge)?;
        let principal = guard.check(&parts, &bytes)?;
        (Body::from(bytes), principal)
    } else {
        let principal = guard.check(&parts, &[])?;
        (body, principal)
    };

    parts.extensions.insert(principal);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Service identity extractor for signature-guarded routes.
///
/// Fails with 500 if the route was not wrapped in a signature guard.
pub struct ServiceIdentity(pub String);

impl<S> FromRequestParts<S> for ServiceIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Principal>() {
            Some(Principal::Service(id)) => Ok(ServiceIdentity(id.clone())),
            _ => Err(AppError::Internal(format!(
                "No service principal on {}",
                parts.uri.path()
            ))),
        }
    }
}

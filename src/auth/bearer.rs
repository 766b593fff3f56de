//! Static bearer token check.

use axum::http::header::AUTHORIZATION;
use subtle::ConstantTimeEq;

use super::verify::{AuthRequest, Principal, RequestVerifier};
use crate::error::AuthError;

/// Verifier comparing `Authorization: Bearer <token>` against one expected token.
pub struct BearerVerifier {
    /// Name of the secret source, used in diagnostics.
    secret_name: String,
    expected: Option<String>,
}

impl BearerVerifier {
    /// Create a verifier. An absent or empty token leaves the verifier
    /// misconfigured rather than accepting some default value.
    pub fn new(secret_name: impl Into<String>, expected: Option<String>) -> Self {
        Self {
            secret_name: secret_name.into(),
            expected: expected.filter(|t| !t.is_empty()),
        }
    }

    pub fn has_secret(&self) -> bool {
        self.expected.is_some()
    }

    /// Check an `Authorization` header value, returning the presented token.
    ///
    /// The scheme must be `Bearer` (ASCII case-insensitive) followed by a single
    /// space and a non-empty token.
    pub fn verify_header<'h>(
        &self,
        authorization: Option<&'h str>,
    ) -> Result<&'h str, AuthError> {
        let authorization = authorization.ok_or(AuthError::MissingToken)?;

        let token = match authorization.split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token,
            _ => return Err(AuthError::InvalidScheme),
        };
        if token.is_empty() {
            return Err(AuthError::InvalidScheme);
        }

        let expected = self
            .expected
            .as_deref()
            .ok_or_else(|| AuthError::MissingSecret(self.secret_name.clone()))?;

        if !bool::from(token.as_bytes().ct_eq(expected.as_bytes())) {
            return Err(AuthError::InvalidToken);
        }

        Ok(token)
    }
}

impl RequestVerifier for BearerVerifier {
    fn verify(&self, request: &AuthRequest<'_>) -> Result<Principal, AuthError> {
        // A header that is present but not valid UTF-8 cannot carry a bearer token.
        let authorization = match request.headers.get(AUTHORIZATION) {
            None => None,
            Some(value) => Some(value.to_str().map_err(|_| AuthError::InvalidScheme)?),
        };

        self.verify_header(authorization)?;
        tracing::debug!("Bearer request authenticated");
        Ok(Principal::Bearer)
    }
}

impl std::fmt::Debug for BearerVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerVerifier")
            .field("secret_name", &self.secret_name)
            .field("token", &self.expected.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

//! Verifier capability shared by every authentication scheme.

use crate::error::AuthError;
use axum::http::{HeaderMap, Method};

/// Borrowed view of the parts of a request a verifier may inspect.
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub headers: &'a HeaderMap,
    /// Raw body bytes exactly as received.
    pub body: &'a [u8],
}

impl<'a> AuthRequest<'a> {
    pub fn new(
        method: &'a Method,
        path: &'a str,
        headers: &'a HeaderMap,
        body: &'a [u8],
    ) -> Self {
        Self {
            method,
            path,
            headers,
            body,
        }
    }

    /// Header value as text; absent, empty and non-UTF-8 values all read as `None`.
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }
}

/// Identity established by a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Caller authenticated by request signature.
    Service(String),
    /// Caller presented the static bearer token.
    Bearer,
}

impl Principal {
    pub fn service_id(&self) -> Option<&str> {
        match self {
            Principal::Service(id) => Some(id),
            Principal::Bearer => None,
        }
    }
}

/// A check run once per request before its handler.
///
/// Implementations are synchronous: verification never performs network or
/// disk I/O.
pub trait RequestVerifier: Send + Sync {
    fn verify(&self, request: &AuthRequest<'_>) -> Result<Principal, AuthError>;

    /// Whether the guard must buffer the body before calling [`verify`](Self::verify).
    fn requires_body(&self) -> bool {
        false
    }
}

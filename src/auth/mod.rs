//! Request authentication: HMAC-signed service calls and static bearer tokens.

pub mod bearer;
pub mod clock;
pub mod middleware;
pub mod replay;
pub mod signature;
pub mod verify;

pub use bearer::BearerVerifier;
pub use clock::{FixedTimeSource, SystemTimeSource, TimeSource};
pub use middleware::{require_auth, AppState, AuthGuard, ServiceIdentity};
pub use replay::ReplayCache;
pub use signature::{sign_request, SignatureVerifier, SignedHeaders, SigningContext};
pub use verify::{AuthRequest, Principal, RequestVerifier};

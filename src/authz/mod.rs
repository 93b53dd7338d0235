pub mod config;
pub mod engine;
pub mod store;

pub use engine::{authorize, AuthzRequest, Decision, GATEWAY_KEY_HEADER};
pub use store::PolicyStore;

/// Anything that can take a per-request authorization decision.
///
/// Implementations must not block or perform I/O, the decision is taken on
/// the request path.
pub trait Authorizer: Send + Sync {
    fn authorize_request(&self, req: &AuthzRequest) -> Decision;
}

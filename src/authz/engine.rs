use crate::errors::ErrorKind;
use crate::resource::KeyCredential;

use super::store::PolicyStore;

/// Header carrying the gateway-issued key.
pub const GATEWAY_KEY_HEADER: &str = "x-gateway-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Reject(ErrorKind),
}

/// The parts of an inbound request the decision depends on.
#[derive(Debug, Clone, Copy)]
pub struct AuthzRequest<'a> {
    pub path: &'a str,
    /// Upper case HTTP method.
    pub method: &'a str,
    /// Raw value of the `x-gateway-key` header.
    pub key: Option<&'a [u8]>,
}

impl<'a> AuthzRequest<'a> {
    pub fn new(path: &'a str, method: &'a str, key: Option<&'a str>) -> Self {
        Self {
            path,
            method,
            key: key.map(str::as_bytes),
        }
    }
}

/// Decides whether a request may proceed.
///
/// `credential` is `None` when the integration is disabled or no key was
/// issued, every request passes through in that case. Otherwise:
///
/// * enable paths are allowed unconditionally;
/// * without a key, a public or protected rule flagged `enabled = false`
///   allows the request, anything else is rejected with
///   [`ErrorKind::GatewayKeyNotFoundInHeader`];
/// * with a key, it must equal the issued key byte for byte, or the request
///   is rejected with [`ErrorKind::GatewayKeyInvalid`].
///
/// An empty header value counts as no key.
pub fn authorize(
    store: &PolicyStore,
    credential: Option<&KeyCredential>,
    req: &AuthzRequest,
) -> Decision {
    let credential = match credential {
        Some(credential) => credential,
        None => return Decision::Allow,
    };

    if store.enable_paths().lookup(req.path, req.method).is_some() {
        return Decision::Allow;
    }

    let key = match req.key {
        Some(key) if !key.is_empty() => key,
        _ => {
            if store.public_paths().lookup(req.path, req.method) == Some(false) {
                return Decision::Allow;
            }
            if store.protected_paths().lookup(req.path, req.method) == Some(false) {
                return Decision::Allow;
            }
            return Decision::Reject(ErrorKind::GatewayKeyNotFoundInHeader);
        }
    };

    if key == credential.key.as_bytes() {
        Decision::Allow
    } else {
        Decision::Reject(ErrorKind::GatewayKeyInvalid)
    }
}

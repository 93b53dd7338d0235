use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::authz::{authorize, Authorizer, AuthzRequest, Decision, PolicyStore};
use crate::sync::SyncState;

/// Request-path half of the gateway: the immutable policy store plus the
/// state published by the last successful synchronization.
///
/// Readers take a snapshot of the whole state, so a concurrent resync never
/// exposes a half-updated credential.
pub struct KeyGuard {
    store: PolicyStore,
    state: ArcSwapOption<SyncState>,
}

impl KeyGuard {
    pub fn new(store: PolicyStore) -> Self {
        Self {
            store,
            state: ArcSwapOption::empty(),
        }
    }

    pub fn publish(&self, state: Arc<SyncState>) {
        self.state.store(Some(state));
    }

    /// Drops the published state, requests pass through until the next
    /// successful publish.
    pub fn clear(&self) {
        self.state.store(None);
    }

    pub fn is_synced(&self) -> bool {
        self.state.load().is_some()
    }
}

impl Authorizer for KeyGuard {
    fn authorize_request(&self, req: &AuthzRequest) -> Decision {
        let state = self.state.load();
        let credential = state.as_ref().and_then(|state| state.credential.as_ref());
        authorize(&self.store, credential, req)
    }
}

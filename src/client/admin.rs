//! Administrative sub-gateway.
//!
//! Shares the parent gateway's dispatcher, so cancellation, close and
//! listener semantics are identical to the data operations.

use crate::action::{ClearRealmCacheRequest, ClearRealmCacheResponse};
use crate::execution::{ActionListener, CompletionHandle, Dispatcher};

#[derive(Debug, Clone)]
pub struct AdminGateway {
    dispatcher: Dispatcher,
}

impl AdminGateway {
    pub(crate) fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Evict cached credentials on the targeted nodes.
    ///
    /// Resolves successfully when at least one node acknowledged, with the
    /// failing nodes listed in the response. Fails with a transport error
    /// only when every targeted node failed.
    pub fn clear_realm_cache(
        &self,
        request: ClearRealmCacheRequest,
    ) -> CompletionHandle<ClearRealmCacheResponse> {
        self.dispatcher.execute(request)
    }

    /// Listener form of [`clear_realm_cache`](Self::clear_realm_cache)
    pub fn clear_realm_cache_with<L>(&self, request: ClearRealmCacheRequest, listener: L)
    where
        L: ActionListener<ClearRealmCacheResponse>,
    {
        self.dispatcher.execute_with(request, listener);
    }
}

use assets_engine::{AssetService, Authorizer};
use assets_storage::InMemoryStorage;

/// The service type the API runs: in-memory storage behind whichever
/// authorizer the configuration selected.
pub(crate) type Service = AssetService<InMemoryStorage, Box<dyn Authorizer>>;

/// Shared server state, wrapped in `Arc` for the router.
pub(crate) struct AppState {
    pub(crate) service: Service,
}

impl AppState {
    pub(crate) fn new(service: Service) -> Self {
        Self { service }
    }
}

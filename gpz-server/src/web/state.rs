//! Application state for the web layer.

use std::sync::Arc;

use crate::lookup::LookupService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Lookup orchestrator, which also owns the catalog
    pub lookup: Arc<LookupService>,

    /// Token required by `POST /api/facilities`; `None` disables registration
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(lookup: LookupService, admin_token: Option<&str>) -> Self {
        Self {
            lookup: Arc::new(lookup),
            admin_token: admin_token.map(Arc::from),
        }
    }
}

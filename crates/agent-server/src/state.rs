//! Application State

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::lookup::LookupService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Runs agent requests against the provider and the tool server
    pub service: Arc<LookupService>,

    /// Fired on shutdown; in-flight runs stop at their next checkpoint
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service: LookupService) -> Self {
        Self {
            service: Arc::new(service),
            shutdown: CancellationToken::new(),
        }
    }
}

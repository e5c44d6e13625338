use std::sync::Arc;

use timeline_sync_core::KvStore;

use crate::settings::Settings;

/// Shared application state, built once at startup and handed to every
/// route. The store is the only mutable state in the process.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn KvStore>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(storage: Arc<dyn KvStore>, settings: Settings) -> Self {
        AppState {
            storage,
            settings: Arc::new(settings),
        }
    }
}

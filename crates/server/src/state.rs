//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::BatchStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`; the batch store is injected
/// at construction so tests can swap in an in-memory backend.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn BatchStore>,
}

impl AppState {
    /// Create a new application state over a batch store.
    #[must_use]
    pub fn new(store: Arc<dyn BatchStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { store }),
        }
    }

    /// Get a reference to the batch store.
    #[must_use]
    pub fn store(&self) -> &dyn BatchStore {
        self.inner.store.as_ref()
    }
}

// src/application/state.rs

use std::sync::Arc;

use crate::db::DocumentStore;
use crate::error::AppResult;
use crate::repositories::PetRepository;

/// Application state shared by every command.
/// The store handle is built in main.rs (or a test) and passed here.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Request-scoped pet repository over the shared store
    pub fn pets(&self) -> AppResult<PetRepository> {
        PetRepository::pets(Arc::clone(&self.store))
    }
}

//! Persisted maintenance request flag
//!
//! Stored as a JSON boolean under a single key so that it survives restarts
//! and is visible to every process sharing the store. A missing key means
//! "not requested".

use std::sync::Arc;

use crate::storage::{StoreAccessor, StoreError, StoreResult};

pub const MAINTENANCE_KEY: &str = "maintenance/requested";

#[derive(Clone)]
pub struct MaintenanceFlag {
    store: Arc<dyn StoreAccessor>,
}

impl MaintenanceFlag {
    pub fn new(store: Arc<dyn StoreAccessor>) -> Self {
        Self { store }
    }

    pub fn is_requested(&self) -> StoreResult<bool> {
        match self.store.get(MAINTENANCE_KEY)? {
            None => Ok(false),
            Some(bytes) => serde_json::from_slice::<bool>(&bytes).map_err(|e| {
                StoreError::corruption(format!("invalid maintenance flag: {}", e))
                    .with_key(MAINTENANCE_KEY)
            }),
        }
    }

    /// Persist the request. Idempotent.
    pub fn set_requested(&self, requested: bool) -> StoreResult<()> {
        let value = if requested { b"true".as_slice() } else { b"false".as_slice() };
        self.store.put(MAINTENANCE_KEY, value)
    }
}
